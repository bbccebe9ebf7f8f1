//! Time windows accepted by the positions query.

use crate::error::CoreError;
use std::str::FromStr;

/// Time window for position queries.
///
/// `Realtime` means no cutoff; the remaining variants filter the
/// latest-per-callsign view to rows observed within the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionRange {
    #[default]
    Realtime,
    Min15,
    Min30,
    Hour1,
    Hour6,
    Hour12,
    Hour24,
}

impl PositionRange {
    /// Window length in milliseconds, `None` for realtime.
    pub fn window_ms(self) -> Option<i64> {
        match self {
            Self::Realtime => None,
            Self::Min15 => Some(15 * 60 * 1000),
            Self::Min30 => Some(30 * 60 * 1000),
            Self::Hour1 => Some(3_600_000),
            Self::Hour6 => Some(6 * 3_600_000),
            Self::Hour12 => Some(12 * 3_600_000),
            Self::Hour24 => Some(24 * 3_600_000),
        }
    }

    /// Cutoff timestamp for a query issued at `now_ms`, `None` for realtime.
    pub fn cutoff_ms(self, now_ms: i64) -> Option<i64> {
        self.window_ms().map(|w| now_ms - w)
    }
}

impl FromStr for PositionRange {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "realtime" => Ok(Self::Realtime),
            "15m" => Ok(Self::Min15),
            "30m" => Ok(Self::Min30),
            "1h" => Ok(Self::Hour1),
            "6h" => Ok(Self::Hour6),
            "12h" => Ok(Self::Hour12),
            "24h" => Ok(Self::Hour24),
            other => Err(CoreError::UnknownRange(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ranges() {
        assert_eq!("realtime".parse::<PositionRange>().unwrap(), PositionRange::Realtime);
        assert_eq!("15m".parse::<PositionRange>().unwrap(), PositionRange::Min15);
        assert_eq!("24h".parse::<PositionRange>().unwrap(), PositionRange::Hour24);
        assert!("2d".parse::<PositionRange>().is_err());
    }

    #[test]
    fn test_realtime_has_no_cutoff() {
        assert_eq!(PositionRange::Realtime.cutoff_ms(1_000_000), None);
    }

    #[test]
    fn test_cutoff_subtracts_window() {
        let now = 100_000_000;
        assert_eq!(PositionRange::Hour1.cutoff_ms(now), Some(now - 3_600_000));
        assert_eq!(PositionRange::Min15.cutoff_ms(now), Some(now - 900_000));
    }
}
