//! The position/message store: journals plus in-memory read indexes.

use crate::error::StoreResult;
use crate::journal::Journal;
use dashmap::DashMap;
use parking_lot::Mutex;
use soup_core::{Message, StationPosition};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use tracing::info;

const POSITIONS_FILE: &str = "positions.jsonl";
const MESSAGES_FILE: &str = "messages.jsonl";

/// Most recent messages kept in memory for the query surface.
const RECENT_MESSAGES_CAP: usize = 512;

/// Append-only store with in-memory indexes for the read paths.
///
/// Every recorded row goes to disk first; only a successful append
/// updates the indexes. `latest` keeps one position per callsign
/// (ties resolved in favor of the later-recorded row), `recent`
/// keeps the newest messages first.
pub struct Store {
    positions: Mutex<Journal>,
    messages: Mutex<Journal>,
    latest: DashMap<String, StationPosition>,
    recent: Mutex<VecDeque<Message>>,
}

impl Store {
    /// Open the journals under `data_dir` and rebuild the indexes by
    /// replaying them.
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        let positions_path = data_dir.join(POSITIONS_FILE);
        let messages_path = data_dir.join(MESSAGES_FILE);

        let store = Self {
            positions: Mutex::new(Journal::open(&positions_path)?),
            messages: Mutex::new(Journal::open(&messages_path)?),
            latest: DashMap::new(),
            recent: Mutex::new(VecDeque::with_capacity(RECENT_MESSAGES_CAP)),
        };

        let replayed_positions: Vec<StationPosition> = Journal::replay(&positions_path)?;
        let position_rows = replayed_positions.len();
        for pos in replayed_positions {
            store.index_position(pos);
        }

        let replayed_messages: Vec<Message> = Journal::replay(&messages_path)?;
        let message_rows = replayed_messages.len();
        for msg in replayed_messages {
            store.index_message(msg);
        }

        info!(
            data_dir = %data_dir.display(),
            position_rows,
            message_rows,
            stations = store.latest.len(),
            "Store opened"
        );
        Ok(store)
    }

    /// Append a position row and update the latest-per-callsign index.
    pub fn record_position(&self, pos: &StationPosition) -> StoreResult<()> {
        self.positions.lock().append(pos)?;
        self.index_position(pos.clone());
        Ok(())
    }

    /// Append a message row and update the recent-messages index.
    pub fn record_message(&self, msg: &Message) -> StoreResult<()> {
        self.messages.lock().append(msg)?;
        self.index_message(msg.clone());
        Ok(())
    }

    /// Latest known position per callsign.
    pub fn latest_positions(&self) -> StoreResult<HashMap<String, StationPosition>> {
        Ok(self
            .latest
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect())
    }

    /// Latest known position per callsign, restricted to rows at or
    /// after `cutoff_ms`.
    pub fn positions_since(&self, cutoff_ms: i64) -> StoreResult<HashMap<String, StationPosition>> {
        Ok(self
            .latest
            .iter()
            .filter(|entry| entry.value().timestamp_ms >= cutoff_ms)
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect())
    }

    /// Up to `limit` most recent messages, newest first.
    pub fn recent_messages(&self, limit: usize) -> StoreResult<Vec<Message>> {
        Ok(self.recent.lock().iter().take(limit).cloned().collect())
    }

    pub fn station_count(&self) -> usize {
        self.latest.len()
    }

    fn index_position(&self, pos: StationPosition) {
        use dashmap::mapref::entry::Entry;
        match self.latest.entry(pos.callsign.clone()) {
            Entry::Occupied(mut occupied) => {
                // Equal timestamps resolve in favor of the later row,
                // matching journal order.
                if pos.timestamp_ms >= occupied.get().timestamp_ms {
                    occupied.insert(pos);
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(pos);
            }
        }
    }

    fn index_message(&self, msg: Message) {
        let mut recent = self.recent.lock();
        recent.push_front(msg);
        recent.truncate(RECENT_MESSAGES_CAP);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn pos(callsign: &str, lat: f64, lon: f64, timestamp_ms: i64) -> StationPosition {
        StationPosition {
            callsign: callsign.to_string(),
            ssid: soup_core::extract_ssid(callsign).to_string(),
            lat,
            lon,
            timestamp_ms,
        }
    }

    fn msg(sender: &str, recipient: &str, info: &str, timestamp_ms: i64) -> Message {
        Message {
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            info: info.to_string(),
            timestamp_ms,
        }
    }

    #[test]
    fn test_record_and_query_latest() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();

        store.record_position(&pos("N0CALL-9", 47.5, -122.3, 100)).unwrap();
        store.record_position(&pos("K7ABC", 48.0, -121.0, 200)).unwrap();
        store.record_position(&pos("N0CALL-9", 47.6, -122.4, 300)).unwrap();

        let latest = store.latest_positions().unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest["N0CALL-9"].lat, 47.6);
        assert_eq!(latest["N0CALL-9"].timestamp_ms, 300);
    }

    #[test]
    fn test_equal_timestamps_later_row_wins() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();

        store.record_position(&pos("N0CALL", 10.0, 10.0, 500)).unwrap();
        store.record_position(&pos("N0CALL", 20.0, 20.0, 500)).unwrap();

        let latest = store.latest_positions().unwrap();
        assert_eq!(latest["N0CALL"].lat, 20.0);
    }

    #[test]
    fn test_stale_row_does_not_replace_newer() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();

        store.record_position(&pos("N0CALL", 10.0, 10.0, 500)).unwrap();
        store.record_position(&pos("N0CALL", 20.0, 20.0, 400)).unwrap();

        let latest = store.latest_positions().unwrap();
        assert_eq!(latest["N0CALL"].lat, 10.0);
    }

    #[test]
    fn test_positions_since_filters_by_cutoff() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();

        store.record_position(&pos("OLD", 1.0, 1.0, 100)).unwrap();
        store.record_position(&pos("NEW", 2.0, 2.0, 900)).unwrap();

        let since = store.positions_since(500).unwrap();
        assert_eq!(since.len(), 1);
        assert!(since.contains_key("NEW"));
    }

    #[test]
    fn test_recent_messages_newest_first() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();

        store.record_message(&msg("A", "B", "first", 100)).unwrap();
        store.record_message(&msg("C", "D", "second", 200)).unwrap();

        let recent = store.recent_messages(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].info, "second");
        assert_eq!(recent[1].info, "first");
    }

    #[test]
    fn test_recent_messages_respects_limit_and_cap() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();

        for i in 0..(RECENT_MESSAGES_CAP + 10) {
            store
                .record_message(&msg("A", "B", &format!("m{i}"), i as i64))
                .unwrap();
        }

        let recent = store.recent_messages(5).unwrap();
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].info, format!("m{}", RECENT_MESSAGES_CAP + 9));

        let all = store.recent_messages(usize::MAX).unwrap();
        assert_eq!(all.len(), RECENT_MESSAGES_CAP);
    }

    #[test]
    fn test_replay_rebuilds_indexes() {
        let dir = TempDir::new().unwrap();
        {
            let store = Store::open(dir.path()).unwrap();
            store.record_position(&pos("N0CALL-9", 47.5, -122.3, 100)).unwrap();
            store.record_position(&pos("N0CALL-9", 47.6, -122.4, 200)).unwrap();
            store.record_message(&msg("N0CALL", "K7ABC", "hello", 150)).unwrap();
        }

        let store = Store::open(dir.path()).unwrap();
        let latest = store.latest_positions().unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest["N0CALL-9"].timestamp_ms, 200);

        let recent = store.recent_messages(10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].info, "hello");
    }
}
