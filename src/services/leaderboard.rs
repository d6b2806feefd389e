//! Leaderboard ranking and persistence.
//!
//! The board is a single JSON array kept in a [`RecordStore`]. Every access
//! goes through [`Leaderboard`], which holds the store behind a mutex so that
//! the read-merge-write sequence of a submission is never interleaved with
//! another one.

use std::cmp::Ordering;
use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use tracing::{error, info};

use crate::error::AppError;
use crate::models::leaderboard::{ScoreRecord, ScoreSubmission, ValidSubmission};
use crate::store::RecordStore;
use crate::validation;

pub const LEADERBOARD_CAPACITY: usize = 20;

pub fn composite_score(correct_count: u32, total_time_seconds: u64) -> i64 {
    i64::from(correct_count) * 100 - (total_time_seconds / 10) as i64
}

/// Composite score descending, then correct answers descending, then
/// total time ascending.
pub fn rank_order(a: &ScoreRecord, b: &ScoreRecord) -> Ordering {
    b.composite_score
        .cmp(&a.composite_score)
        .then_with(|| b.correct_count.cmp(&a.correct_count))
        .then_with(|| a.total_time_seconds.cmp(&b.total_time_seconds))
}

/// Appends `record` and re-sorts, returning the board and the new record's
/// zero-based position (`None` if it fell off the end). `sort_by` is stable,
/// so records that tie on every key keep their insertion order; older
/// entries stay ahead.
pub fn merge(
    mut board: Vec<ScoreRecord>,
    record: ScoreRecord,
    capacity: usize,
) -> (Vec<ScoreRecord>, Option<usize>) {
    board.sort_by(rank_order);
    let position = board
        .iter()
        .filter(|r| rank_order(r, &record) != Ordering::Greater)
        .count();
    board.push(record);
    board.sort_by(rank_order);
    board.truncate(capacity);
    (board, Some(position).filter(|&p| p < capacity))
}

impl From<ValidSubmission> for ScoreRecord {
    fn from(s: ValidSubmission) -> Self {
        ScoreRecord {
            composite_score: composite_score(s.correct_count, s.total_time_seconds),
            name: s.name,
            correct_count: s.correct_count,
            difficulty: s.difficulty,
            timer: s.timer,
            total_time_seconds: s.total_time_seconds,
            date: Utc::now(),
        }
    }
}

pub struct Leaderboard {
    store: Mutex<Box<dyn RecordStore>>,
    capacity: usize,
}

impl Leaderboard {
    pub fn new(store: impl RecordStore + 'static) -> Self {
        Self::with_capacity(store, LEADERBOARD_CAPACITY)
    }

    pub fn with_capacity(store: impl RecordStore + 'static, capacity: usize) -> Self {
        Leaderboard {
            store: Mutex::new(Box::new(store)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Validates, ranks and persists one finished game, returning the whole
    /// updated board.
    pub fn submit(&self, req: ScoreSubmission) -> Result<Vec<ScoreRecord>, AppError> {
        let record = ScoreRecord::from(validation::validate_submission(req)?);
        let name = record.name.clone();
        let score = record.composite_score;

        let store = self.lock();
        let (board, position) = merge(load(store.as_ref())?, record, self.capacity);
        let bytes = serde_json::to_vec(&board)
            .map_err(|e| AppError::Persistence(format!("Failed to encode leaderboard: {}", e)))?;
        store.write(&bytes).map_err(|e| {
            error!(error = %e, "Failed to persist leaderboard");
            AppError::from(e)
        })?;
        drop(store);

        match position {
            Some(idx) => info!(%name, composite_score = score, rank = idx + 1, "Score accepted"),
            None => info!(%name, composite_score = score, "Score did not make the board"),
        }
        Ok(board)
    }

    pub fn retrieve(&self) -> Result<Vec<ScoreRecord>, AppError> {
        let store = self.lock();
        load(store.as_ref())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Box<dyn RecordStore>> {
        // The guarded store holds no in-memory state worth discarding.
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn load(store: &dyn RecordStore) -> Result<Vec<ScoreRecord>, AppError> {
    let bytes = match store.read() {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return Ok(Vec::new()),
        Err(e) => {
            error!(error = %e, "Failed to read leaderboard");
            return Err(AppError::from(e));
        }
    };
    serde_json::from_slice(&bytes).map_err(|e| {
        error!(error = %e, "Stored leaderboard is unreadable");
        AppError::Persistence(format!("Stored leaderboard is unreadable: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Db;
    use crate::store::{MemoryStore, SqliteSlotStore, StoreError};
    use serde_json::json;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn sub(name: &str, score: u32, total_time: f64) -> ScoreSubmission {
        ScoreSubmission {
            name: Some(name.into()),
            score: Some(score),
            difficulty: Some(json!("easy")),
            timer: Some(json!(45)),
            total_time: Some(total_time),
        }
    }

    fn names(board: &[ScoreRecord]) -> Vec<&str> {
        board.iter().map(|r| r.name.as_str()).collect()
    }

    /// Shares its slot with the test so raw bytes can be inspected.
    #[derive(Clone, Default)]
    struct SharedStore(Arc<MemoryStore>);

    impl RecordStore for SharedStore {
        fn read(&self) -> Result<Option<Vec<u8>>, StoreError> {
            self.0.read()
        }
        fn write(&self, bytes: &[u8]) -> Result<(), StoreError> {
            self.0.write(bytes)
        }
    }

    /// Widens the read-modify-write window so lost updates would show up.
    struct SlowStore(MemoryStore);

    impl RecordStore for SlowStore {
        fn read(&self) -> Result<Option<Vec<u8>>, StoreError> {
            let bytes = self.0.read();
            thread::sleep(Duration::from_millis(20));
            bytes
        }
        fn write(&self, bytes: &[u8]) -> Result<(), StoreError> {
            self.0.write(bytes)
        }
    }

    struct FailingStore;

    impl RecordStore for FailingStore {
        fn read(&self) -> Result<Option<Vec<u8>>, StoreError> {
            Ok(None)
        }
        fn write(&self, _: &[u8]) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk full")))
        }
    }

    #[test]
    fn test_composite_score_examples() {
        let board = Leaderboard::new(MemoryStore::new());
        let after_a = board.submit(sub("A", 10, 60.0)).unwrap();
        assert_eq!(after_a[0].composite_score, 994);

        let after_b = board.submit(sub("B", 8, 60.0)).unwrap();
        assert_eq!(after_b[1].composite_score, 794);
        assert_eq!(names(&board.retrieve().unwrap()), vec!["A", "B"]);
    }

    #[test]
    fn test_total_time_floored_before_storage() {
        let board = Leaderboard::new(MemoryStore::new());
        let stored = board.submit(sub("A", 3, 59.99)).unwrap();
        assert_eq!(stored[0].total_time_seconds, 59);
        assert_eq!(stored[0].composite_score, 295);
    }

    #[test]
    fn test_sorted_descending_by_composite() {
        let board = Leaderboard::new(MemoryStore::new());
        for (name, score, time) in [("c", 5, 10.0), ("a", 9, 300.0), ("b", 7, 0.0), ("d", 1, 5.0)] {
            board.submit(sub(name, score, time)).unwrap();
        }
        let entries = board.retrieve().unwrap();
        assert!(entries
            .windows(2)
            .all(|w| w[0].composite_score > w[1].composite_score));
        assert_eq!(names(&entries), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_tie_broken_by_correct_count() {
        // 5*100 - 0 = 500 and 6*100 - 100 = 500
        let board = Leaderboard::new(MemoryStore::new());
        board.submit(sub("fast", 5, 5.0)).unwrap();
        let entries = board.submit(sub("accurate", 6, 1000.0)).unwrap();
        assert_eq!(entries[0].composite_score, entries[1].composite_score);
        assert_eq!(names(&entries), vec!["accurate", "fast"]);
    }

    #[test]
    fn test_tie_broken_by_total_time() {
        // Same correct count, both floor to the same tenth
        let board = Leaderboard::new(MemoryStore::new());
        board.submit(sub("slow", 4, 49.0)).unwrap();
        let entries = board.submit(sub("quick", 4, 41.0)).unwrap();
        assert_eq!(entries[0].composite_score, entries[1].composite_score);
        assert_eq!(names(&entries), vec!["quick", "slow"]);
    }

    #[test]
    fn test_full_tie_keeps_insertion_order() {
        let board = Leaderboard::new(MemoryStore::new());
        for name in ["first", "second", "third"] {
            board.submit(sub(name, 4, 42.0)).unwrap();
        }
        assert_eq!(
            names(&board.retrieve().unwrap()),
            vec!["first", "second", "third"]
        );
    }

    #[test]
    fn test_capacity_bound() {
        let board = Leaderboard::new(MemoryStore::new());
        for i in 0..30u32 {
            let entries = board.submit(sub(&format!("p{}", i), i % 11, 10.0)).unwrap();
            assert!(entries.len() <= LEADERBOARD_CAPACITY);
        }
        let entries = board.retrieve().unwrap();
        assert_eq!(entries.len(), LEADERBOARD_CAPACITY);
        // Lowest scores were dropped
        assert!(entries.iter().all(|r| r.correct_count >= 2));
    }

    #[test]
    fn test_stored_composite_reproducible() {
        let board = Leaderboard::new(MemoryStore::new());
        for (name, score, time) in [("a", 10, 123.7), ("b", 0, 999.9), ("c", 3, 9.99)] {
            board.submit(sub(name, score, time)).unwrap();
        }
        for r in board.retrieve().unwrap() {
            assert_eq!(
                composite_score(r.correct_count, r.total_time_seconds),
                r.composite_score
            );
        }
    }

    #[test]
    fn test_invalid_submission_leaves_state_untouched() {
        let store = SharedStore::default();
        let board = Leaderboard::new(store.clone());
        board.submit(sub("A", 10, 60.0)).unwrap();
        let before = store.read().unwrap();

        let mut bad = sub("B", 5, 10.0);
        bad.difficulty = None;
        assert!(matches!(board.submit(bad), Err(AppError::Validation(_))));
        assert!(matches!(
            board.submit(sub("   ", 5, 10.0)),
            Err(AppError::Validation(_))
        ));

        assert_eq!(store.read().unwrap(), before);
    }

    #[test]
    fn test_empty_board_retrieve() {
        let board = Leaderboard::new(MemoryStore::new());
        assert!(board.retrieve().unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_submissions_not_lost() {
        let board = Arc::new(Leaderboard::new(SlowStore(MemoryStore::new())));
        thread::scope(|s| {
            for name in ["left", "right", "middle"] {
                let board = board.clone();
                s.spawn(move || board.submit(sub(name, 5, 10.0)).unwrap());
            }
        });
        let mut stored = names(&board.retrieve().unwrap())
            .into_iter()
            .map(str::to_owned)
            .collect::<Vec<_>>();
        stored.sort();
        assert_eq!(stored, vec!["left", "middle", "right"]);
    }

    #[test]
    fn test_merge_reports_new_record_position() {
        let board = Leaderboard::new(MemoryStore::new());
        let existing = board.submit(sub("A", 5, 10.0)).unwrap();

        // Same name and score as the stored entry lands behind it
        let record = ScoreRecord::from(validation::validate_submission(sub("A", 5, 10.0)).unwrap());
        let (merged, position) = merge(existing.clone(), record, LEADERBOARD_CAPACITY);
        assert_eq!(position, Some(1));
        assert_eq!(merged.len(), 2);

        let record = ScoreRecord::from(validation::validate_submission(sub("B", 9, 0.0)).unwrap());
        let (merged, position) = merge(merged, record, LEADERBOARD_CAPACITY);
        assert_eq!(position, Some(0));
        assert_eq!(names(&merged), vec!["B", "A", "A"]);
    }

    #[test]
    fn test_merge_position_none_when_cut() {
        let board = Leaderboard::with_capacity(MemoryStore::new(), 2);
        board.submit(sub("a", 9, 0.0)).unwrap();
        let full = board.submit(sub("b", 8, 0.0)).unwrap();

        let record = ScoreRecord::from(validation::validate_submission(sub("c", 1, 0.0)).unwrap());
        let (merged, position) = merge(full, record, 2);
        assert_eq!(position, None);
        assert_eq!(names(&merged), vec!["a", "b"]);
    }

    #[test]
    fn test_write_failure_is_persistence_error() {
        let board = Leaderboard::new(FailingStore);
        assert!(matches!(
            board.submit(sub("A", 1, 1.0)),
            Err(AppError::Persistence(_))
        ));
    }

    #[test]
    fn test_corrupt_state_is_persistence_error() {
        let store = MemoryStore::new();
        store.write(b"{not json").unwrap();
        let board = Leaderboard::new(store);
        assert!(matches!(board.retrieve(), Err(AppError::Persistence(_))));
    }

    #[test]
    fn test_sqlite_backed_board_survives_reopen() {
        let db = Arc::new(Db::open_in_memory().unwrap());
        Leaderboard::new(SqliteSlotStore::new(db.clone(), "leaderboard"))
            .submit(sub("A", 10, 60.0))
            .unwrap();

        let reopened = Leaderboard::new(SqliteSlotStore::new(db, "leaderboard"));
        let entries = reopened.retrieve().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].composite_score, 994);
        assert_eq!(entries[0].difficulty, json!("easy"));
    }
}
