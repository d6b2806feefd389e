use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw `POST /leaderboard` body. Every field is optional here so that a
/// missing field is reported as a validation error instead of a parse error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSubmission {
    pub name: Option<String>,
    pub score: Option<u32>,
    pub difficulty: Option<Value>,
    pub timer: Option<Value>,
    pub total_time: Option<f64>,
}

/// A submission that passed validation and is ready to be ranked.
#[derive(Debug, Clone)]
pub struct ValidSubmission {
    pub name: String,
    pub correct_count: u32,
    pub difficulty: Value,
    pub timer: Value,
    pub total_time_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    pub name: String,
    #[serde(rename = "score")]
    pub correct_count: u32,
    pub difficulty: Value,
    pub timer: Value,
    #[serde(rename = "totalTime")]
    pub total_time_seconds: u64,
    pub composite_score: i64,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}
