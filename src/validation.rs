use crate::error::AppError;
use crate::models::leaderboard::{ScoreSubmission, ValidSubmission};

const MAX_PLAYER_NAME_LEN: usize = 20;
// Keeps stored times exactly representable as JSON numbers in a browser.
const MAX_TOTAL_TIME_SECS: f64 = u32::MAX as f64;

pub fn validate_player_name(name: &str) -> Result<String, AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        Err(AppError::Validation("Name is required".into()))
    } else {
        Ok(trimmed.chars().take(MAX_PLAYER_NAME_LEN).collect())
    }
}

pub fn validate_total_time(total_time: f64) -> Result<u64, AppError> {
    if !total_time.is_finite() || total_time < 0.0 {
        Err(AppError::Validation("Total time cannot be negative".into()))
    } else if total_time > MAX_TOTAL_TIME_SECS {
        Err(AppError::Validation("Total time is too large".into()))
    } else {
        Ok(total_time.floor() as u64)
    }
}

/// Checks presence of every required field, then normalizes name and time.
pub fn validate_submission(req: ScoreSubmission) -> Result<ValidSubmission, AppError> {
    let (Some(name), Some(correct_count), Some(difficulty), Some(timer), Some(total_time)) = (
        req.name,
        req.score,
        req.difficulty,
        req.timer,
        req.total_time,
    ) else {
        return Err(AppError::Validation("Missing required fields".into()));
    };

    Ok(ValidSubmission {
        name: validate_player_name(&name)?,
        correct_count,
        difficulty,
        timer,
        total_time_seconds: validate_total_time(total_time)?,
    })
}

/// Media paths are relative to the upstream base and must start with a single `/`.
pub fn normalize_resource_path(path: &str) -> Result<String, AppError> {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        Err(AppError::Validation("Media path is required".into()))
    } else {
        Ok(format!("/{}", trimmed))
    }
}
