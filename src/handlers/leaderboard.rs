use crate::error::AppError;
use crate::models::leaderboard::*;
use crate::services::leaderboard::Leaderboard;
use ntex::util::Bytes;
use ntex::web::{self, HttpResponse};
use std::sync::Arc;

/// Store I/O blocks (fsync, SQLite), so it runs off the worker that is also
/// relaying media.
async fn with_board<F, T>(board: &Arc<Leaderboard>, f: F) -> Result<T, AppError>
where
    F: FnOnce(&Leaderboard) -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    let board = Arc::clone(board);
    tokio::task::spawn_blocking(move || f(&board))
        .await
        .map_err(|e| AppError::Persistence(format!("Leaderboard task failed: {}", e)))?
}

pub async fn get_leaderboard(
    board: web::types::State<Arc<Leaderboard>>,
    query: web::types::Query<LeaderboardQuery>,
) -> Result<HttpResponse, AppError> {
    let mut entries = with_board(&board, |b| b.retrieve()).await?;
    if let Some(limit) = query.limit {
        entries.truncate(limit.clamp(1, board.capacity()));
    }
    Ok(HttpResponse::Ok().json(&entries))
}

pub async fn submit_score(
    board: web::types::State<Arc<Leaderboard>>,
    body: Bytes,
) -> Result<HttpResponse, AppError> {
    let req: ScoreSubmission = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("Invalid submission: {}", e)))?;
    let entries = with_board(&board, move |b| b.submit(req)).await?;
    Ok(HttpResponse::Ok().json(&entries))
}
