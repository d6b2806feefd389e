pub mod leaderboard;
pub mod media;
