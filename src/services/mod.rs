pub mod leaderboard;
pub mod media;
pub mod relay;
