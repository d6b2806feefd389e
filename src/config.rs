use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Sqlite,
    File,
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub store: StoreKind,
    pub leaderboard_file: String,
    pub media_server_url: String,
    pub media_server_token: Option<String>,
    pub upstream_timeout: Duration,
    pub relay_buffer_chunks: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.into());

        let store = match var("LEADERBOARD_STORE", "sqlite").to_lowercase().as_str() {
            "file" => StoreKind::File,
            "memory" => StoreKind::Memory,
            _ => StoreKind::Sqlite,
        };

        AppConfig {
            host: var("HOST", "0.0.0.0"),
            port: lookup("PORT").and_then(|p| p.parse().ok()).unwrap_or(3000),
            database_path: var("DATABASE_PATH", "clip-quiz.db"),
            store,
            leaderboard_file: var("LEADERBOARD_FILE", "leaderboard.json"),
            media_server_url: var("MEDIA_SERVER_URL", "http://localhost:32400")
                .trim_end_matches('/')
                .to_string(),
            media_server_token: lookup("MEDIA_SERVER_TOKEN")
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            upstream_timeout: Duration::from_secs(
                lookup("UPSTREAM_TIMEOUT_SECS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            relay_buffer_chunks: lookup("RELAY_BUFFER_CHUNKS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(8usize)
                .max(1),
        }
    }
}
