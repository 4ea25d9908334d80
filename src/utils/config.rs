use std::env;
use std::time::Duration;

/// Runtime configuration, read once at startup. Every option has an
/// environment variable; unrecognized variables are simply ignored.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub admin_email: String,
    pub admin_password: String,
    pub recreate_demo_data: bool,
    pub recommendation_engine_url: String,
    pub engine_connect_timeout: Duration,
    pub engine_read_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        AppConfig {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            admin_email: env::var("ADMIN_EMAIL")
                .unwrap_or_else(|_| "admin@touragency.local".to_string()),
            admin_password: env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin12345".to_string()),
            recreate_demo_data: env::var("RECREATE_DEMO_DATA")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            recommendation_engine_url: env::var("RECOMMENDATION_ENGINE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            engine_connect_timeout: Duration::from_millis(
                env_millis("RECOMMENDATION_ENGINE_CONNECT_TIMEOUT_MS", 3_000),
            ),
            engine_read_timeout: Duration::from_millis(env_millis(
                "RECOMMENDATION_ENGINE_READ_TIMEOUT_MS",
                10_000,
            )),
        }
    }
}

fn env_millis(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
