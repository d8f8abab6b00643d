use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub nominatim_url: String,
    pub nominatim_user_agent: String,
    pub http_timeout_seconds: u64,
    pub login_url: String,
    pub auth_email_header: String,
    pub auth_name_header: String,
    pub seed_demo_tasks: bool,
    pub demo_task_count: usize,
    pub redis_url: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // treating empty DATABASE_URL as unset because docker-compose was setting it to ""
        let mut database_url = non_empty("DATABASE_URL");

        // fallback to loading backend/.env explicitly in case working directory isn't set correctly
        if database_url.is_none() {
            let env_path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
            let _ = dotenvy::from_path_override(&env_path);
            database_url = non_empty("DATABASE_URL");
        }

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_or("PORT", 8080)?,
            database_url,
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 5)?,
            gemini_api_key: non_empty("GEMINI_API_KEY"),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
            gemini_api_base: env::var("GEMINI_API_BASE")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".to_string()),
            nominatim_url: env::var("NOMINATIM_URL")
                .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".to_string()),
            nominatim_user_agent: env::var("NOMINATIM_USER_AGENT")
                .unwrap_or_else(|_| "waste-rewards-backend/0.1".to_string()),
            http_timeout_seconds: parse_or("HTTP_TIMEOUT_SECONDS", 30)?,
            login_url: env::var("LOGIN_URL").unwrap_or_else(|_| "/api/auth/login".to_string()),
            auth_email_header: env::var("AUTH_EMAIL_HEADER")
                .unwrap_or_else(|_| "x-auth-email".to_string())
                .to_ascii_lowercase(),
            auth_name_header: env::var("AUTH_NAME_HEADER")
                .unwrap_or_else(|_| "x-auth-name".to_string())
                .to_ascii_lowercase(),
            seed_demo_tasks: parse_or("SEED_DEMO_TASKS", true)?,
            demo_task_count: parse_or("DEMO_TASK_COUNT", 70)?,
            redis_url: non_empty("REDIS_URL"),
        })
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match non_empty(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {}={:?}: {}", key, raw, e)),
        None => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            database_url: None,
            database_max_connections: 1,
            gemini_api_key: None,
            gemini_model: "gemini-1.5-flash".to_string(),
            gemini_api_base: "http://127.0.0.1:9".to_string(),
            nominatim_url: "http://127.0.0.1:9".to_string(),
            nominatim_user_agent: "waste-rewards-tests".to_string(),
            http_timeout_seconds: 5,
            login_url: "/api/auth/login".to_string(),
            auth_email_header: "x-auth-email".to_string(),
            auth_name_header: "x-auth-name".to_string(),
            seed_demo_tasks: false,
            demo_task_count: 0,
            redis_url: None,
        }
    }
}
