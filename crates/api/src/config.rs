use crate::auth::jwt::JwtConfig;

/// Where the API keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres { database_url: String },
    /// Process-local maps; everything is lost on restart.
    Memory,
}

/// Server configuration loaded from environment variables.
///
/// Defaults suit local development; production overrides via env.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    pub jwt: JwtConfig,
    pub password_min_length: usize,
    /// Base of the links placed in verification and reset emails.
    pub app_base_url: String,
    pub reset_token_ttl_mins: i64,
    pub storage: StorageBackend,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                   |
    /// |-------------------------|---------------------------|
    /// | `HOST`                  | `0.0.0.0`                 |
    /// | `PORT`                  | `3000`                    |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`   |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                      |
    /// | `PASSWORD_MIN_LENGTH`   | `8`                       |
    /// | `APP_BASE_URL`          | `http://localhost:5173`   |
    /// | `RESET_TOKEN_TTL_MINS`  | `60`                      |
    /// | `STORAGE_BACKEND`       | `postgres` (or `memory`)  |
    /// | `DATABASE_URL`          | required for `postgres`   |
    ///
    /// # Panics
    ///
    /// Panics on unparseable values, an unknown `STORAGE_BACKEND`, or a
    /// missing `DATABASE_URL` with the postgres backend.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let password_min_length: usize = std::env::var("PASSWORD_MIN_LENGTH")
            .unwrap_or_else(|_| "8".into())
            .parse()
            .expect("PASSWORD_MIN_LENGTH must be a valid usize");

        let app_base_url =
            std::env::var("APP_BASE_URL").unwrap_or_else(|_| "http://localhost:5173".into());

        let reset_token_ttl_mins: i64 = std::env::var("RESET_TOKEN_TTL_MINS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("RESET_TOKEN_TTL_MINS must be a valid i64");

        let storage = match std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "postgres".into())
            .as_str()
        {
            "postgres" => StorageBackend::Postgres {
                database_url: std::env::var("DATABASE_URL")
                    .expect("DATABASE_URL must be set when STORAGE_BACKEND=postgres"),
            },
            "memory" => StorageBackend::Memory,
            other => panic!("STORAGE_BACKEND must be `postgres` or `memory`, got `{other}`"),
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt: JwtConfig::from_env(),
            password_min_length,
            app_base_url,
            reset_token_ttl_mins,
            storage,
        }
    }
}
