/// Where matches are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchStoreBackend {
    /// Process-local; matches vanish on restart.
    Memory,
    Postgres { database_url: String },
}

#[derive(Debug, Clone)]
pub struct MatchServiceConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub store: MatchStoreBackend,
}

impl MatchServiceConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                 |
    /// |-------------------------|-------------------------|
    /// | `HOST`                  | `0.0.0.0`               |
    /// | `MATCH_PORT`            | `3001`                  |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                    |
    /// | `MATCH_STORE`           | `memory` (or `postgres`)|
    /// | `DATABASE_URL`          | required for `postgres` |
    ///
    /// # Panics
    ///
    /// Panics on unparseable values or an unknown `MATCH_STORE`.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("MATCH_PORT")
            .unwrap_or_else(|_| "3001".into())
            .parse()
            .expect("MATCH_PORT must be a valid u16");

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let store = match std::env::var("MATCH_STORE")
            .unwrap_or_else(|_| "memory".into())
            .as_str()
        {
            "memory" => MatchStoreBackend::Memory,
            "postgres" => MatchStoreBackend::Postgres {
                database_url: std::env::var("DATABASE_URL")
                    .expect("DATABASE_URL must be set when MATCH_STORE=postgres"),
            },
            other => panic!("MATCH_STORE must be `memory` or `postgres`, got `{other}`"),
        };

        Self {
            host,
            port,
            request_timeout_secs,
            store,
        }
    }
}
