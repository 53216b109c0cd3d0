// src/config.rs

use std::env;
use std::str::FromStr;

use dotenvy::dotenv;

/// Default page size for session listings.
pub const DEFAULT_SESSION_PAGE_LIMIT: u32 = 10;

/// Default page size for question listings.
pub const DEFAULT_QUESTION_PAGE_LIMIT: u32 = 50;

/// Upper bound on any `limit` query parameter.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// How many fresh identifiers to try when a generated session id collides.
pub const SESSION_ID_ATTEMPTS: usize = 3;

/// Deployment mode. Controls how much detail a 500 response carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown APP_ENV '{}'", other)),
        }
    }
}

/// Which `BoardStore` implementation backs the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(StoreBackend::Postgres),
            "memory" | "mem" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown STORE_BACKEND '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub store_backend: StoreBackend,
    pub port: u16,
    pub environment: Environment,
    pub rust_log: String,
    pub cors_origins: Vec<String>,

    /// Seconds between replenished request tokens per client IP. `0` disables rate limiting.
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let store_backend = parse_or("STORE_BACKEND", StoreBackend::Postgres);

        let database_url = env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            panic!("DATABASE_URL must be set when STORE_BACKEND=postgres");
        }

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| {
                vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:3001".to_string(),
                ]
            });

        Self {
            database_url,
            store_backend,
            port: parse_or("PORT", 5000),
            environment: parse_or("APP_ENV", Environment::Development),
            rust_log,
            cors_origins,
            rate_limit_per_second: parse_or("RATE_LIMIT_PER_SECOND", 2),
            rate_limit_burst: parse_or("RATE_LIMIT_BURST", 60),
        }
    }

    /// Configuration for tests and local tooling: memory store, no rate limiting.
    pub fn for_tests() -> Self {
        Self {
            database_url: None,
            store_backend: StoreBackend::Memory,
            port: 0,
            environment: Environment::Development,
            rust_log: "error".to_string(),
            cors_origins: vec!["http://localhost:3000".to_string()],
            rate_limit_per_second: 0,
            rate_limit_burst: 0,
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    pub fn rate_limit_enabled(&self) -> bool {
        self.rate_limit_per_second > 0 && self.rate_limit_burst > 0
    }
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|e| panic!("Invalid value for {}: {}", key, e)),
        Err(_) => default,
    }
}
