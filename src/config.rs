use std::env;

use chrono::Duration;

/// Errors raised while reading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var} has an invalid value: {value}")]
    Invalid { var: &'static str, value: String },
}

/// Runtime configuration, built once at startup and handed to the services that need it.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub server_port: u16,
    pub server_host: String,
    pub jwt_secret: String,
    pub jwt_expires_in: Duration,
    pub bcrypt_cost: u32,
    /// Origin allowed by CORS.
    pub client_url: String,
    pub environment: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = env::var("JWT_SECRET")
            .ok()
            .filter(|secret| !secret.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            server_port: parse_var("SERVER_PORT", 5000)?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            jwt_secret,
            jwt_expires_in: match env::var("JWT_EXPIRE") {
                Ok(value) => parse_duration(&value).ok_or(ConfigError::Invalid {
                    var: "JWT_EXPIRE",
                    value,
                })?,
                Err(_) => Duration::days(7),
            },
            bcrypt_cost: match parse_var("BCRYPT_COST", bcrypt::DEFAULT_COST)? {
                cost @ 4..=31 => cost,
                cost => {
                    return Err(ConfigError::Invalid {
                        var: "BCRYPT_COST",
                        value: cost.to_string(),
                    })
                }
            },
            client_url: env::var("CLIENT_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            environment: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        })
    }

    /// A configuration suitable for tests: in-memory store, cheapest bcrypt cost.
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            database_url: None,
            server_port: 0,
            server_host: "127.0.0.1".to_string(),
            jwt_secret: jwt_secret.to_string(),
            jwt_expires_in: Duration::days(7),
            bcrypt_cost: 4,
            client_url: "http://localhost:5173".to_string(),
            environment: "test".to_string(),
        }
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        Err(_) => Ok(default),
    }
}

/// Parses lifetimes written as `7d`, `12h`, `30m`, `45s`, or a bare number of seconds.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    let (digits, unit) = match input.char_indices().last()? {
        (idx, c) if c.is_ascii_alphabetic() => (&input[..idx], c),
        _ => (input, 's'),
    };
    let amount: i64 = digits.parse().ok().filter(|n| *n > 0)?;

    match unit {
        'd' => Some(Duration::days(amount)),
        'h' => Some(Duration::hours(amount)),
        'm' => Some(Duration::minutes(amount)),
        's' => Some(Duration::seconds(amount)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    lazy_static::lazy_static! {
        static ref ENV_LOCK: Mutex<()> = Mutex::new(());
    }

    const VARS: [&str; 8] = [
        "DATABASE_URL",
        "SERVER_PORT",
        "SERVER_HOST",
        "JWT_SECRET",
        "JWT_EXPIRE",
        "BCRYPT_COST",
        "CLIENT_URL",
        "APP_ENV",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_config_from_env() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("JWT_SECRET", "test-secret");

        let config = Config::from_env().unwrap();

        assert_eq!(config.database_url, None);
        assert_eq!(config.server_port, 5000);
        assert_eq!(config.server_host, "127.0.0.1");
        assert_eq!(config.jwt_expires_in, Duration::days(7));
        assert_eq!(config.bcrypt_cost, 12);
        assert_eq!(config.environment, "development");

        env::set_var("SERVER_PORT", "3000");
        env::set_var("SERVER_HOST", "0.0.0.0");
        env::set_var("JWT_EXPIRE", "12h");
        env::set_var("DATABASE_URL", "postgres://test");

        let config = Config::from_env().unwrap();

        assert_eq!(config.server_port, 3000);
        assert_eq!(config.server_host, "0.0.0.0");
        assert_eq!(config.jwt_expires_in, Duration::hours(12));
        assert_eq!(config.database_url.as_deref(), Some("postgres://test"));
        assert_eq!(config.server_url(), "http://0.0.0.0:3000");

        clear_env();
    }

    #[test]
    fn test_config_rejects_bad_values() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Missing("JWT_SECRET"))
        ));

        env::set_var("JWT_SECRET", "test-secret");
        env::set_var("BCRYPT_COST", "2");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid { var: "BCRYPT_COST", .. })
        ));

        env::remove_var("BCRYPT_COST");
        env::set_var("SERVER_PORT", "not-a-port");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid { var: "SERVER_PORT", .. })
        ));

        clear_env();
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("7d"), Some(Duration::days(7)));
        assert_eq!(parse_duration("30m"), Some(Duration::minutes(30)));
        assert_eq!(parse_duration("3600"), Some(Duration::seconds(3600)));
        assert_eq!(parse_duration("0d"), None);
        assert_eq!(parse_duration("7w"), None);
        assert_eq!(parse_duration(""), None);
    }
}
