use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Dosewise";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default listen address for the HTTP API.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8787";

/// Default bearer session lifetime: 7 days.
pub const DEFAULT_SESSION_TTL_HOURS: u64 = 24 * 7;

/// Longest accepted session lifetime: one year.
pub const MAX_SESSION_TTL_HOURS: u64 = 24 * 365;

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "dosewise=info,tower_http=warn"
}

/// Get the application data directory
/// ~/Dosewise/ on all platforms, falling back to the working directory
/// when no home directory can be determined.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default path of the SQLite database file.
pub fn default_database_path() -> PathBuf {
    app_data_dir().join("dosewise.db")
}

/// Runtime configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_path: PathBuf,
    /// Whether doctor searches consult the supplementary registry.
    pub external_directory: bool,
    pub session_ttl_hours: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 8787))),
            database_path: default_database_path(),
            external_directory: true,
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
        }
    }
}

impl AppConfig {
    /// Build from `DOSEWISE_*` environment variables over the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, with an injectable lookup (for tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup("DOSEWISE_BIND") {
            match raw.parse() {
                Ok(addr) => config.bind_addr = addr,
                Err(e) => tracing::warn!(value = %raw, error = %e, "Ignoring invalid DOSEWISE_BIND"),
            }
        }

        if let Some(path) = lookup("DOSEWISE_DB_PATH") {
            if !path.trim().is_empty() {
                config.database_path = PathBuf::from(path);
            }
        }

        if let Some(flag) = lookup("DOSEWISE_EXTERNAL_DIRECTORY") {
            config.external_directory = !matches!(
                flag.trim().to_ascii_lowercase().as_str(),
                "0" | "off" | "false" | "no"
            );
        }

        if let Some(raw) = lookup("DOSEWISE_SESSION_TTL_HOURS") {
            match raw.trim().parse::<u64>() {
                Ok(hours) if hours > MAX_SESSION_TTL_HOURS => {
                    tracing::warn!(value = %raw, max = MAX_SESSION_TTL_HOURS, "Clamping DOSEWISE_SESSION_TTL_HOURS");
                    config.session_ttl_hours = MAX_SESSION_TTL_HOURS;
                }
                Ok(hours) if hours > 0 => config.session_ttl_hours = hours,
                _ => tracing::warn!(value = %raw, "Ignoring invalid DOSEWISE_SESSION_TTL_HOURS"),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn database_path_under_app_data() {
        let db = default_database_path();
        assert!(db.starts_with(app_data_dir()));
        assert!(db.ends_with("dosewise.db"));
    }

    #[test]
    fn app_name_is_dosewise() {
        assert_eq!(APP_NAME, "Dosewise");
    }

    #[test]
    fn defaults_without_env() {
        let config = AppConfig::from_lookup(|_| None);
        assert_eq!(config.bind_addr.port(), 8787);
        assert!(config.external_directory);
        assert_eq!(config.session_ttl_hours, DEFAULT_SESSION_TTL_HOURS);
    }

    #[test]
    fn env_overrides_apply() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DOSEWISE_BIND", "0.0.0.0:9000"),
            ("DOSEWISE_DB_PATH", "/tmp/meds.db"),
            ("DOSEWISE_EXTERNAL_DIRECTORY", "off"),
            ("DOSEWISE_SESSION_TTL_HOURS", "12"),
        ]));
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.database_path, PathBuf::from("/tmp/meds.db"));
        assert!(!config.external_directory);
        assert_eq!(config.session_ttl_hours, 12);
    }

    #[test]
    fn invalid_values_keep_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DOSEWISE_BIND", "not-an-address"),
            ("DOSEWISE_SESSION_TTL_HOURS", "0"),
        ]));
        assert_eq!(config.bind_addr.port(), 8787);
        assert_eq!(config.session_ttl_hours, DEFAULT_SESSION_TTL_HOURS);
    }

    #[test]
    fn oversized_session_ttl_is_clamped() {
        let config = AppConfig::from_lookup(lookup_from(&[(
            "DOSEWISE_SESSION_TTL_HOURS",
            "18446744073709551615",
        )]));
        assert_eq!(config.session_ttl_hours, MAX_SESSION_TTL_HOURS);
    }
}
