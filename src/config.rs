use std::path::PathBuf;

pub const DEFAULT_DATE_FORMAT: &str = "%b %-d, %Y";
pub const DEFAULT_LOG_FILTER: &str = "taskboard=info";

/// Runtime settings: command-line flags first, then environment, then defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Explicit store directory; when unset the store is discovered.
    pub store_dir: Option<PathBuf>,
    /// strftime format used to display due dates.
    pub date_format: String,
    pub log_filter: String,
}

impl Config {
    pub fn from_env(store_flag: Option<PathBuf>) -> Self {
        Self::resolve(store_flag, |key| std::env::var(key).ok())
    }

    fn resolve(store_flag: Option<PathBuf>, var: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());
        let store_dir = store_flag.or_else(|| non_empty("TASKBOARD_STORE").map(PathBuf::from));
        let date_format =
            non_empty("TASKBOARD_DATE_FORMAT").unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string());
        let log_filter =
            non_empty("TASKBOARD_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        Config {
            store_dir,
            date_format,
            log_filter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::resolve(None, env(&[]));
        assert_eq!(config.store_dir, None);
        assert_eq!(config.date_format, DEFAULT_DATE_FORMAT);
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_flag_beats_environment() {
        let vars = env(&[("TASKBOARD_STORE", "/from/env"), ("TASKBOARD_DATE_FORMAT", "%d/%m/%Y")]);
        let config = Config::resolve(Some(PathBuf::from("/from/flag")), vars);
        assert_eq!(config.store_dir, Some(PathBuf::from("/from/flag")));
        assert_eq!(config.date_format, "%d/%m/%Y");
    }

    #[test]
    fn test_blank_values_ignored() {
        let config = Config::resolve(None, env(&[("TASKBOARD_STORE", " "), ("TASKBOARD_LOG", "")]));
        assert_eq!(config.store_dir, None);
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
    }
}
