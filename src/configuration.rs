use std::{env, fs, ops::Deref, path::Path, sync::Arc};

use url::Url;

use crate::{
    error::Error,
    provider::{DatabasePool, HTTP},
    reconciliation::MissingPricePolicy,
};

#[derive(Debug)]
pub struct AppState<T>(Arc<T>);

impl<T> AppState<T> {
    pub fn new(state: T) -> AppState<T> {
        AppState(Arc::new(state))
    }
}

impl<T> Clone for AppState<T> {
    fn clone(&self) -> AppState<T> {
        AppState(Arc::clone(&self.0))
    }
}

impl<T> Deref for AppState<T> {
    type Target = Arc<T>;

    fn deref(&self) -> &Arc<T> {
        &self.0
    }
}

#[derive(Debug)]
pub struct State {
    pub config: Config,
    pub database: DatabasePool,
    pub http: HTTP,
}

impl State {
    pub fn new(config: Config, database: DatabasePool, http: HTTP) -> State {
        Self {
            config,
            database,
            http,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub reservoir_host: String,
    pub reservoir_api_key: Option<String>,
    pub events_limit: u16,
    pub events_max_pages: u16,
    pub ingest_interval: u64,
    pub reconcile_interval: u64,
    pub reconcile_batch_size: i64,
    pub missing_price_policy: MissingPricePolicy,
    pub timeout: u64,
    pub server_host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub enable_sync: bool,
}

impl Config {
    pub fn get_ask_events_url(
        &self,
        continuation: Option<&str>,
    ) -> Result<Url, Error> {
        let mut url = Url::parse(&self.reservoir_host)?.join("events/asks/v3")?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &self.events_limit.to_string());

            if let Some(continuation) = continuation {
                query.append_pair("continuation", continuation);
            }
        }

        Ok(url)
    }
}

const MAX_EVENTS_LIMIT: u16 = 1000;

/// Largest batch whose token writes stay within the PostgreSQL limit of
/// 65535 bind parameters (four per token row).
pub const MAX_RECONCILE_BATCH_SIZE: i64 = 16383;

pub fn check_batch_size(batch_size: i64) -> Result<i64, Error> {
    if batch_size <= 0 || batch_size > MAX_RECONCILE_BATCH_SIZE {
        return Err(Error::InvalidOption {
            option: format!(
                "batch size {}, expected 1..={}",
                batch_size, MAX_RECONCILE_BATCH_SIZE
            ),
        });
    }

    Ok(batch_size)
}

pub fn get_configuration() -> Result<Config, Error> {
    build_configuration(|key| env::var(key).ok())
}

fn build_configuration<F>(var: F) -> Result<Config, Error>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str, default: &str| -> String {
        var(key).unwrap_or_else(|| default.to_owned())
    };

    let database_url = var("DATABASE_URL").ok_or_else(|| {
        Error::ConfigurationError(String::from("DATABASE_URL is not set"))
    })?;
    let database_max_connections =
        get("DATABASE_MAX_CONNECTIONS", "20").parse()?;

    let mut reservoir_host = get("RESERVOIR_HOST", "https://api.reservoir.tools");
    if !reservoir_host.ends_with('/') {
        reservoir_host.push('/');
    }
    let reservoir_api_key =
        var("RESERVOIR_API_KEY").filter(|key| !key.trim().is_empty());

    let events_limit: u16 = get("EVENTS_LIMIT", "1000").parse()?;
    if events_limit == 0 || events_limit > MAX_EVENTS_LIMIT {
        return Err(Error::ConfigurationError(format!(
            "EVENTS_LIMIT must be between 1 and {}, got {}",
            MAX_EVENTS_LIMIT, events_limit
        )));
    }
    let events_max_pages = get("EVENTS_MAX_PAGES", "1").parse()?;

    let ingest_interval: u64 = get("INGEST_INTERVAL_IN_SEC", "3").parse()?;
    let reconcile_interval: u64 =
        get("RECONCILE_INTERVAL_IN_SEC", "3").parse()?;
    if ingest_interval == 0 || reconcile_interval == 0 {
        return Err(Error::ConfigurationError(String::from(
            "task intervals must be at least one second",
        )));
    }
    let reconcile_batch_size = check_batch_size(
        get("RECONCILE_BATCH_SIZE", "1000").parse()?,
    )
    .map_err(|e| {
        Error::ConfigurationError(format!("RECONCILE_BATCH_SIZE: {}", e))
    })?;
    let missing_price_policy = get("MISSING_PRICE_POLICY", "zero").parse()?;

    let timeout = get("TIMEOUT", "30").parse()?;
    let server_host = get("SERVER_HOST", "127.0.0.1");
    let port = get("PORT", "8080").parse()?;
    let allowed_origins = get("ALLOWED_ORIGINS", "http://localhost:8081")
        .split(',')
        .map(|item| item.trim().to_owned())
        .filter(|item| !item.is_empty())
        .collect::<Vec<String>>();
    let enable_sync = get("ENABLE_SYNC", "true").parse()?;

    let config = Config {
        database_url,
        database_max_connections,
        reservoir_host,
        reservoir_api_key,
        events_limit,
        events_max_pages,
        ingest_interval,
        reconcile_interval,
        reconcile_batch_size,
        missing_price_policy,
        timeout,
        server_host,
        port,
        allowed_origins,
        enable_sync,
    };

    Ok(config)
}

/// Loads `.env` from the crate directory into the process environment.
/// Variables that are already set keep their value; a missing file is not an
/// error.
pub fn set_configuration() -> Result<(), Error> {
    let config_file: &str = ".env";

    let directory = env!("CARGO_MANIFEST_DIR");
    let path = format!("{}/{}", directory, config_file);

    if !Path::new(&path).exists() {
        return Ok(());
    }

    let config_string = fs::read_to_string(path)?;

    for (key, value) in parse_config_string(&config_string) {
        if env::var_os(&key).is_none() {
            env::set_var(key, value);
        }
    }

    Ok(())
}

fn parse_config_string(config: &str) -> Vec<(String, String)> {
    config
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim().trim_matches('"');
            (key.trim().to_owned(), value.to_owned())
        })
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(
        pairs: &[(&str, &str)],
    ) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_parse_config_string() {
        let parsed = parse_config_string(
            "# database\nDATABASE_URL=postgres://u:p@localhost/db?x=1\r\n\nPORT = 9000\nBROKEN\nRESERVOIR_API_KEY=\"abc\"\n",
        );

        assert_eq!(
            parsed,
            vec![
                (
                    String::from("DATABASE_URL"),
                    String::from("postgres://u:p@localhost/db?x=1")
                ),
                (String::from("PORT"), String::from("9000")),
                (String::from("RESERVOIR_API_KEY"), String::from("abc")),
            ]
        );
    }

    #[test]
    fn test_defaults() {
        let config =
            build_configuration(lookup(&[("DATABASE_URL", "postgres://db")]))
                .unwrap();

        assert_eq!(config.reservoir_host, "https://api.reservoir.tools/");
        assert_eq!(config.reservoir_api_key, None);
        assert_eq!(config.events_limit, 1000);
        assert_eq!(config.events_max_pages, 1);
        assert_eq!(config.ingest_interval, 3);
        assert_eq!(config.reconcile_batch_size, 1000);
        assert_eq!(config.missing_price_policy, MissingPricePolicy::Zero);
        assert_eq!(config.port, 8080);
        assert_eq!(config.allowed_origins, vec!["http://localhost:8081"]);
        assert!(config.enable_sync);
    }

    #[test]
    fn test_database_url_is_required() {
        let result = build_configuration(lookup(&[]));
        assert!(matches!(result, Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn test_events_limit_bounds() {
        let result = build_configuration(lookup(&[
            ("DATABASE_URL", "postgres://db"),
            ("EVENTS_LIMIT", "1001"),
        ]));
        assert!(matches!(result, Err(Error::ConfigurationError(_))));

        let result = build_configuration(lookup(&[
            ("DATABASE_URL", "postgres://db"),
            ("EVENTS_LIMIT", "0"),
        ]));
        assert!(matches!(result, Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn test_overrides() {
        let config = build_configuration(lookup(&[
            ("DATABASE_URL", "postgres://db"),
            ("RESERVOIR_HOST", "https://api-sepolia.reservoir.tools"),
            ("RESERVOIR_API_KEY", "secret"),
            ("MISSING_PRICE_POLICY", "exclude"),
            ("ALLOWED_ORIGINS", "*, https://app.example"),
            ("ENABLE_SYNC", "false"),
        ]))
        .unwrap();

        assert_eq!(config.reservoir_api_key.as_deref(), Some("secret"));
        assert_eq!(config.missing_price_policy, MissingPricePolicy::Exclude);
        assert_eq!(config.allowed_origins, vec!["*", "https://app.example"]);
        assert!(!config.enable_sync);

        let url = config.get_ask_events_url(Some("abc=")).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api-sepolia.reservoir.tools/events/asks/v3?limit=1000&continuation=abc%3D"
        );
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let result = build_configuration(lookup(&[
            ("DATABASE_URL", "postgres://db"),
            ("RECONCILE_INTERVAL_IN_SEC", "0"),
        ]));
        assert!(matches!(result, Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn test_batch_size_bounds() {
        for value in ["0", "-1", "16384", "40000"] {
            let result = build_configuration(lookup(&[
                ("DATABASE_URL", "postgres://db"),
                ("RECONCILE_BATCH_SIZE", value),
            ]));
            assert!(
                matches!(result, Err(Error::ConfigurationError(_))),
                "{} accepted",
                value
            );
        }

        let config = build_configuration(lookup(&[
            ("DATABASE_URL", "postgres://db"),
            ("RECONCILE_BATCH_SIZE", "16383"),
        ]))
        .unwrap();
        assert_eq!(config.reconcile_batch_size, MAX_RECONCILE_BATCH_SIZE);
    }

    #[test]
    fn test_check_batch_size() {
        assert_eq!(check_batch_size(1).unwrap(), 1);
        assert_eq!(check_batch_size(16383).unwrap(), 16383);
        assert!(matches!(
            check_batch_size(16384),
            Err(Error::InvalidOption { .. })
        ));
        assert!(matches!(check_batch_size(0), Err(Error::InvalidOption { .. })));
    }

    #[test]
    fn test_invalid_policy_is_rejected() {
        let result = build_configuration(lookup(&[
            ("DATABASE_URL", "postgres://db"),
            ("MISSING_PRICE_POLICY", "ignore"),
        ]));
        assert!(matches!(result, Err(Error::InvalidOption { .. })));
    }
}
