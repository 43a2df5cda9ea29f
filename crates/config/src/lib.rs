//! Layered configuration for the collector and enricher binaries.
//!
//! Precedence, highest to lowest: explicit overrides passed to [`Config::load`],
//! a JSON file (`DATENSTROM_CONFIG` env var, falling back to `./config.json`),
//! individual `DATENSTROM_*` environment variables, then built-in defaults.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use url::Url;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("config file {path:?} not found")]
    FileNotFound { path: PathBuf },
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("missing required config key: {0}")]
    MissingRequiredKey(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordFormat {
    Thrift,
    Avro,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Kafka,
    Sqs,
    Dev,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventsTransport {
    Kafka,
    Sqs,
    Dev,
    Firehose,
}

/// Fully resolved configuration. Every field has a concrete value; optional
/// keys that were never supplied surface as `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub record_format: RecordFormat,
    pub transport: Transport,
    pub atomic_event_transport: Option<EventsTransport>,

    pub max_bytes: usize,
    pub iglu_schema_registries: Vec<Url>,

    pub kafka_brokers: Option<String>,
    pub kafka_topic_raw: Option<String>,
    pub kafka_topic_events: Option<String>,
    pub kafka_topic_errors: Option<String>,

    pub sqs_queue_raw: Option<String>,
    pub sqs_queue_events: Option<String>,
    pub sqs_queue_errors: Option<String>,

    pub firehose_stream_name: Option<String>,

    pub geoip_enabled: bool,
    pub geoip_db_url: String,
    pub geoip_db_file: String,
    pub asset_dir: PathBuf,
    pub download_geoip_db: bool,

    pub tenant_lookup_endpoint: Option<Url>,
    pub remote_config_endpoint: Option<Url>,

    pub authentication_public_key: Option<String>,
    pub authentication_sub_field: String,
    pub authentication_aud: Option<String>,
    pub authentication_iss_jwk_urls: HashMap<String, Url>,

    pub campaign_enrichment_enabled: bool,
    pub device_enrichment_enabled: bool,

    pub default_cache_ttl: u64,
    pub none_cache_ttl: u64,

    pub cookie_name: String,
    pub cookie_domains: Vec<String>,
    pub cookie_fallback_domain: Option<String>,
    pub cookie_expiration_days: i64,
    pub cookie_secure: bool,
    pub cookie_http_only: bool,
    pub cookie_same_site: String,
    pub enable_cookies: bool,
    pub domain_check_regex: Option<String>,
    pub enable_redirect_tracking: bool,
    pub collector_listen_addr: String,
}

/// Partial, all-`Option` mirror of [`Config`] used for the JSON-file layer and
/// for constructor overrides. `None` means "not specified at this layer".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartialConfig {
    pub record_format: Option<RecordFormat>,
    pub transport: Option<Transport>,
    pub atomic_event_transport: Option<EventsTransport>,

    pub max_bytes: Option<usize>,
    pub iglu_schema_registries: Option<Vec<Url>>,

    pub kafka_brokers: Option<String>,
    pub kafka_topic_raw: Option<String>,
    pub kafka_topic_events: Option<String>,
    pub kafka_topic_errors: Option<String>,

    pub sqs_queue_raw: Option<String>,
    pub sqs_queue_events: Option<String>,
    pub sqs_queue_errors: Option<String>,

    pub firehose_stream_name: Option<String>,

    pub geoip_enabled: Option<bool>,
    pub geoip_db_url: Option<String>,
    pub geoip_db_file: Option<String>,
    pub asset_dir: Option<PathBuf>,
    pub download_geoip_db: Option<bool>,

    pub tenant_lookup_endpoint: Option<Url>,
    pub remote_config_endpoint: Option<Url>,

    pub authentication_public_key: Option<String>,
    pub authentication_sub_field: Option<String>,
    pub authentication_aud: Option<String>,
    pub authentication_iss_jwk_urls: Option<HashMap<String, Url>>,

    pub campaign_enrichment_enabled: Option<bool>,
    pub device_enrichment_enabled: Option<bool>,

    pub default_cache_ttl: Option<u64>,
    pub none_cache_ttl: Option<u64>,

    pub cookie_name: Option<String>,
    pub cookie_domains: Option<Vec<String>>,
    pub cookie_fallback_domain: Option<String>,
    pub cookie_expiration_days: Option<i64>,
    pub cookie_secure: Option<bool>,
    pub cookie_http_only: Option<bool>,
    pub cookie_same_site: Option<String>,
    pub enable_cookies: Option<bool>,
    pub domain_check_regex: Option<String>,
    pub enable_redirect_tracking: Option<bool>,
    pub collector_listen_addr: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            record_format: RecordFormat::Avro,
            transport: Transport::Dev,
            atomic_event_transport: None,
            max_bytes: 190_000,
            iglu_schema_registries: vec!["https://iglucentral.com/schemas/"
                .parse()
                .expect("static URL parses")],
            kafka_brokers: None,
            kafka_topic_raw: None,
            kafka_topic_events: None,
            kafka_topic_errors: None,
            sqs_queue_raw: None,
            sqs_queue_events: None,
            sqs_queue_errors: None,
            firehose_stream_name: None,
            geoip_enabled: false,
            geoip_db_url:
                "https://github.com/P3TERX/GeoLite.mmdb/raw/download/GeoLite2-City.mmdb"
                    .to_string(),
            geoip_db_file: "GeoLite2-City.mmdb".to_string(),
            asset_dir: PathBuf::from("assets"),
            download_geoip_db: false,
            tenant_lookup_endpoint: None,
            remote_config_endpoint: None,
            authentication_public_key: None,
            authentication_sub_field: "sub".to_string(),
            authentication_aud: None,
            authentication_iss_jwk_urls: HashMap::new(),
            campaign_enrichment_enabled: true,
            device_enrichment_enabled: true,
            default_cache_ttl: 3600,
            none_cache_ttl: 60,
            cookie_name: "sp".to_string(),
            cookie_domains: Vec::new(),
            cookie_fallback_domain: None,
            cookie_expiration_days: 365,
            cookie_secure: true,
            cookie_http_only: true,
            cookie_same_site: "None".to_string(),
            enable_cookies: false,
            domain_check_regex: None,
            enable_redirect_tracking: false,
            collector_listen_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from the JSON-file and environment layers, applies
    /// `overrides` on top (the constructor layer), and falls back to defaults
    /// for anything still unset.
    pub fn load(overrides: PartialConfig) -> Result<Config, ConfigError> {
        let mut resolved = Config::default();

        let file_layer = read_file_layer()?;
        apply(&mut resolved, file_layer);

        let env_layer = read_env_layer()?;
        apply(&mut resolved, env_layer);

        apply(&mut resolved, overrides);

        if resolved.iglu_schema_registries.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "iglu_schema_registries",
                reason: "must contain at least one registry URL".to_string(),
            });
        }

        Ok(resolved)
    }

    /// Convenience constructor for tests and examples: dev transport, avro
    /// wire format, no remote registries beyond the hardcoded one.
    pub fn test_default() -> Config {
        Config {
            transport: Transport::Dev,
            record_format: RecordFormat::Avro,
            ..Config::default()
        }
    }
}

/// Merges every `Some` field of `partial` into `base`, leaving existing
/// values alone where `partial` is `None`.
fn apply(base: &mut Config, partial: PartialConfig) {
    macro_rules! merge {
        ($field:ident) => {
            if let Some(v) = partial.$field {
                base.$field = v;
            }
        };
    }
    // Fields whose resolved type is itself `Option<T>` need the extracted
    // value re-wrapped — `merge!` would otherwise try to assign a bare `T`
    // into an `Option<T>` place.
    macro_rules! merge_opt {
        ($field:ident) => {
            if let Some(v) = partial.$field {
                base.$field = Some(v);
            }
        };
    }
    merge!(record_format);
    merge!(transport);
    merge_opt!(atomic_event_transport);
    merge!(max_bytes);
    merge!(iglu_schema_registries);
    merge_opt!(kafka_brokers);
    merge_opt!(kafka_topic_raw);
    merge_opt!(kafka_topic_events);
    merge_opt!(kafka_topic_errors);
    merge_opt!(sqs_queue_raw);
    merge_opt!(sqs_queue_events);
    merge_opt!(sqs_queue_errors);
    merge_opt!(firehose_stream_name);
    merge!(geoip_enabled);
    merge!(geoip_db_url);
    merge!(geoip_db_file);
    merge!(asset_dir);
    merge!(download_geoip_db);
    merge_opt!(tenant_lookup_endpoint);
    merge_opt!(remote_config_endpoint);
    merge_opt!(authentication_public_key);
    merge!(authentication_sub_field);
    merge_opt!(authentication_aud);
    merge!(authentication_iss_jwk_urls);
    merge!(campaign_enrichment_enabled);
    merge!(device_enrichment_enabled);
    merge!(default_cache_ttl);
    merge!(none_cache_ttl);
    merge!(cookie_name);
    merge!(cookie_domains);
    merge_opt!(cookie_fallback_domain);
    merge!(cookie_expiration_days);
    merge!(cookie_secure);
    merge!(cookie_http_only);
    merge!(cookie_same_site);
    merge!(enable_cookies);
    merge_opt!(domain_check_regex);
    merge!(enable_redirect_tracking);
    merge!(collector_listen_addr);
}

fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("DATENSTROM_CONFIG") {
        return Some(PathBuf::from(path));
    }
    let default_path = Path::new("config.json");
    default_path.exists().then(|| default_path.to_path_buf())
}

fn read_file_layer() -> Result<PartialConfig, ConfigError> {
    let Some(path) = config_file_path() else {
        return Ok(PartialConfig::default());
    };
    if std::env::var("DATENSTROM_CONFIG").is_ok() && !path.exists() {
        return Err(ConfigError::FileNotFound { path });
    }
    let contents =
        std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
}

/// Reads one `DATENSTROM_<FIELD>` environment variable per config key.
/// Unset variables are left `None` and fall through to the next layer.
fn read_env_layer() -> Result<PartialConfig, ConfigError> {
    let mut p = PartialConfig::default();

    p.record_format = env_parsed("RECORD_FORMAT")?;
    p.transport = env_parsed("TRANSPORT")?;
    p.atomic_event_transport = env_parsed("ATOMIC_EVENT_TRANSPORT")?;
    p.max_bytes = env_parsed("MAX_BYTES")?;
    p.iglu_schema_registries = env_var("IGLU_SCHEMA_REGISTRIES").map(|v| {
        v.split(',')
            .filter_map(|s| s.trim().parse::<Url>().ok())
            .collect()
    });
    p.kafka_brokers = env_var("KAFKA_BROKERS");
    p.kafka_topic_raw = env_var("KAFKA_TOPIC_RAW");
    p.kafka_topic_events = env_var("KAFKA_TOPIC_EVENTS");
    p.kafka_topic_errors = env_var("KAFKA_TOPIC_ERRORS");
    p.sqs_queue_raw = env_var("SQS_QUEUE_RAW");
    p.sqs_queue_events = env_var("SQS_QUEUE_EVENTS");
    p.sqs_queue_errors = env_var("SQS_QUEUE_ERRORS");
    p.firehose_stream_name = env_var("FIREHOSE_STREAM_NAME");
    p.geoip_enabled = env_parsed("GEOIP_ENABLED")?;
    p.geoip_db_url = env_var("GEOIP_DB_URL");
    p.geoip_db_file = env_var("GEOIP_DB_FILE");
    p.asset_dir = env_var("ASSET_DIR").map(PathBuf::from);
    p.download_geoip_db = env_parsed("DOWNLOAD_GEOIP_DB")?;
    p.tenant_lookup_endpoint = env_parsed("TENANT_LOOKUP_ENDPOINT")?;
    p.remote_config_endpoint = env_parsed("REMOTE_CONFIG_ENDPOINT")?;
    p.authentication_public_key = env_var("AUTHENTICATION_PUBLIC_KEY");
    p.authentication_sub_field = env_var("AUTHENTICATION_SUB_FIELD");
    p.authentication_aud = env_var("AUTHENTICATION_AUD");
    p.campaign_enrichment_enabled = env_parsed("CAMPAIGN_ENRICHMENT_ENABLED")?;
    p.device_enrichment_enabled = env_parsed("DEVICE_ENRICHMENT_ENABLED")?;
    p.default_cache_ttl = env_parsed("DEFAULT_CACHE_TTL")?;
    p.none_cache_ttl = env_parsed("NONE_CACHE_TTL")?;
    p.cookie_name = env_var("COOKIE_NAME");
    p.cookie_domains = env_var("COOKIE_DOMAINS")
        .map(|v| v.split(',').map(|s| s.trim().to_string()).collect());
    p.cookie_fallback_domain = env_var("COOKIE_FALLBACK_DOMAIN");
    p.cookie_expiration_days = env_parsed("COOKIE_EXPIRATION_DAYS")?;
    p.cookie_secure = env_parsed("COOKIE_SECURE")?;
    p.cookie_http_only = env_parsed("COOKIE_HTTP_ONLY")?;
    p.cookie_same_site = env_var("COOKIE_SAME_SITE");
    p.enable_cookies = env_parsed("ENABLE_COOKIES")?;
    p.domain_check_regex = env_var("DOMAIN_CHECK_REGEX");
    p.enable_redirect_tracking = env_parsed("ENABLE_REDIRECT_TRACKING")?;
    p.collector_listen_addr = env_var("COLLECTOR_LISTEN_ADDR");

    Ok(p)
}

fn env_var(suffix: &str) -> Option<String> {
    std::env::var(format!("DATENSTROM_{suffix}")).ok()
}

fn env_parsed<T: std::str::FromStr>(suffix: &str) -> Result<Option<T>, ConfigError> {
    match env_var(suffix) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                field: "environment variable",
                reason: format!("DATENSTROM_{suffix}={raw:?} could not be parsed"),
            }),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_usable_without_any_layer() {
        let cfg = Config::test_default();
        assert_eq!(cfg.max_bytes, 190_000);
        assert_eq!(cfg.default_cache_ttl, 3600);
        assert_eq!(cfg.none_cache_ttl, 60);
        assert!(cfg.campaign_enrichment_enabled);
        assert_eq!(cfg.iglu_schema_registries.len(), 1);
    }

    #[test]
    fn test_constructor_overrides_outrank_defaults() {
        let overrides = PartialConfig {
            max_bytes: Some(4096),
            transport: Some(Transport::Kafka),
            ..Default::default()
        };
        // Isolate from any ambient DATENSTROM_CONFIG/config.json in the test environment.
        std::env::remove_var("DATENSTROM_CONFIG");
        let cfg = Config::load(overrides).unwrap();
        assert_eq!(cfg.max_bytes, 4096);
        assert_eq!(cfg.transport, Transport::Kafka);
    }

    #[test]
    fn test_file_layer_beats_defaults_but_not_constructor() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("cfg.json");
        let mut f = std::fs::File::create(&file_path).unwrap();
        writeln!(f, r#"{{"max_bytes": 1000, "transport": "sqs"}}"#).unwrap();

        std::env::set_var("DATENSTROM_CONFIG", &file_path);
        let cfg = Config::load(PartialConfig {
            transport: Some(Transport::Dev),
            ..Default::default()
        })
        .unwrap();
        std::env::remove_var("DATENSTROM_CONFIG");

        assert_eq!(cfg.max_bytes, 1000); // from file, no constructor override
        assert_eq!(cfg.transport, Transport::Dev); // constructor wins over file
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        std::env::set_var("DATENSTROM_CONFIG", "/nonexistent/path/config.json");
        let err = Config::load(PartialConfig::default()).unwrap_err();
        std::env::remove_var("DATENSTROM_CONFIG");
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }
}
