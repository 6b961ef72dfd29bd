// Process-wide configuration for the carrier endpoints and batch polling signals
use crate::error::ConfigError;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_SINGLE_URL: &str = "https://tracking.russianpost.ru/rtm34";
pub const DEFAULT_BATCH_URL: &str = "https://tracking.russianpost.ru/fc";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_PORT: u16 = 3000;

// The two carrier services. `Single` speaks SOAP 1.2, `Batch` speaks SOAP 1.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKey {
    Single,
    Batch,
}

impl ServiceKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKey::Single => "single",
            ServiceKey::Batch => "batch",
        }
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceEndpoint {
    pub url: String,
    pub content_type: String,
    // None omits the header entirely; Some("") sends an empty SOAPAction.
    pub soap_action: Option<String>,
}

// Literal strings and error id the batch service uses to say "ask again later".
#[derive(Debug, Clone, PartialEq)]
pub struct NotReadySignals {
    pub messages: Vec<String>,
    pub error_id: String,
}

impl Default for NotReadySignals {
    fn default() -> Self {
        Self {
            messages: vec![
                "Ответ для ФК еще не готов".to_string(),
                "Ticket response is not ready yet".to_string(),
                "processing".to_string(),
                "in progress".to_string(),
            ],
            error_id: "6".to_string(),
        }
    }
}

impl NotReadySignals {
    // Case-insensitive substring match against every configured phrase.
    pub fn matches_message(&self, message: &str) -> bool {
        let lower = message.to_lowercase();
        self.messages
            .iter()
            .any(|phrase| lower.contains(&phrase.to_lowercase()))
    }

    pub fn matches_error_id(&self, error_id: &str) -> bool {
        error_id.trim() == self.error_id
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub single: ServiceEndpoint,
    pub batch: ServiceEndpoint,
    pub request_timeout: Duration,
    pub not_ready: NotReadySignals,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            single: ServiceEndpoint {
                url: DEFAULT_SINGLE_URL.to_string(),
                content_type: "application/soap+xml; charset=utf-8".to_string(),
                soap_action: None,
            },
            batch: ServiceEndpoint {
                url: DEFAULT_BATCH_URL.to_string(),
                content_type: "text/xml; charset=utf-8".to_string(),
                soap_action: Some(String::new()),
            },
            request_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            not_ready: NotReadySignals::default(),
        }
    }
}

impl ServiceConfig {
    pub fn endpoint(&self, key: ServiceKey) -> &ServiceEndpoint {
        match key {
            ServiceKey::Single => &self.single,
            ServiceKey::Batch => &self.batch,
        }
    }

    pub fn timeout_ms(&self) -> u64 {
        self.request_timeout.as_millis() as u64
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = non_empty(lookup("POCHTA_SINGLE_URL")) {
            config.single.url = url;
        }
        if let Some(url) = non_empty(lookup("POCHTA_BATCH_URL")) {
            config.batch.url = url;
        }
        if let Some(raw) = non_empty(lookup("API_TIMEOUT_MS")) {
            let timeout_ms = parse_positive(&raw).ok_or_else(|| ConfigError::InvalidValue {
                key: "API_TIMEOUT_MS".to_string(),
                value: raw.clone(),
            })?;
            config.request_timeout = Duration::from_millis(timeout_ms);
        }
        if let Some(error_id) = non_empty(lookup("BATCH_NOT_READY_ERROR_ID")) {
            config.not_ready.error_id = error_id;
        }

        Ok(config)
    }
}

// Port the REST facade listens on (`PORT`, default 3000).
pub fn listen_port_from_env() -> Result<u16, ConfigError> {
    match non_empty(std::env::var("PORT").ok()) {
        None => Ok(DEFAULT_PORT),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: "PORT".to_string(),
            value: raw,
        }),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_positive(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|v| *v > 0)
}
