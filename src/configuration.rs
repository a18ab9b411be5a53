use std::time::Duration;

use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub search: SearchSettings,
    pub bot: BotSettings,
}

#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
}

#[derive(Deserialize, Clone)]
pub struct SearchSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_secs: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub history_capacity: usize,
    pub primary: PrimaryBackendSettings,
    pub alternate: AlternateBackendSettings,
}

impl SearchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Google Custom Search JSON API.
#[derive(Deserialize, Clone)]
pub struct PrimaryBackendSettings {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub engine_id: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub inter_page_delay_ms: u64,
}

/// SerpAPI, Google engine.
#[derive(Deserialize, Clone)]
pub struct AlternateBackendSettings {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub inter_page_delay_ms: u64,
}

#[derive(Deserialize, Clone)]
pub struct BotSettings {
    pub token: Option<String>,
    pub api_url: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub poll_timeout_secs: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub session_ttl_secs: u64,
}

impl BotSettings {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "local" => Ok(Environment::Local),
            "production" => Ok(Environment::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().map_err(|e| {
        config::ConfigError::Message(format!("Failed to determine the current directory: {}", e))
    })?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;
    let environment_filename = format!("{}.yaml", environment.as_str());

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")))
        .add_source(config::File::from(
            configuration_directory.join(environment_filename),
        ))
        // APP_SEARCH__PRIMARY__API_KEY=... sets `search.primary.api_key`
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
