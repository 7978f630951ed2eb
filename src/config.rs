//! Configuration types.
//!
//! Everything comes from environment variables; unset variables fall back
//! to defaults that run the bot offline with the keyword recognizer and an
//! in-memory store.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::bot::{DialogSettings, Pacing};
use crate::dialog::DEFAULT_MAX_STEPS_PER_TURN;
use crate::error::ConfigError;
use crate::recognizer::luis::LuisConfig;

const DEFAULT_LUIS_SLOT: &str = "production";
const DEFAULT_MAX_ENTITY_RETRIES: u32 = 3;

/// Which recognizer interprets user input.
#[derive(Debug, Clone)]
pub enum RecognizerBackend {
    /// Offline regex recognizer.
    Keyword,
    /// Hosted LUIS prediction endpoint.
    Luis(LuisConfig),
}

/// Bot configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub recognizer: RecognizerBackend,
    /// `None` keeps re-asking for a missing answer forever.
    pub max_entity_retries: Option<u32>,
    pub max_steps_per_turn: usize,
    /// Multiplier on the pauses between messages. `0` sends immediately.
    pub pacing: f64,
    /// libSQL file. `None` keeps everything in memory.
    pub db_path: Option<PathBuf>,
    /// Port for the web chat server. `None` disables web chat.
    pub ws_port: Option<u16>,
    /// JSON reply tables replacing the built-in ones.
    pub replies_path: Option<PathBuf>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            recognizer: RecognizerBackend::Keyword,
            max_entity_retries: Some(DEFAULT_MAX_ENTITY_RETRIES),
            max_steps_per_turn: DEFAULT_MAX_STEPS_PER_TURN,
            pacing: 1.0,
            db_path: None,
            ws_port: None,
            replies_path: None,
        }
    }
}

impl BotConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. Empty values count as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let recognizer = match get("BOTWISE_RECOGNIZER").as_deref() {
            None | Some("keyword") => RecognizerBackend::Keyword,
            Some("luis") => {
                let require = |key: &str| {
                    get(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
                };
                RecognizerBackend::Luis(LuisConfig {
                    endpoint: require("LUIS_ENDPOINT")?,
                    app_id: require("LUIS_APP_ID")?,
                    api_key: SecretString::from(require("LUIS_API_KEY")?),
                    slot: get("LUIS_SLOT").unwrap_or_else(|| DEFAULT_LUIS_SLOT.to_string()),
                })
            }
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "BOTWISE_RECOGNIZER".to_string(),
                    message: format!("expected `keyword` or `luis`, got `{other}`"),
                });
            }
        };

        let max_entity_retries = match get("BOTWISE_MAX_ENTITY_RETRIES") {
            None => Some(DEFAULT_MAX_ENTITY_RETRIES),
            Some(v) if v.eq_ignore_ascii_case("none") => None,
            Some(v) => Some(parse("BOTWISE_MAX_ENTITY_RETRIES", &v)?),
        };

        let max_steps_per_turn = match get("BOTWISE_MAX_STEPS_PER_TURN") {
            None => DEFAULT_MAX_STEPS_PER_TURN,
            Some(v) => {
                let n: usize = parse("BOTWISE_MAX_STEPS_PER_TURN", &v)?;
                if n == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: "BOTWISE_MAX_STEPS_PER_TURN".to_string(),
                        message: "must be at least 1".to_string(),
                    });
                }
                n
            }
        };

        let pacing = match get("BOTWISE_PACING") {
            None => 1.0,
            Some(v) => {
                let scale: f64 = parse("BOTWISE_PACING", &v)?;
                if !scale.is_finite() || scale < 0.0 {
                    return Err(ConfigError::InvalidValue {
                        key: "BOTWISE_PACING".to_string(),
                        message: "must be a non-negative number".to_string(),
                    });
                }
                scale
            }
        };

        let ws_port = get("BOTWISE_WS_PORT")
            .map(|v| parse::<u16>("BOTWISE_WS_PORT", &v))
            .transpose()?;

        Ok(Self {
            recognizer,
            max_entity_retries,
            max_steps_per_turn,
            pacing,
            db_path: get("BOTWISE_DB_PATH").map(PathBuf::from),
            ws_port,
            replies_path: get("BOTWISE_REPLIES_PATH").map(PathBuf::from),
        })
    }

    pub fn dialog_settings(&self) -> DialogSettings {
        DialogSettings {
            max_entity_retries: self.max_entity_retries,
            max_steps_per_turn: self.max_steps_per_turn,
            pacing: Pacing::new(self.pacing),
        }
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("`{value}`: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use secrecy::ExposeSecret;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<BotConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BotConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]).unwrap();
        assert!(matches!(cfg.recognizer, RecognizerBackend::Keyword));
        assert_eq!(cfg.max_entity_retries, Some(3));
        assert_eq!(cfg.max_steps_per_turn, DEFAULT_MAX_STEPS_PER_TURN);
        assert_eq!(cfg.pacing, 1.0);
        assert!(cfg.db_path.is_none());
        assert!(cfg.ws_port.is_none());
        assert!(cfg.replies_path.is_none());
        assert_eq!(cfg.dialog_settings(), DialogSettings::default());
    }

    #[test]
    fn luis_requires_credentials() {
        let err = config(&[("BOTWISE_RECOGNIZER", "luis"), ("LUIS_ENDPOINT", "https://x")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "LUIS_APP_ID"));

        let cfg = config(&[
            ("BOTWISE_RECOGNIZER", "luis"),
            ("LUIS_ENDPOINT", "https://westeurope.api.cognitive.microsoft.com"),
            ("LUIS_APP_ID", "app"),
            ("LUIS_API_KEY", "secret"),
        ])
        .unwrap();
        let RecognizerBackend::Luis(luis) = cfg.recognizer else {
            panic!("expected luis backend");
        };
        assert_eq!(luis.app_id, "app");
        assert_eq!(luis.slot, "production");
        assert_eq!(luis.api_key.expose_secret(), "secret");
    }

    #[test]
    fn unknown_recognizer_rejected() {
        let err = config(&[("BOTWISE_RECOGNIZER", "gpt")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "BOTWISE_RECOGNIZER"));
    }

    #[test]
    fn retries_accept_none() {
        let cfg = config(&[("BOTWISE_MAX_ENTITY_RETRIES", "none")]).unwrap();
        assert_eq!(cfg.max_entity_retries, None);
        let cfg = config(&[("BOTWISE_MAX_ENTITY_RETRIES", "5")]).unwrap();
        assert_eq!(cfg.max_entity_retries, Some(5));
        assert!(config(&[("BOTWISE_MAX_ENTITY_RETRIES", "lots")]).is_err());
    }

    #[test]
    fn step_limit_must_be_positive() {
        assert!(config(&[("BOTWISE_MAX_STEPS_PER_TURN", "0")]).is_err());
        let cfg = config(&[("BOTWISE_MAX_STEPS_PER_TURN", "10")]).unwrap();
        assert_eq!(cfg.dialog_settings().max_steps_per_turn, 10);
    }

    #[test]
    fn pacing_scales_delays() {
        let cfg = config(&[("BOTWISE_PACING", "0")]).unwrap();
        assert_eq!(cfg.dialog_settings().pacing.delay(1000), Duration::ZERO);
        let cfg = config(&[("BOTWISE_PACING", "0.5")]).unwrap();
        assert_eq!(cfg.dialog_settings().pacing.delay(1000), Duration::from_millis(500));
        assert!(config(&[("BOTWISE_PACING", "-1")]).is_err());
    }

    #[test]
    fn paths_and_port() {
        let cfg = config(&[
            ("BOTWISE_DB_PATH", "./data/botwise.db"),
            ("BOTWISE_WS_PORT", "8080"),
            ("BOTWISE_REPLIES_PATH", "replies.json"),
        ])
        .unwrap();
        assert_eq!(cfg.db_path, Some(PathBuf::from("./data/botwise.db")));
        assert_eq!(cfg.ws_port, Some(8080));
        assert_eq!(cfg.replies_path, Some(PathBuf::from("replies.json")));
        assert!(config(&[("BOTWISE_WS_PORT", "99999")]).is_err());
    }

    #[test]
    fn blank_values_count_as_unset() {
        let cfg = config(&[("BOTWISE_DB_PATH", "  "), ("BOTWISE_RECOGNIZER", "")]).unwrap();
        assert!(cfg.db_path.is_none());
        assert!(matches!(cfg.recognizer, RecognizerBackend::Keyword));
    }
}
