//! LUIS recognizer — calls the v3 prediction endpoint over HTTPS.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use super::{Intent, IntentScore, Recognizer, RecognizerResult};
use crate::error::RecognizerError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for a published LUIS application.
#[derive(Debug, Clone)]
pub struct LuisConfig {
    /// e.g. `https://westeurope.api.cognitive.microsoft.com`
    pub endpoint: String,
    pub app_id: String,
    pub api_key: SecretString,
    /// Publishing slot, `production` or `staging`.
    pub slot: String,
}

/// Recognizer backed by a LUIS prediction endpoint.
pub struct LuisRecognizer {
    config: LuisConfig,
    client: reqwest::Client,
}

impl LuisRecognizer {
    pub fn new(config: LuisConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { config, client }
    }

    fn prediction_url(&self) -> String {
        format!(
            "{}/luis/prediction/v3.0/apps/{}/slots/{}/predict",
            self.config.endpoint.trim_end_matches('/'),
            self.config.app_id,
            self.config.slot
        )
    }
}

#[async_trait]
impl Recognizer for LuisRecognizer {
    fn name(&self) -> &str {
        "luis"
    }

    async fn recognize(&self, text: &str) -> Result<RecognizerResult, RecognizerError> {
        let resp = self
            .client
            .get(self.prediction_url())
            .query(&[
                ("subscription-key", self.config.api_key.expose_secret()),
                ("query", text),
                ("verbose", "false"),
            ])
            .send()
            .await
            .map_err(|e| RecognizerError::RequestFailed {
                recognizer: "luis".into(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RecognizerError::BadStatus {
                recognizer: "luis".into(),
                status: status.as_u16(),
            });
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| RecognizerError::InvalidResponse {
                recognizer: "luis".into(),
                reason: e.to_string(),
            })?;

        let result = parse_prediction(text, &body)?;
        tracing::debug!(
            intent = %result.top_intent().0,
            entities = result.entities.len(),
            "LUIS prediction"
        );
        Ok(result)
    }
}

/// Convert a v3 prediction response body into a [`RecognizerResult`].
///
/// Intent order is preserved as sent. Unknown intent labels and the
/// `$instance` metadata block are skipped.
pub fn parse_prediction(text: &str, body: &Value) -> Result<RecognizerResult, RecognizerError> {
    let prediction = body
        .get("prediction")
        .ok_or_else(|| RecognizerError::InvalidResponse {
            recognizer: "luis".into(),
            reason: "missing `prediction` object".into(),
        })?;

    let mut result = RecognizerResult::empty(text);

    if let Some(intents) = prediction.get("intents").and_then(|v| v.as_object()) {
        for (label, detail) in intents {
            let Some(intent) = Intent::from_label(label) else {
                tracing::debug!(label = %label, "Ignoring unknown LUIS intent");
                continue;
            };
            let score = detail.get("score").and_then(|s| s.as_f64()).unwrap_or(0.0);
            result.intents.push(IntentScore { intent, score });
        }
    }

    if let Some(entities) = prediction.get("entities").and_then(|v| v.as_object()) {
        for (name, value) in entities {
            if name.starts_with('$') {
                continue;
            }
            let mut values = Vec::new();
            collect_strings(value, &mut values);
            if !values.is_empty() {
                result.entities.insert(name.clone(), values);
            }
        }
    }

    Ok(result)
}

/// Flatten an entity value into its string leaves.
///
/// List entities arrive as `[["canonical"]]`, simple entities as
/// `["text"]`; objects are read through their `text` field if present.
fn collect_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => {
            for item in items {
                collect_strings(item, out);
            }
        }
        Value::Object(obj) => {
            if let Some(Value::String(s)) = obj.get("text") {
                out.push(s.clone());
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::entities;

    fn sample_body() -> Value {
        serde_json::json!({
            "query": "my name is jane and I live in wexford",
            "prediction": {
                "topIntent": "discussPersonal",
                "intents": {
                    "discussPersonal": { "score": 0.82 },
                    "discussLocation": { "score": 0.82 },
                    "None": { "score": 0.03 },
                    "somethingNew": { "score": 0.99 }
                },
                "entities": {
                    "name": ["jane"],
                    "location": ["wexford"],
                    "party_name": [["sinn fein"]],
                    "$instance": { "name": [{ "startIndex": 11 }] }
                }
            }
        })
    }

    #[test]
    fn parses_intents_in_order_and_skips_unknown() {
        let result = parse_prediction("q", &sample_body()).unwrap();
        let labels: Vec<Intent> = result.intents.iter().map(|i| i.intent).collect();
        assert_eq!(
            labels,
            vec![Intent::DiscussPersonal, Intent::DiscussLocation, Intent::None]
        );
        assert_eq!(result.top_intent(), (Intent::DiscussPersonal, 0.82));
    }

    #[test]
    fn parses_entities_and_flattens_lists() {
        let result = parse_prediction("q", &sample_body()).unwrap();
        assert_eq!(result.entity(entities::NAME).unwrap(), ["jane"]);
        assert_eq!(result.entity(entities::LOCATION).unwrap(), ["wexford"]);
        assert_eq!(result.entity(entities::PARTY).unwrap(), ["sinn fein"]);
        assert!(!result.entities.contains_key("$instance"));
    }

    #[test]
    fn missing_prediction_is_an_error() {
        let err = parse_prediction("q", &serde_json::json!({"query": "q"})).unwrap_err();
        assert!(err.to_string().contains("prediction"));
    }

    #[test]
    fn prediction_url_trims_trailing_slash() {
        let rec = LuisRecognizer::new(LuisConfig {
            endpoint: "https://example.cognitive.microsoft.com/".into(),
            app_id: "app-1".into(),
            api_key: SecretString::from("key"),
            slot: "production".into(),
        });
        assert_eq!(
            rec.prediction_url(),
            "https://example.cognitive.microsoft.com/luis/prediction/v3.0/apps/app-1/slots/production/predict"
        );
    }

    // ── Network error test (expected to fail with no server) ────────

    #[tokio::test]
    async fn unreachable_endpoint_returns_request_error() {
        let rec = LuisRecognizer::new(LuisConfig {
            endpoint: "http://127.0.0.1:9".into(),
            app_id: "app".into(),
            api_key: SecretString::from("key"),
            slot: "production".into(),
        });
        let err = rec.recognize("wake bot").await.unwrap_err();
        assert!(matches!(err, RecognizerError::RequestFailed { .. }));
    }
}
