use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::oracle::Oracle;

/// What the user is asking for. Exactly one variant per request; the
/// dispatcher matches exhaustively on this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestClassification {
    Greeting {
        message: String,
    },
    /// Fields are independently optional: absent means the user did not
    /// mention one, never an empty string.
    WeatherSearch {
        date: Option<String>,
        location: Option<String>,
    },
    Other,
}

impl RequestClassification {
    /// Short tag for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            RequestClassification::Greeting { .. } => "greeting",
            RequestClassification::WeatherSearch { .. } => "weather",
            RequestClassification::Other => "other",
        }
    }
}

const CLASSIFICATION_RULES: &str = r#"You are an assistant that classifies input.
Analyze the user input below and return the result in JSON format.

Classification Rules:
1. For greetings (Hello, Hi, Good morning, こんにちは, Guten Tag, etc.), use type: "GREETING"
2. For weather-related questions, use type: "WEATHER"
   - Weather questions require date and location
   - If a date is included, set date: "date value"
   - If a location is included, set location: "location name"
   - If not included, set them to null
3. For everything else, use type: "OTHER"

Return only JSON. Do not include any other text.

Examples:
Input: "Guten Tag"
Output: {"type": "GREETING", "date": null, "location": null}

Input: "今日の天気は何ですか"
Output: {"type": "WEATHER", "date": "今日", "location": null}

Input: "今日の大阪の天気は何ですか"
Output: {"type": "WEATHER", "date": "今日", "location": "大阪"}

Input: "晩御飯の献立を教えて"
Output: {"type": "OTHER", "date": null, "location": null}"#;

/// LLM-backed request classifier.
///
/// Classification rides on a stochastic oracle, so this never fails
/// outward: malformed output, unexpected tags and oracle errors all
/// degrade to `Other`.
pub struct RequestClassifier {
    oracle: Arc<dyn Oracle>,
}

impl RequestClassifier {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self { oracle }
    }

    pub async fn classify(&self, request: &str) -> RequestClassification {
        let prompt = format!("{}\n\nUser Input: \"{}\"", CLASSIFICATION_RULES, request);

        let raw = match self.oracle.complete(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!(error = %e, "Classification call failed, treating as OTHER");
                return RequestClassification::Other;
            }
        };

        parse_classification(request, &raw)
    }
}

#[derive(Debug, Deserialize)]
struct ClassifierOutput {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    location: Option<String>,
}

fn parse_classification(request: &str, raw: &str) -> RequestClassification {
    let json_str = strip_code_fences(raw);

    let output: ClassifierOutput = match serde_json::from_str(json_str) {
        Ok(output) => output,
        Err(e) => {
            debug!(error = %e, raw = %raw, "Classifier output did not decode, treating as OTHER");
            return RequestClassification::Other;
        }
    };

    match output.kind.as_str() {
        "GREETING" => RequestClassification::Greeting {
            message: request.to_string(),
        },
        "WEATHER" => RequestClassification::WeatherSearch {
            date: output.date,
            location: output.location,
        },
        // Including "OTHER"
        _ => RequestClassification::Other,
    }
}

/// Drop surrounding triple-backtick fences, with or without a language tag.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix("```json").unwrap_or(trimmed);
    let trimmed = trimmed.strip_prefix("```").unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix("```").unwrap_or(trimmed);
    trimmed.trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::ScriptedOracle;

    async fn classify_with(response: &str, request: &str) -> RequestClassification {
        let oracle = Arc::new(ScriptedOracle::replying(&[response]));
        RequestClassifier::new(oracle).classify(request).await
    }

    #[tokio::test]
    async fn test_greeting_keeps_original_utterance() {
        let result = classify_with(
            r#"{"type": "GREETING", "date": null, "location": null}"#,
            "Guten Tag",
        )
        .await;
        assert_eq!(
            result,
            RequestClassification::Greeting {
                message: "Guten Tag".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_weather_with_missing_location() {
        let result = classify_with(
            r#"{"type": "WEATHER", "date": "今日", "location": null}"#,
            "今日の天気は何ですか",
        )
        .await;
        assert_eq!(
            result,
            RequestClassification::WeatherSearch {
                date: Some("今日".to_string()),
                location: None,
            }
        );
    }

    #[tokio::test]
    async fn test_weather_with_both_fields() {
        let result = classify_with(
            r#"{"type": "WEATHER", "date": "今日", "location": "大阪"}"#,
            "今日の大阪の天気は何ですか",
        )
        .await;
        assert_eq!(
            result,
            RequestClassification::WeatherSearch {
                date: Some("今日".to_string()),
                location: Some("大阪".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_weather_with_omitted_fields() {
        // Absent keys decode the same as explicit nulls
        let result = classify_with(r#"{"type": "WEATHER"}"#, "天気は").await;
        assert_eq!(
            result,
            RequestClassification::WeatherSearch {
                date: None,
                location: None,
            }
        );
    }

    #[tokio::test]
    async fn test_other_tag() {
        let result = classify_with(
            r#"{"type": "OTHER", "date": null, "location": null}"#,
            "晩御飯の献立を教えてください",
        )
        .await;
        assert_eq!(result, RequestClassification::Other);
    }

    #[tokio::test]
    async fn test_unexpected_tag_degrades_to_other() {
        let result = classify_with(r#"{"type": "WEATHER_FORECAST"}"#, "天気").await;
        assert_eq!(result, RequestClassification::Other);
    }

    #[tokio::test]
    async fn test_fenced_output_with_language_tag() {
        let result = classify_with(
            "```json\n{\"type\": \"GREETING\", \"date\": null, \"location\": null}\n```",
            "こんにちは",
        )
        .await;
        assert!(matches!(result, RequestClassification::Greeting { .. }));
    }

    #[tokio::test]
    async fn test_fenced_output_without_language_tag() {
        let result = classify_with(
            "```\n{\"type\": \"WEATHER\", \"date\": \"明日\", \"location\": \"東京\"}\n```",
            "明日の東京の天気を教えて",
        )
        .await;
        assert_eq!(
            result,
            RequestClassification::WeatherSearch {
                date: Some("明日".to_string()),
                location: Some("東京".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_malformed_output_degrades_to_other() {
        for broken in [
            "not json at all",
            "{\"type\": ",
            "[1, 2, 3]",
            "{\"date\": \"今日\"}", // missing type
            "",
        ] {
            let result = classify_with(broken, "今日の大阪の天気は何ですか").await;
            assert_eq!(result, RequestClassification::Other, "input: {:?}", broken);
        }
    }

    #[tokio::test]
    async fn test_oracle_error_degrades_to_other() {
        let oracle = Arc::new(ScriptedOracle::failing("provider down"));
        let result = RequestClassifier::new(oracle).classify("こんにちは").await;
        assert_eq!(result, RequestClassification::Other);
    }

    #[tokio::test]
    async fn test_degrade_is_deterministic() {
        // Same broken oracle output, same request → same Other, every time
        for _ in 0..3 {
            let result = classify_with("garbage", "some input").await;
            assert_eq!(result, RequestClassification::Other);
        }
    }

    #[tokio::test]
    async fn test_empty_input_still_goes_through_classification() {
        let oracle = Arc::new(ScriptedOracle::replying(&["nonsense"]));
        let classifier = RequestClassifier::new(oracle.clone());
        let result = classifier.classify("   ").await;
        assert_eq!(result, RequestClassification::Other);
        // The oracle was consulted; no special-casing of blank input
        assert_eq!(oracle.prompts().len(), 1);
        assert!(oracle.prompts()[0].contains("User Input: \"   \""));
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  ```json\n{}\n```  "), "{}");
    }
}
