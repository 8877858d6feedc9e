use super::error::AnalysisError;
use reqwest::Url;
use serde::Serialize;
use serde_json::Value;

pub const SYSTEM_PROMPT: &str = "你是一个专业的食物分析助手，擅长识别食物并提供营养信息。";
pub const DEFAULT_PROMPT: &str = "分析这张食物图片，提供详细的营养成分和健康信息。";
pub const SERVICE_NAME: &str = "FoodScan AI 分析服务";
pub const SERVICE_VERSION: &str = "1.0.0";

const IMAGE_DATA_FIELD: &str = "imageData";
const PROMPT_FIELD: &str = "prompt";

/// A validated analysis submission.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub image_url: Url,
    pub prompt: Option<String>,
}

impl AnalysisRequest {
    /// Parses and validates a raw request body.
    ///
    /// Checks run in order: the body must be a JSON object, `imageData` must be
    /// present and truthy, and it must be a string holding an absolute URL.
    /// Whether the URL points at an image is left to the model provider.
    pub fn from_body(body: &[u8]) -> Result<Self, AnalysisError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| AnalysisError::malformed(e.to_string()))?;

        let Value::Object(fields) = value else {
            return Err(AnalysisError::malformed("request body must be a JSON object"));
        };

        let image_data = fields
            .get(IMAGE_DATA_FIELD)
            .filter(|value| is_truthy(value))
            .ok_or(AnalysisError::MissingField {
                field: IMAGE_DATA_FIELD,
            })?;

        let raw = image_data
            .as_str()
            .ok_or_else(|| AnalysisError::InvalidImageReference {
                value: image_data.to_string(),
            })?;

        let image_url = Url::parse(raw).map_err(|_| AnalysisError::InvalidImageReference {
            value: raw.to_string(),
        })?;

        let prompt = fields
            .get(PROMPT_FIELD)
            .and_then(Value::as_str)
            .filter(|prompt| !prompt.is_empty())
            .map(str::to_string);

        Ok(Self { image_url, prompt })
    }

    pub fn resolved_prompt(&self) -> &str {
        self.prompt.as_deref().unwrap_or(DEFAULT_PROMPT)
    }
}

// `null`, `false`, `0` and `""` count as absent.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// One item of a relayed analysis stream. `Error` and `Finish` are terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisEvent {
    Text(String),
    Error(AnalysisError),
    Finish { finish_reason: Option<String> },
}

impl AnalysisEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Text(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceStatus {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

impl ServiceStatus {
    pub const fn online() -> Self {
        Self {
            status: "online",
            service: SERVICE_NAME,
            version: SERVICE_VERSION,
        }
    }
}
