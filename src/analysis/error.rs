use thiserror::Error;

pub const UNKNOWN_ERROR_DETAILS: &str = "未知错误";

/// Failures surfaced to an analysis caller. Client errors are detected before
/// any provider call; `Provider` covers everything after validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("请求格式错误")]
    MalformedRequest { details: String },

    #[error("缺少图片数据")]
    MissingField { field: &'static str },

    #[error("提供的图片数据不是有效的URL")]
    InvalidImageReference { value: String },

    #[error("处理请求时出错")]
    Provider { details: String },
}

impl AnalysisError {
    pub fn malformed(details: impl Into<String>) -> Self {
        Self::MalformedRequest {
            details: details.into(),
        }
    }

    pub fn provider(details: impl Into<String>) -> Self {
        let details = details.into();
        let details = if details.trim().is_empty() {
            UNKNOWN_ERROR_DETAILS.to_string()
        } else {
            details
        };
        Self::Provider { details }
    }

    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Provider { .. })
    }

    /// Extra context attached to the error body, when there is any.
    pub fn details(&self) -> Option<&str> {
        match self {
            Self::MalformedRequest { details } | Self::Provider { details } => Some(details),
            Self::MissingField { .. } | Self::InvalidImageReference { .. } => None,
        }
    }
}

impl From<crate::Error> for AnalysisError {
    fn from(err: crate::Error) -> Self {
        Self::provider(err.message())
    }
}
