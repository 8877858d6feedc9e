use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Payload of the terminal `finish` event.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishResponse {
    pub finish_reason: Option<String>,
}
