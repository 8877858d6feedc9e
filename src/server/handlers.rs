use super::types::{ErrorResponse, FinishResponse};
use crate::analysis::{
    AnalysisError, AnalysisEvent, AnalysisRequest, AnalysisService, ServiceStatus,
};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{
        IntoResponse, Json, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::{StreamExt, future};
use std::{convert::Infallible, sync::Arc, time::Duration};
use tracing::{error, info, warn};

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Clone)]
pub struct AppState {
    pub analysis: Arc<AnalysisService>,
}

/// `POST /api/analyze`: validates the body and streams the analysis as SSE.
pub async fn analyze(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, AnalysisError> {
    let request = AnalysisRequest::from_body(&body).inspect_err(|e| {
        warn!("Rejected analysis request: {} ({:?})", e, e);
    })?;

    let events = state.analysis.analyze(request).await?;

    info!("Streaming analysis response");

    let mut line_endings = LineEndingNormalizer::default();
    let stream = events.filter_map(move |event| {
        future::ready(to_sse_event(event, &mut line_endings).map(Ok::<_, Infallible>))
    });

    Ok(Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(KEEP_ALIVE_INTERVAL)
                .text("keep-alive"),
        )
        .into_response())
}

/// `GET /api/analyze`: static liveness descriptor.
pub async fn status(State(state): State<AppState>) -> Json<ServiceStatus> {
    Json(state.analysis.status())
}

fn to_sse_event(event: AnalysisEvent, line_endings: &mut LineEndingNormalizer) -> Option<Event> {
    let event = match event {
        AnalysisEvent::Text(fragment) => {
            let text = line_endings.normalize(&fragment);
            if text.is_empty() {
                return None;
            }
            Event::default().event("text").data(text)
        }
        AnalysisEvent::Error(err) => {
            let body = error_body(&err);
            Event::default()
                .event("error")
                .json_data(&body)
                .unwrap_or_else(|_| Event::default().event("error").data(body.error))
        }
        AnalysisEvent::Finish { finish_reason } => Event::default()
            .event("finish")
            .json_data(FinishResponse { finish_reason })
            .unwrap_or_else(|_| Event::default().event("finish").data("{}")),
    };
    Some(event)
}

/// SSE field values cannot carry carriage returns, so `\r\n` and lone `\r`
/// become `\n`. State carries over between fragments of one response, so a
/// pair split across two fragments still yields a single newline.
#[derive(Debug, Default)]
struct LineEndingNormalizer {
    after_cr: bool,
}

impl LineEndingNormalizer {
    fn normalize(&mut self, fragment: &str) -> String {
        let mut out = String::with_capacity(fragment.len());
        for c in fragment.chars() {
            let after_cr = std::mem::replace(&mut self.after_cr, c == '\r');
            match c {
                '\r' => out.push('\n'),
                '\n' if after_cr => {}
                _ => out.push(c),
            }
        }
        out
    }
}

fn error_body(err: &AnalysisError) -> ErrorResponse {
    ErrorResponse {
        error: err.to_string(),
        details: err.details().map(str::to_string),
    }
}

impl AnalysisError {
    pub fn status_code(&self) -> StatusCode {
        if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AnalysisError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Analysis request failed: {:?}", self);
        }
        (status, Json(error_body(&self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_line_endings() {
        let mut line_endings = LineEndingNormalizer::default();
        assert_eq!(line_endings.normalize("a\r\nb\rc"), "a\nb\nc");
        assert_eq!(line_endings.normalize("plain\ntext"), "plain\ntext");
        assert_eq!(line_endings.normalize("\r\r\n"), "\n\n");
    }

    #[test]
    fn test_crlf_split_across_fragments_is_one_newline() {
        let mut line_endings = LineEndingNormalizer::default();
        assert_eq!(line_endings.normalize("a\r"), "a\n");
        assert_eq!(line_endings.normalize(""), "");
        assert_eq!(line_endings.normalize("\nb"), "b");
        assert_eq!(line_endings.normalize("\n"), "\n");
    }

    #[test]
    fn test_fragment_reduced_to_nothing_is_skipped() {
        let mut line_endings = LineEndingNormalizer::default();
        assert!(to_sse_event(AnalysisEvent::Text("x\r".to_string()), &mut line_endings).is_some());
        assert!(to_sse_event(AnalysisEvent::Text("\n".to_string()), &mut line_endings).is_none());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AnalysisError::malformed("eof").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AnalysisError::MissingField { field: "imageData" }.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AnalysisError::InvalidImageReference {
                value: "x".to_string()
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AnalysisError::provider("boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_body_omits_empty_details() {
        let body = serde_json::to_value(error_body(&AnalysisError::MissingField {
            field: "imageData",
        }))
        .unwrap();
        assert_eq!(body, serde_json::json!({ "error": "缺少图片数据" }));
    }
}
