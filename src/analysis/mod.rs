mod error;
mod service;
mod types;

pub use error::{AnalysisError, UNKNOWN_ERROR_DETAILS};
pub use service::{AnalysisService, AnalysisStream};
pub use types::{
    AnalysisEvent, AnalysisRequest, DEFAULT_PROMPT, SERVICE_NAME, SERVICE_VERSION, SYSTEM_PROMPT,
    ServiceStatus,
};
