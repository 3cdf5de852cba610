//! HTTP client for the JobDeal platform API.

use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Fallback when the server rejects a request without a usable error body.
pub const UNKNOWN_ERROR: &str = "Unknown error";
/// Fallback when a successful analysis response carries no analysis text.
pub const NO_ANALYSIS: &str = "No analysis returned.";

pub struct BackendClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Debug)]
pub enum BackendError {
    /// The request never reached the server (connect error, timeout).
    Unreachable(String),
    /// The server answered with a non-success status.
    Rejected { status: u16, message: String },
    /// The server answered with a success status but an unparseable body.
    BadResponse(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable(e) => write!(f, "backend unreachable: {e}"),
            Self::Rejected { status, message } => {
                write!(f, "backend rejected request ({status}): {message}")
            }
            Self::BadResponse(e) => write!(f, "bad backend response: {e}"),
        }
    }
}

impl std::error::Error for BackendError {}

#[derive(Serialize)]
struct CreateRepoRequest<'a> {
    name: &'a str,
    description: &'a str,
    private: bool,
}

#[derive(Serialize)]
struct AnalyzeResumeRequest<'a> {
    #[serde(rename = "resumeContent")]
    resume_content: &'a str,
}

#[derive(Deserialize)]
struct AnalyzeResumeResponse {
    analysis: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

impl BackendClient {
    /// Create a client for the API at `base_url`. Every request carries the
    /// given timeout; a timeout surfaces as [`BackendError::Unreachable`].
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, http })
    }

    /// Create a repository. Success iff the server answers 201.
    pub async fn create_repo(
        &self,
        name: &str,
        description: &str,
        private: bool,
    ) -> Result<(), BackendError> {
        let response = self
            .http
            .post(format!("{}/create-repo", self.base_url))
            .json(&CreateRepoRequest {
                name,
                description,
                private,
            })
            .send()
            .await
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::CREATED {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(BackendError::Rejected {
            status: status.as_u16(),
            message: rejection_message(&body),
        })
    }

    /// Analyze resume text. Success iff the server answers 200; the returned
    /// string is the `analysis` field, or [`NO_ANALYSIS`] when absent.
    pub async fn analyze_resume(&self, resume_content: &str) -> Result<String, BackendError> {
        let response = self
            .http
            .post(format!("{}/analyze-resume", self.base_url))
            .json(&AnalyzeResumeRequest { resume_content })
            .send()
            .await
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Rejected {
                status: status.as_u16(),
                message: rejection_message(&body),
            });
        }

        let body: AnalyzeResumeResponse = response
            .json()
            .await
            .map_err(|e| BackendError::BadResponse(e.to_string()))?;

        Ok(body.analysis.unwrap_or_else(|| NO_ANALYSIS.to_string()))
    }
}

/// Pull the `error` field out of a rejection body. Non-JSON bodies and
/// bodies without the field fall back to [`UNKNOWN_ERROR`].
fn rejection_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .unwrap_or_else(|| UNKNOWN_ERROR.to_string())
}
