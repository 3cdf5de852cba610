//! Resume document pipeline: download, extract, analyze.

use std::fmt;

use teloxide::types::FileId;
use tracing::info;

use crate::bot::backend::{BackendClient, BackendError};
use crate::bot::resume::{self, ExtractError};
use crate::bot::telegram::TelegramClient;

pub const NO_TEXT_REPLY: &str =
    "Could not extract text from the uploaded resume. Please ensure the file contains readable text.";
pub const ANALYZE_FAILED_REPLY: &str = "Failed to analyze the resume.";
pub const PROCESSING_ERROR_REPLY: &str = "An error occurred while processing your document.";

/// Everything that can go wrong between receiving a document and relaying
/// its analysis. Each variant maps to a distinct user-facing reply.
#[derive(Debug)]
pub enum DocumentError {
    /// Failed to fetch the file from Telegram.
    Download(String),
    /// PDF parsing failed or produced no text.
    Extract(ExtractError),
    /// The analyze call did not succeed.
    Backend(BackendError),
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Download(e) => write!(f, "download failed: {e}"),
            Self::Extract(e) => write!(f, "{e}"),
            Self::Backend(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for DocumentError {}

/// Download a document and run it through extraction and analysis.
pub async fn process(
    telegram: &TelegramClient,
    backend: &BackendClient,
    file_id: FileId,
) -> Result<String, DocumentError> {
    let data = telegram
        .download_document(file_id)
        .await
        .map_err(DocumentError::Download)?;

    analyze_bytes(data, backend).await
}

/// Extract text from PDF bytes and submit it for analysis.
///
/// Extraction runs on the blocking pool; a panicking parse is contained by
/// the join and surfaces as an extraction failure.
pub async fn analyze_bytes(
    data: Vec<u8>,
    backend: &BackendClient,
) -> Result<String, DocumentError> {
    let text = tokio::task::spawn_blocking(move || resume::extract_text(&data))
        .await
        .map_err(|e| {
            DocumentError::Extract(ExtractError::Unreadable(format!("extraction task died: {e}")))
        })?
        .map_err(DocumentError::Extract)?;

    info!("Extracted {} chars of resume text", text.len());

    backend
        .analyze_resume(&text)
        .await
        .map_err(DocumentError::Backend)
}

/// The reply a user sees for a failed document. Raw error text stays in the
/// logs, never in the chat.
pub fn failure_reply(err: &DocumentError) -> &'static str {
    match err {
        DocumentError::Extract(ExtractError::NoText) => NO_TEXT_REPLY,
        DocumentError::Backend(_) => ANALYZE_FAILED_REPLY,
        DocumentError::Download(_) | DocumentError::Extract(ExtractError::Unreadable(_)) => {
            PROCESSING_ERROR_REPLY
        }
    }
}
