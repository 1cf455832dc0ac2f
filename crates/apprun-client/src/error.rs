use thiserror::Error;

/// Errors raised while talking to the AppRun API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The API answered with a status code of 400 or above.
    #[error(
        "Failed to {action}{} — status {status} {status_text} — URL: {url} — Response: {body}",
        target_suffix(.id)
    )]
    Status {
        action: &'static str,
        id: Option<String>,
        status: u16,
        status_text: String,
        url: String,
        body: String,
    },

    #[error("Failed to {action} — request to {url} failed: {source}")]
    Transport {
        action: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to {action} — could not decode response from {url}: {source}")]
    Decode {
        action: &'static str,
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
}

fn target_suffix(id: &Option<String>) -> String {
    match id {
        Some(id) => format!(" (id: {id})"),
        None => String::new(),
    }
}

/// Convenience result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
