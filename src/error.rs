//! Error types for the search client.

use thiserror::Error;

/// Errors that can occur while searching GitHub.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Every retry attempt for a request timed out.
    #[error("Timed out after {attempts} attempts: {url}")]
    TimedOut { url: String, attempts: u32 },

    /// A non-timeout transport failure. Not retried.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-OK status and an error message.
    #[error("{message} ({url})")]
    Api { message: String, url: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// The searcher was constructed without any API token.
    #[error("at least one API token is required")]
    NoTokens,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_includes_message_and_url() {
        let err = SearchError::Api {
            message: "Validation Failed".to_string(),
            url: "https://api.github.com/search/commits?q=x".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Validation Failed (https://api.github.com/search/commits?q=x)"
        );
    }

    #[test]
    fn timed_out_names_the_url() {
        let err = SearchError::TimedOut {
            url: "https://api.github.com/rate_limit".to_string(),
            attempts: 5,
        };
        assert!(err.to_string().contains("5 attempts"));
        assert!(err.to_string().contains("rate_limit"));
    }
}
