//! Error types for the GitHub provider.

/// Errors that can occur while fetching from the GitHub REST API.
#[derive(Debug, thiserror::Error)]
pub enum GithubError {
    /// The request could not be sent or timed out.
    #[error("GitHub request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// GitHub answered with a non-success status.
    #[error("GitHub API error {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Start of the response body.
        body: String,
    },

    /// The token contains characters that cannot appear in a header.
    #[error("GitHub token is not a valid header value")]
    InvalidToken,

    /// The response body did not match the expected schema.
    #[error("GitHub response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}
