use thiserror::Error;

/// Errors from the credential exchange
#[derive(Debug, Error)]
pub enum AuthError {
    /// No credential pair configured and the caller supplied none
    #[error("credentials not configured")]
    MissingCredentials,

    /// Network or decode failure while exchanging credentials
    #[error("credential exchange failed: {0}")]
    Exchange(String),

    /// The platform answered, but with a non-zero application code
    #[error("credential exchange rejected (code {code}): {msg}")]
    Rejected { code: i64, msg: String },
}

/// Errors on the streaming completion path
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    /// The initial request was rejected before any stream existed
    #[error("request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The connection dropped mid-stream
    #[error("connection lost mid-stream: {0}")]
    Transport(String),
}

/// Errors writing archival records
#[derive(Debug, Error)]
pub enum SyncError {
    /// Network or decode failure on the write call
    #[error("sync request failed: {0}")]
    Request(String),

    /// The store answered with a non-zero application code
    #[error("sync rejected (code {code}): {msg}")]
    Rejected { code: i64, msg: String },

    /// A batch stopped mid-way; `synced` pairs landed before the failure
    #[error("archived {synced} of {total} pairs, then: {source}")]
    Partial {
        synced: usize,
        total: usize,
        #[source]
        source: Box<SyncError>,
    },
}

/// Errors reading archived history pages
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network failure or non-success status on the read call
    #[error("history request failed: {0}")]
    Request(String),

    /// The store answered with a non-zero application code
    #[error("history fetch rejected (code {code}): {msg}")]
    Rejected { code: i64, msg: String },

    /// The payload did not have the expected shape
    #[error("malformed history payload: {0}")]
    Malformed(String),
}

/// User-correctable problems with an archival selection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The selection contains no reconcilable question/answer pairs
    #[error("selection contains no question/answer pairs to archive")]
    NoPairs,
}
