use thiserror::Error;

/// Errors surfaced by the assignment pipeline and its collaborators.
///
/// Per-token resolution failures never appear here: an owner token that
/// cannot be resolved is logged and dropped from the candidate set.
#[derive(Debug, Error)]
pub enum Error {
    /// Repository access failed: the repository cannot be opened or the
    /// commit history cannot be walked.
    #[error("repository access failed: {0}")]
    Repo(#[from] git2::Error),

    /// The review system failed a call.
    #[error("review api call failed: {0}")]
    Api(String),

    /// The directory service failed a call.
    #[error("directory lookup failed: {0}")]
    Directory(String),
}
