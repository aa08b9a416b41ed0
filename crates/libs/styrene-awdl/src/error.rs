use crate::link::LinkError;

/// Errors returned by [`AwdlManager`](crate::AwdlManager) operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AwdlError {
    /// The link layer refused to create a link. Passed through untouched.
    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("interface not found or already closed: {name}")]
    NotFound { name: String },

    #[error("interface already exists: {name}")]
    AlreadyExists { name: String },

    #[error("no tokio runtime available to run the link handler")]
    NoRuntime,
}

impl AwdlError {
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    pub fn already_exists(name: impl Into<String>) -> Self {
        Self::AlreadyExists { name: name.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` when the name was taken, whether the manager or the link
    /// layer noticed first.
    pub fn is_name_conflict(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. } | Self::Link(LinkError::DuplicateName { .. }))
    }
}
