use thiserror::Error;

/// A required shared library that cannot be used.
#[derive(Debug, Error)]
pub enum DependencyError {
    #[error("{name}: {reason}")]
    Unloadable { name: String, reason: String },

    #[error("no {prefix}* in {searched} directories")]
    NotFound { prefix: String, searched: usize },
}

impl From<DependencyError> for crate::CheckOutcome {
    fn from(err: DependencyError) -> Self {
        crate::CheckOutcome::fail(err.to_string())
    }
}
