/// Convenience result type used across chartkit.
pub type ChartkitResult<T> = Result<T, ChartkitError>;

/// Top-level error taxonomy used by registry and pipeline APIs.
///
/// Missing template variables and patch operations that cannot be applied are reported as data
/// ([`crate::ValidationResult`], [`crate::ApplyFailure`]) and never surface through this type.
#[derive(thiserror::Error, Debug)]
pub enum ChartkitError {
    /// A template, partial or theme was rejected at registration time.
    #[error("registration error: {0}")]
    Registration(String),

    /// A theme failed validation; every violated path is listed.
    #[error("invalid theme '{id}': {}", .violations.join("; "))]
    InvalidTheme {
        /// Id the theme was registered under.
        id: String,
        /// One entry per violated path, formatted as `path: reason`.
        violations: Vec<String>,
    },

    /// Template markup could not be parsed.
    #[error("template error: {0}")]
    Template(String),

    /// An unregistered template or theme id was referenced.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid caller-provided input (malformed paths, options, ...).
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ChartkitError {
    /// Build a [`ChartkitError::Registration`] value.
    pub fn registration(msg: impl Into<String>) -> Self {
        Self::Registration(msg.into())
    }

    /// Build a [`ChartkitError::Template`] value.
    pub fn template(msg: impl Into<String>) -> Self {
        Self::Template(msg.into())
    }

    /// Build a [`ChartkitError::NotFound`] value.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Build a [`ChartkitError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ChartkitError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
