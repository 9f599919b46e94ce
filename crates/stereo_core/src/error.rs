use thiserror::Error;

/// Failure reported by an external provider for a single query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The queried capability does not exist on this device or target.
    #[error("capability not supported")]
    Unsupported,
    /// A handle or parameter passed to the provider is not valid.
    #[error("invalid reference: {0}")]
    InvalidReference(String),
    /// The query failed for this frame only.
    #[error("query failed: {0}")]
    Failed(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid reference while {context}: {reason}")]
    InvalidReference { context: String, reason: String },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// Maps a provider result onto "feature absent" semantics.
///
/// `Unsupported` and `Failed` become `Ok(None)` so the per-tick update keeps
/// going; only `InvalidReference` is surfaced to the caller.
pub(crate) fn degrade<T>(
    result: std::result::Result<T, ProviderError>,
    context: impl FnOnce() -> String,
) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ProviderError::InvalidReference(reason)) => {
            let context = context();
            tracing::warn!(context = %context, reason = %reason, "Provider rejected a reference");
            Err(CoreError::InvalidReference { context, reason })
        }
        Err(err) => {
            tracing::trace!(context = %context(), error = %err, "Provider query degraded");
            Ok(None)
        }
    }
}
