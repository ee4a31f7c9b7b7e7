use thiserror::Error;

/// Result alias used throughout this crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
	/// The selector could not be parsed. Selector syntax errors are never cached.
	#[error("invalid selector {selector:?}: {reason}")]
	SelectorSyntax { selector: String, reason: String },

	/// Fatal to the call that caused it, but not to the [`Dom`](`crate::Dom`) it was made on.
	#[error(transparent)]
	Configuration(#[from] ConfigurationError),

	/// A native DOM operation was rejected by the platform.
	#[error("DOM operation failed: {0}")]
	Platform(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigurationError {
	#[error("mount target {selector:?} not found")]
	MountTargetMissing { selector: String },

	#[error("invalid route pattern {pattern:?}: {reason}")]
	InvalidRoutePattern { pattern: String, reason: &'static str },
}

impl Error {
	pub(crate) fn selector_syntax(selector: &str, reason: impl Into<String>) -> Self {
		Self::SelectorSyntax {
			selector: selector.to_owned(),
			reason: reason.into(),
		}
	}
}
