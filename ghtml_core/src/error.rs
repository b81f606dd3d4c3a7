use miette::Diagnostic;
use thiserror::Error;

/// Boxed error accepted from caller-supplied conversions and upstream values.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum HtmlError {
	#[error(transparent)]
	#[diagnostic(code(ghtml::io_error))]
	Io(#[from] std::io::Error),

	#[error("failed to convert interpolated value to text: {0}")]
	#[diagnostic(code(ghtml::coercion))]
	Coercion(#[source] BoxError),

	#[error("upstream value failed: {0}")]
	#[diagnostic(code(ghtml::upstream))]
	Upstream(#[source] BoxError),

	#[error("cannot render {kind} synchronously")]
	#[diagnostic(
		code(ghtml::async_value),
		help("use `render_lazy_async` to render templates containing futures or streams")
	)]
	AsyncValue { kind: &'static str },

	#[error("template has {segments} segment(s) for {expressions} expression(s)")]
	#[diagnostic(
		code(ghtml::segment_mismatch),
		help("a template needs exactly one more segment than expressions")
	)]
	SegmentMismatch { segments: usize, expressions: usize },

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(ghtml::config_parse),
		help("check that ghtml.toml is valid TOML with an [assets] section")
	)]
	ConfigParse(String),

	#[error("invalid skip pattern `{pattern}`: {reason}")]
	#[diagnostic(code(ghtml::invalid_pattern))]
	InvalidPattern { pattern: String, reason: String },

	#[error("failed to walk `{path}`: {reason}")]
	#[diagnostic(code(ghtml::walk))]
	Walk { path: String, reason: String },
}

impl HtmlError {
	/// Wrap any error raised by a caller-supplied text conversion.
	pub fn coercion(error: impl Into<BoxError>) -> Self {
		Self::Coercion(error.into())
	}

	/// Wrap any error raised by a future or stream the caller interpolated.
	pub fn upstream(error: impl Into<BoxError>) -> Self {
		Self::Upstream(error.into())
	}
}

pub type HtmlResult<T> = Result<T, HtmlError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
