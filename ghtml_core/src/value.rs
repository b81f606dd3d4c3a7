use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::Stream;
use futures::StreamExt;
use futures::future::BoxFuture;
use futures::stream::BoxStream;

use crate::BoxError;
use crate::HtmlError;
use crate::HtmlResult;
use crate::Template;

/// The "to text" capability of an interpolated object.
///
/// Implement this for domain types that should render through their own
/// textual form. Returning an error aborts rendering; the error reaches the
/// caller as [`HtmlError::Coercion`].
pub trait ToText {
	fn to_text(&self) -> Result<String, BoxError>;
}

/// A built-in scalar with a fixed textual form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
	Bool(bool),
	Int(i128),
	UInt(u128),
	Float(f64),
}

impl fmt::Display for Scalar {
	#[allow(clippy::float_cmp)]
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Scalar::Bool(value) => write!(f, "{value}"),
			Scalar::Int(value) => write!(f, "{value}"),
			Scalar::UInt(value) => write!(f, "{value}"),
			Scalar::Float(value) if value.is_nan() => f.write_str("NaN"),
			Scalar::Float(value) if value.is_infinite() => {
				f.write_str(if value.is_sign_positive() {
					"Infinity"
				} else {
					"-Infinity"
				})
			}
			// Negative zero prints without its sign.
			Scalar::Float(value) if *value == 0.0 => f.write_str("0"),
			Scalar::Float(value) => write!(f, "{value}"),
		}
	}
}

/// A synchronous sequence of values.
pub type ValueIter<'a> = Box<dyn Iterator<Item = Value<'a>> + Send + 'a>;
/// An asynchronous sequence of values. Each step may fail.
pub type ValueStream<'a> = BoxStream<'a, HtmlResult<Value<'a>>>;
/// A value that is not available yet.
pub type PendingValue<'a> = BoxFuture<'a, HtmlResult<Value<'a>>>;

/// Anything that can be interpolated into a [`Template`].
///
/// The variant is decided once, when the value is built. Sequences may
/// contain further sequences (and templates) to any depth; every leaf they
/// produce is escaped according to the interpolation site that holds the
/// outermost sequence.
#[allow(variant_size_differences)]
pub enum Value<'a> {
	/// Renders nothing, at raw and escaped sites alike.
	Empty,
	/// Text used as is, escaped unless the site is raw.
	Text(Cow<'a, str>),
	/// Booleans and numbers.
	Scalar(Scalar),
	/// An object rendered through its [`ToText`] capability.
	Object(Box<dyn ToText + Send + 'a>),
	/// A nested template, flattened into the chunks it renders to.
	Template(Template<'a>),
	/// A synchronous sequence, flattened leaf by leaf.
	Sequence(ValueIter<'a>),
	/// An asynchronous sequence. Only the async renderer can consume it.
	AsyncSequence(ValueStream<'a>),
	/// A future resolving to another value. Only the async renderer can
	/// await it.
	Pending(PendingValue<'a>),
}

impl<'a> Value<'a> {
	/// Text used as is.
	pub fn text(text: impl Into<Cow<'a, str>>) -> Self {
		Value::Text(text.into())
	}

	/// Any object implementing [`ToText`].
	pub fn object(object: impl ToText + Send + 'a) -> Self {
		Value::Object(Box::new(object))
	}

	/// An object rendered through its author-defined [`fmt::Display`]
	/// implementation. Formatting happens at render time.
	pub fn display(value: impl fmt::Display + Send + 'a) -> Self {
		Value::Object(Box::new(Displayed(value)))
	}

	/// An object rendered through its structural [`fmt::Debug`] form.
	pub fn debug(value: impl fmt::Debug + Send + 'a) -> Self {
		Value::Object(Box::new(Debugged(value)))
	}

	/// A synchronous sequence of anything convertible into a value.
	pub fn iter<I>(items: I) -> Self
	where
		I: IntoIterator,
		I::IntoIter: Send + 'a,
		I::Item: Into<Value<'a>> + 'a,
	{
		Value::Sequence(Box::new(items.into_iter().map(Into::<Value<'a>>::into)))
	}

	/// An asynchronous sequence of anything convertible into a value.
	pub fn stream<S>(items: S) -> Self
	where
		S: Stream + Send + 'a,
		S::Item: Into<Value<'a>>,
	{
		Value::AsyncSequence(
			items
				.map(|item| -> HtmlResult<Value<'a>> { Ok(item.into()) })
				.boxed(),
		)
	}

	/// An asynchronous sequence whose steps may fail. A failed step ends the
	/// rendering with [`HtmlError::Upstream`].
	pub fn try_stream<S, T, E>(items: S) -> Self
	where
		S: Stream<Item = Result<T, E>> + Send + 'a,
		T: Into<Value<'a>>,
		E: Into<BoxError>,
	{
		Value::AsyncSequence(
			items
				.map(|item| item.map(Into::<Value<'a>>::into).map_err(HtmlError::upstream))
				.boxed(),
		)
	}

	/// A future resolving to anything convertible into a value.
	pub fn future<F>(future: F) -> Self
	where
		F: Future + Send + 'a,
		F::Output: Into<Value<'a>>,
	{
		Value::Pending(
			future
				.map(|value| -> HtmlResult<Value<'a>> { Ok(value.into()) })
				.boxed(),
		)
	}

	/// A fallible future. A failure ends the rendering with
	/// [`HtmlError::Upstream`].
	pub fn try_future<F, T, E>(future: F) -> Self
	where
		F: Future<Output = Result<T, E>> + Send + 'a,
		T: Into<Value<'a>>,
		E: Into<BoxError>,
	{
		Value::Pending(
			future
				.map(|result| result.map(Into::<Value<'a>>::into).map_err(HtmlError::upstream))
				.boxed(),
		)
	}

	/// A short description of the variant, used in diagnostics.
	pub fn kind(&self) -> &'static str {
		match self {
			Value::Empty => "empty value",
			Value::Text(_) => "text",
			Value::Scalar(_) => "scalar",
			Value::Object(_) => "object",
			Value::Template(_) => "template",
			Value::Sequence(_) => "sequence",
			Value::AsyncSequence(_) => "asynchronous sequence",
			Value::Pending(_) => "pending value",
		}
	}

	/// Resolve everything that can be resolved without suspending: scalars
	/// and objects become text, sequences and futures are handed back for the
	/// renderer to walk or await.
	pub(crate) fn coerce(self) -> HtmlResult<Coerced<'a>> {
		let coerced = match self {
			Value::Empty => Coerced::Empty,
			Value::Text(text) => Coerced::Text(text),
			Value::Scalar(scalar) => Coerced::Text(Cow::Owned(scalar.to_string())),
			Value::Object(object) => {
				Coerced::Text(Cow::Owned(object.to_text().map_err(HtmlError::Coercion)?))
			}
			Value::Template(template) => Coerced::Nested(Nested::Template(template)),
			Value::Sequence(items) => Coerced::Nested(Nested::Sequence(items)),
			Value::AsyncSequence(items) => Coerced::Nested(Nested::AsyncSequence(items)),
			Value::Pending(future) => Coerced::Pending(future),
		};

		Ok(coerced)
	}

	/// The complete unescaped text of this value. Sequences are joined
	/// without a separator and nested templates are rendered eagerly.
	pub(crate) fn into_text(self) -> HtmlResult<Cow<'a, str>> {
		match self.coerce()? {
			Coerced::Empty => Ok(Cow::Borrowed("")),
			Coerced::Text(text) => Ok(text),
			Coerced::Nested(Nested::Template(template)) => template.render().map(Cow::Owned),
			Coerced::Nested(Nested::Sequence(items)) => {
				let mut joined = String::new();
				for item in items {
					joined.push_str(&item.into_text()?);
				}
				Ok(Cow::Owned(joined))
			}
			Coerced::Nested(Nested::AsyncSequence(_)) => {
				Err(HtmlError::AsyncValue {
					kind: "an asynchronous sequence",
				})
			}
			Coerced::Pending(_) => {
				Err(HtmlError::AsyncValue {
					kind: "a pending value",
				})
			}
		}
	}
}

impl fmt::Debug for Value<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::Text(text) => f.debug_tuple("Text").field(text).finish(),
			Value::Scalar(scalar) => f.debug_tuple("Scalar").field(scalar).finish(),
			Value::Template(template) => f.debug_tuple("Template").field(template).finish(),
			other => write!(f, "Value({})", other.kind()),
		}
	}
}

/// A value after synchronous coercion.
pub(crate) enum Coerced<'a> {
	Empty,
	Text(Cow<'a, str>),
	Nested(Nested<'a>),
	Pending(PendingValue<'a>),
}

/// A value that expands into more values.
pub(crate) enum Nested<'a> {
	Template(Template<'a>),
	Sequence(ValueIter<'a>),
	AsyncSequence(ValueStream<'a>),
}

struct Displayed<T>(T);

impl<T: fmt::Display> ToText for Displayed<T> {
	fn to_text(&self) -> Result<String, BoxError> {
		Ok(self.0.to_string())
	}
}

struct Debugged<T>(T);

impl<T: fmt::Debug> ToText for Debugged<T> {
	fn to_text(&self) -> Result<String, BoxError> {
		Ok(format!("{:?}", self.0))
	}
}

impl<'a> From<&'a str> for Value<'a> {
	fn from(text: &'a str) -> Self {
		Value::Text(Cow::Borrowed(text))
	}
}

impl<'a> From<&'a String> for Value<'a> {
	fn from(text: &'a String) -> Self {
		Value::Text(Cow::Borrowed(text.as_str()))
	}
}

impl From<String> for Value<'_> {
	fn from(text: String) -> Self {
		Value::Text(Cow::Owned(text))
	}
}

impl<'a> From<Cow<'a, str>> for Value<'a> {
	fn from(text: Cow<'a, str>) -> Self {
		Value::Text(text)
	}
}

impl From<Arc<str>> for Value<'_> {
	fn from(text: Arc<str>) -> Self {
		Value::Text(Cow::Owned(text.as_ref().to_owned()))
	}
}

impl From<char> for Value<'_> {
	fn from(character: char) -> Self {
		Value::Text(Cow::Owned(character.to_string()))
	}
}

impl From<bool> for Value<'_> {
	fn from(value: bool) -> Self {
		Value::Scalar(Scalar::Bool(value))
	}
}

macro_rules! impl_from_scalar {
	($variant:ident($target:ty): $($source:ty),+) => {
		$(
			impl From<$source> for Value<'_> {
				fn from(value: $source) -> Self {
					Value::Scalar(Scalar::$variant(value as $target))
				}
			}
		)+
	};
}

impl_from_scalar!(Int(i128): i8, i16, i32, i64, i128, isize);
impl_from_scalar!(UInt(u128): u8, u16, u32, u64, u128, usize);
impl From<f64> for Value<'_> {
	fn from(value: f64) -> Self {
		Value::Scalar(Scalar::Float(value))
	}
}

impl From<f32> for Value<'_> {
	/// Keeps the shortest text form of the `f32` itself, so `0.1f32` renders
	/// as `0.1` rather than as its widened `f64` digits.
	fn from(value: f32) -> Self {
		let widened = value.to_string().parse().unwrap_or(f64::from(value));
		Value::Scalar(Scalar::Float(widened))
	}
}

impl From<Scalar> for Value<'_> {
	fn from(scalar: Scalar) -> Self {
		Value::Scalar(scalar)
	}
}

impl From<()> for Value<'_> {
	fn from((): ()) -> Self {
		Value::Empty
	}
}

impl<'a, T: Into<Value<'a>>> From<Option<T>> for Value<'a> {
	fn from(value: Option<T>) -> Self {
		value.map_or(Value::Empty, Into::into)
	}
}

impl<'a, T> From<Vec<T>> for Value<'a>
where
	T: Into<Value<'a>> + Send + 'a,
{
	fn from(items: Vec<T>) -> Self {
		Value::iter(items)
	}
}

impl<'a, T, const N: usize> From<[T; N]> for Value<'a>
where
	T: Into<Value<'a>> + Send + 'a,
{
	fn from(items: [T; N]) -> Self {
		Value::iter(items)
	}
}

impl<'a> From<Template<'a>> for Value<'a> {
	fn from(template: Template<'a>) -> Self {
		Value::Template(template)
	}
}
