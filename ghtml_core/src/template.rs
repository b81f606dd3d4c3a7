use std::borrow::Cow;
use std::fmt;
use std::vec;

use tracing::trace;

use crate::AsyncChunks;
use crate::Chunks;
use crate::HtmlError;
use crate::HtmlResult;
use crate::Value;
use crate::escape;
use crate::escape::escape_times;

/// The suffix on a segment that makes the following expression render raw.
pub const RAW_MARKER: char = '!';

/// One unit of text produced by a lazy renderer.
pub type Chunk<'a> = Cow<'a, str>;

/// A template invocation: the literal segments written at the call site and
/// the values interpolated between them.
///
/// There is always exactly one more segment than there are expressions.
/// Build templates with the [`html!`](crate::html) macro, which enforces this
/// at compile time, or with the checked [`Template::new`].
pub struct Template<'a> {
	segments: Vec<&'a str>,
	expressions: Vec<Value<'a>>,
}

impl<'a> Template<'a> {
	/// Create a template, failing when `segments` is not exactly one longer
	/// than `expressions`.
	pub fn new(segments: Vec<&'a str>, expressions: Vec<Value<'a>>) -> HtmlResult<Self> {
		if segments.len() != expressions.len() + 1 {
			return Err(HtmlError::SegmentMismatch {
				segments: segments.len(),
				expressions: expressions.len(),
			});
		}

		Ok(Self {
			segments,
			expressions,
		})
	}

	/// Used by the [`html!`](crate::html) macro, whose grammar already
	/// guarantees the segment count.
	///
	/// # Panics
	///
	/// When `segments` is not exactly one longer than `expressions`.
	#[doc(hidden)]
	pub fn from_parts(segments: Vec<&'a str>, expressions: Vec<Value<'a>>) -> Self {
		assert_eq!(
			segments.len(),
			expressions.len() + 1,
			"a template needs exactly one more segment than expressions"
		);
		Self {
			segments,
			expressions,
		}
	}

	/// The literal segments, exactly as written.
	pub fn segments(&self) -> &[&'a str] {
		&self.segments
	}

	/// The interpolated values, in source order.
	pub fn expressions(&self) -> &[Value<'a>] {
		&self.expressions
	}

	/// Render the whole template into one string.
	///
	/// Each expression is escaped unless the segment before it ends with
	/// [`RAW_MARKER`], in which case the marker is dropped and the value is
	/// inserted verbatim. Sequences are joined without a separator and nested
	/// templates are rendered first, then treated as text.
	///
	/// Fails with [`HtmlError::AsyncValue`] when the template contains a
	/// future or an asynchronous sequence.
	pub fn render(self) -> HtmlResult<String> {
		let Self {
			segments,
			expressions,
		} = self;

		trace!(
			expressions = expressions.len(),
			"rendering template eagerly"
		);

		let capacity = segments.iter().map(|segment| segment.len()).sum();
		let mut output = String::with_capacity(capacity);

		for (segment, expression) in segments.iter().zip(expressions) {
			let (literal, raw) = split_raw_marker(segment);
			let text = expression.into_text()?;
			output.push_str(literal);

			if raw {
				output.push_str(&text);
			} else {
				output.push_str(&escape(&text));
			}
		}

		if let Some(last) = segments.last() {
			output.push_str(last);
		}

		Ok(output)
	}

	/// Render lazily, one chunk per pull. See [`Chunks`].
	pub fn render_lazy(self) -> Chunks<'a> {
		Chunks::new(self)
	}

	/// Render lazily and asynchronously, awaiting futures and asynchronous
	/// sequences in source order. See [`AsyncChunks`].
	pub fn render_lazy_async(self) -> AsyncChunks<'a> {
		AsyncChunks::new(self)
	}

	/// Turn the template into a cursor whose own text passes through
	/// `escapes` levels of escaping.
	pub(crate) fn into_cursor(self, escapes: usize) -> Cursor<'a> {
		Cursor {
			segments: self.segments.into_iter(),
			expressions: self.expressions.into_iter(),
			escapes,
		}
	}
}

impl fmt::Debug for Template<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Template")
			.field("segments", &self.segments)
			.field("expressions", &self.expressions)
			.finish()
	}
}

/// Render a template into one string. See [`Template::render`].
pub fn render(template: Template<'_>) -> HtmlResult<String> {
	template.render()
}

/// Render a template lazily. See [`Template::render_lazy`].
pub fn render_lazy(template: Template<'_>) -> Chunks<'_> {
	template.render_lazy()
}

/// Render a template lazily and asynchronously. See
/// [`Template::render_lazy_async`].
pub fn render_lazy_async(template: Template<'_>) -> AsyncChunks<'_> {
	template.render_lazy_async()
}

/// Strip a trailing [`RAW_MARKER`], reporting whether it was present.
pub(crate) fn split_raw_marker(segment: &str) -> (&str, bool) {
	match segment.strip_suffix(RAW_MARKER) {
		Some(literal) => (literal, true),
		None => (segment, false),
	}
}

/// The position of a lazy renderer inside one template.
pub(crate) struct Cursor<'a> {
	segments: vec::IntoIter<&'a str>,
	expressions: vec::IntoIter<Value<'a>>,
	escapes: usize,
}

impl<'a> Cursor<'a> {
	/// Move to the next interpolation site, or to the trailing segment once
	/// every expression has been handed out.
	pub(crate) fn next_step(&mut self) -> Option<Step<'a>> {
		let segment = self.segments.next()?;

		let Some(value) = self.expressions.next() else {
			return Some(Step::Trailing(chunk(segment, self.escapes)));
		};

		let (literal, raw) = split_raw_marker(segment);
		let slot = Slot::Expression {
			literal,
			literal_escapes: self.escapes,
			escapes: self.escapes + usize::from(!raw),
		};

		Some(Step::Value(slot, value))
	}
}

pub(crate) enum Step<'a> {
	Value(Slot<'a>, Value<'a>),
	Trailing(Option<Chunk<'a>>),
}

/// Where a value lands once it is resolved: at a template's interpolation
/// site, after its literal segment, or inside a sequence.
#[derive(Clone, Copy)]
pub(crate) enum Slot<'a> {
	Expression {
		literal: &'a str,
		literal_escapes: usize,
		escapes: usize,
	},
	Leaf {
		escapes: usize,
	},
}

impl<'a> Slot<'a> {
	/// How many times text placed here is escaped.
	pub(crate) fn escapes(self) -> usize {
		match self {
			Slot::Expression { escapes, .. } | Slot::Leaf { escapes } => escapes,
		}
	}

	/// The chunk for a text value. At an interpolation site the segment and
	/// the text share one chunk.
	pub(crate) fn text(self, text: Cow<'a, str>) -> Option<Chunk<'a>> {
		match self {
			Slot::Expression {
				literal,
				literal_escapes,
				escapes,
			} => {
				let literal = escape_times(Cow::Borrowed(literal), literal_escapes);
				let text = escape_times(text, escapes);

				match (literal.is_empty(), text.is_empty()) {
					(true, true) => None,
					(false, true) => Some(literal),
					(true, false) => Some(text),
					(false, false) => Some(Cow::Owned(literal.into_owned() + &text)),
				}
			}
			Slot::Leaf { escapes } => {
				if text.is_empty() {
					None
				} else {
					Some(escape_times(text, escapes))
				}
			}
		}
	}

	/// The chunk emitted before a sequence expands, or for an empty value:
	/// the segment on its own.
	pub(crate) fn opening(self) -> Option<Chunk<'a>> {
		match self {
			Slot::Expression {
				literal,
				literal_escapes,
				..
			} => chunk(literal, literal_escapes),
			Slot::Leaf { .. } => None,
		}
	}
}

fn chunk(text: &str, escapes: usize) -> Option<Chunk<'_>> {
	if text.is_empty() {
		None
	} else {
		Some(escape_times(Cow::Borrowed(text), escapes))
	}
}
