use std::iter::FusedIterator;

use tracing::trace;

use crate::HtmlError;
use crate::HtmlResult;
use crate::Template;
use crate::template::Chunk;
use crate::template::Cursor;
use crate::template::Slot;
use crate::template::Step;
use crate::value::Coerced;
use crate::value::Nested;
use crate::value::ValueIter;

/// A single-use, forward-only iterator over the rendered chunks of a
/// [`Template`].
///
/// Nothing is evaluated until the first pull, and each pull evaluates only as
/// much of the template as the next chunk needs. Dropping the iterator early
/// leaves the rest of the template unevaluated. Sequences the caller
/// interpolated are dropped with it, but the renderer never closes any
/// resource they hold.
///
/// Concatenating every chunk gives exactly [`Template::render`]. The chunk
/// boundaries are:
///
/// - a text value at an interpolation site shares a chunk with the segment
///   before it;
/// - a sequence yields the segment before it on its own, then one chunk per
///   non-empty leaf;
/// - empty chunks are never yielded.
///
/// After an error the iterator is finished.
pub struct Chunks<'a> {
	frames: Vec<Frame<'a>>,
}

enum Frame<'a> {
	Template(Cursor<'a>),
	Sequence { items: ValueIter<'a>, escapes: usize },
}

impl<'a> Chunks<'a> {
	pub(crate) fn new(template: Template<'a>) -> Self {
		trace!(
			expressions = template.expressions().len(),
			"rendering template lazily"
		);

		Self {
			frames: vec![Frame::Template(template.into_cursor(0))],
		}
	}

	/// Pull every remaining chunk and join them into one string.
	pub fn collect_string(self) -> HtmlResult<String> {
		self.collect()
	}

	fn advance(&mut self) -> HtmlResult<Option<Chunk<'a>>> {
		loop {
			let Some(frame) = self.frames.last_mut() else {
				return Ok(None);
			};

			let (slot, value) = match frame {
				Frame::Template(cursor) => {
					match cursor.next_step() {
						Some(Step::Value(slot, value)) => (slot, value),
						Some(Step::Trailing(chunk)) => {
							self.frames.pop();
							match chunk {
								Some(chunk) => return Ok(Some(chunk)),
								None => continue,
							}
						}
						None => {
							self.frames.pop();
							continue;
						}
					}
				}
				Frame::Sequence { items, escapes } => {
					let escapes = *escapes;
					let Some(value) = items.next() else {
						self.frames.pop();
						continue;
					};
					(Slot::Leaf { escapes }, value)
				}
			};

			let chunk = match value.coerce()? {
				Coerced::Empty => slot.opening(),
				Coerced::Text(text) => slot.text(text),
				Coerced::Nested(nested) => {
					self.push(nested, slot.escapes())?;
					slot.opening()
				}
				Coerced::Pending(_) => {
					return Err(HtmlError::AsyncValue {
						kind: "a pending value",
					});
				}
			};

			if let Some(chunk) = chunk {
				return Ok(Some(chunk));
			}
		}
	}

	fn push(&mut self, nested: Nested<'a>, escapes: usize) -> HtmlResult<()> {
		let frame = match nested {
			Nested::Template(template) => Frame::Template(template.into_cursor(escapes)),
			Nested::Sequence(items) => Frame::Sequence { items, escapes },
			Nested::AsyncSequence(_) => {
				return Err(HtmlError::AsyncValue {
					kind: "an asynchronous sequence",
				});
			}
		};

		trace!(depth = self.frames.len(), escapes, "expanding nested value");
		self.frames.push(frame);

		Ok(())
	}
}

impl<'a> Iterator for Chunks<'a> {
	type Item = HtmlResult<Chunk<'a>>;

	fn next(&mut self) -> Option<Self::Item> {
		match self.advance() {
			Ok(chunk) => chunk.map(Ok),
			Err(error) => {
				self.frames.clear();
				Some(Err(error))
			}
		}
	}
}

impl FusedIterator for Chunks<'_> {}
