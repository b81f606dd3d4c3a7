use std::pin::Pin;
use std::task::Context;
use std::task::Poll;
use std::task::ready;

use futures::FutureExt;
use futures::Stream;
use futures::StreamExt;
use futures::TryStreamExt;
use futures::stream::FusedStream;
use tracing::trace;

use crate::HtmlResult;
use crate::Template;
use crate::Value;
use crate::template::Chunk;
use crate::template::Cursor;
use crate::template::Slot;
use crate::template::Step;
use crate::value::Coerced;
use crate::value::Nested;
use crate::value::PendingValue;
use crate::value::ValueIter;
use crate::value::ValueStream;

/// A single-use stream over the rendered chunks of a [`Template`], able to
/// await futures and consume asynchronous sequences.
///
/// Chunk boundaries match [`Chunks`](crate::Chunks). A pull suspends only
/// while it waits on a [`Value::Pending`] (at an interpolation site or as a
/// sequence element) or on the next step of a [`Value::AsyncSequence`].
/// Values are resolved strictly one after another in source order; sibling
/// futures are never polled concurrently, and a future is not polled at all
/// until every chunk before it has been pulled.
///
/// No timeout is applied. A future that never resolves keeps the stream
/// pending forever. A failed future or stream step is yielded as an error,
/// after which the stream is finished.
pub struct AsyncChunks<'a> {
	frames: Vec<Frame<'a>>,
	pending: Option<Awaiting<'a>>,
}

enum Frame<'a> {
	Template(Cursor<'a>),
	Sequence { items: ValueIter<'a>, escapes: usize },
	Stream { items: ValueStream<'a>, escapes: usize },
}

/// A future being awaited and the place its value goes once resolved.
struct Awaiting<'a> {
	future: PendingValue<'a>,
	slot: Slot<'a>,
}

impl<'a> AsyncChunks<'a> {
	pub(crate) fn new(template: Template<'a>) -> Self {
		trace!(
			expressions = template.expressions().len(),
			"rendering template lazily and asynchronously"
		);

		Self {
			frames: vec![Frame::Template(template.into_cursor(0))],
			pending: None,
		}
	}

	/// Pull every remaining chunk and join them into one string.
	pub async fn collect_string(self) -> HtmlResult<String> {
		self.try_collect().await
	}

	fn poll_advance(&mut self, cx: &mut Context<'_>) -> Poll<HtmlResult<Option<Chunk<'a>>>> {
		loop {
			if let Some(awaiting) = self.pending.as_mut() {
				let resolved = ready!(awaiting.future.poll_unpin(cx));
				let slot = awaiting.slot;
				self.pending = None;

				if let Some(chunk) = self.place(resolved?, slot)? {
					return Poll::Ready(Ok(Some(chunk)));
				}
				continue;
			}

			let Some(frame) = self.frames.last_mut() else {
				return Poll::Ready(Ok(None));
			};

			let (slot, value) = match frame {
				Frame::Template(cursor) => {
					match cursor.next_step() {
						Some(Step::Value(slot, value)) => (slot, value),
						Some(Step::Trailing(chunk)) => {
							self.frames.pop();
							match chunk {
								Some(chunk) => return Poll::Ready(Ok(Some(chunk))),
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
				Frame::Stream { items, escapes } => {
					let escapes = *escapes;
					let Some(value) = ready!(items.poll_next_unpin(cx)) else {
						self.frames.pop();
						continue;
					};
					(Slot::Leaf { escapes }, value?)
				}
			};

			if let Some(chunk) = self.place(value, slot)? {
				return Poll::Ready(Ok(Some(chunk)));
			}
		}
	}

	/// Put a value into its slot: emit its chunk, expand it, or start
	/// awaiting it.
	fn place(&mut self, value: Value<'a>, slot: Slot<'a>) -> HtmlResult<Option<Chunk<'a>>> {
		let chunk = match value.coerce()? {
			Coerced::Empty => slot.opening(),
			Coerced::Text(text) => slot.text(text),
			Coerced::Nested(nested) => {
				self.push(nested, slot.escapes());
				slot.opening()
			}
			Coerced::Pending(future) => {
				trace!("awaiting pending value");
				self.pending = Some(Awaiting { future, slot });
				None
			}
		};

		Ok(chunk)
	}

	fn push(&mut self, nested: Nested<'a>, escapes: usize) {
		let frame = match nested {
			Nested::Template(template) => Frame::Template(template.into_cursor(escapes)),
			Nested::Sequence(items) => Frame::Sequence { items, escapes },
			Nested::AsyncSequence(items) => Frame::Stream { items, escapes },
		};

		trace!(depth = self.frames.len(), escapes, "expanding nested value");
		self.frames.push(frame);
	}
}

impl<'a> Stream for AsyncChunks<'a> {
	type Item = HtmlResult<Chunk<'a>>;

	fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		let this = self.get_mut();

		match ready!(this.poll_advance(cx)) {
			Ok(chunk) => Poll::Ready(chunk.map(Ok)),
			Err(error) => {
				this.frames.clear();
				this.pending = None;
				Poll::Ready(Some(Err(error)))
			}
		}
	}
}

impl FusedStream for AsyncChunks<'_> {
	fn is_terminated(&self) -> bool {
		self.frames.is_empty() && self.pending.is_none()
	}
}
