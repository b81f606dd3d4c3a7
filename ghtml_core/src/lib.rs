//! `ghtml_core` interpolates values into HTML safely. Every interpolated
//! value is escaped unless the segment before it ends with `!`, which marks
//! trusted markup, including markup produced by a nested template.
//!
//! ## Rendering Strategies
//!
//! ```text
//! html!("<p>", value, "</p>")  ->  Template
//!   -> render()             one String, no suspension
//!   -> render_lazy()        Iterator of chunks, evaluated on demand
//!   -> render_lazy_async()  Stream of chunks, awaiting futures and streams
//! ```
//!
//! All three share one escaping policy and produce the same text once the
//! chunks are concatenated.
//!
//! ## Modules
//!
//! - [`assets`]: Content hashing of static files and rewriting of the
//!   references to them.
//! - [`config`]: Configuration loading from `ghtml.toml`.
//!
//! ## Key Types
//!
//! - [`Template`]: Literal segments plus the values interpolated between
//!   them.
//! - [`Value`]: Everything that can be interpolated: text, scalars, objects
//!   with a [`ToText`] capability, nested templates, sequences, futures, and
//!   streams.
//! - [`Chunks`] / [`AsyncChunks`]: The lazy renderers.
//! - [`HtmlError`]: Every failure the engine reports.
//!
//! ## Quick Start
//!
//! ```rust
//! use ghtml_core::html;
//!
//! let name = "<script>alert(1)</script>";
//! let page = html!("<p>", name, "</p>").render().unwrap();
//! assert_eq!(page, "<p>&lt;script&gt;alert(1)&lt;/script&gt;</p>");
//!
//! let items = vec![html!("<li>", "a&b", "</li>"), html!("<li>", "c", "</li>")];
//! let list = html!("<ul>!", items, "</ul>").render().unwrap();
//! assert_eq!(list, "<ul><li>a&amp;b</li><li>c</li></ul>");
//! ```

pub use config::*;
pub use error::*;
pub use escape::escape;
pub use include::*;
pub use lazy::*;
pub use lazy_async::*;
pub use template::*;
pub use value::*;

pub mod assets;
pub mod config;
#[allow(unused_assignments)]
mod error;
mod escape;
mod include;
mod lazy;
mod lazy_async;
mod template;
mod value;


/// Build a [`Template`] from alternating string literal segments and
/// expressions. The call must start and end with a segment.
///
/// Each expression is converted with [`Value::from`]. A segment ending in `!`
/// renders the expression after it without escaping; the `!` itself is
/// dropped.
///
/// ```rust
/// use ghtml_core::html;
///
/// let bold = html!("<b>", "1 < 2", "</b>");
/// let html = html!("<p>!", bold, " and ", 3, "</p>").render().unwrap();
/// assert_eq!(html, "<p><b>1 &lt; 2</b> and 3</p>");
/// ```
#[macro_export]
macro_rules! html {
	($first:literal $(, $expression:expr, $segment:literal)* $(,)?) => {
		$crate::Template::from_parts(
			::std::vec![$first $(, $segment)*],
			::std::vec![$($crate::Value::from($expression)),*],
		)
	};
}
