use std::borrow::Cow;

/// The named entity for each byte that must never reach HTML unescaped.
const fn entity(byte: u8) -> Option<&'static str> {
	match byte {
		b'"' => Some("&quot;"),
		b'&' => Some("&amp;"),
		b'\'' => Some("&apos;"),
		b'<' => Some("&lt;"),
		b'>' => Some("&gt;"),
		_ => None,
	}
}

/// Escape the HTML-significant characters `"`, `'`, `&`, `<` and `>` with
/// their named entities.
///
/// The input is scanned once from left to right and inserted entities are
/// never rescanned. Text without any of these characters is returned
/// borrowed, without allocating.
///
/// ```rust
/// use ghtml_core::escape;
///
/// assert_eq!(escape("<a href='/'>"), "&lt;a href=&apos;/&apos;&gt;");
/// assert_eq!(escape("plain"), "plain");
/// ```
pub fn escape(input: &str) -> Cow<'_, str> {
	let bytes = input.as_bytes();
	let Some(first) = bytes.iter().position(|byte| entity(*byte).is_some()) else {
		return Cow::Borrowed(input);
	};

	let mut escaped = String::with_capacity(input.len() + input.len() / 4 + 8);
	let mut start = 0;

	// Every matched byte is ASCII, so `index` always sits on a char boundary.
	for (index, byte) in bytes.iter().enumerate().skip(first) {
		if let Some(entity) = entity(*byte) {
			escaped.push_str(&input[start..index]);
			escaped.push_str(entity);
			start = index + 1;
		}
	}

	escaped.push_str(&input[start..]);
	Cow::Owned(escaped)
}

/// Apply [`escape`] `times` times. Text produced by a nested template is
/// escaped once for every non-raw interpolation site it passes through.
pub(crate) fn escape_times(text: Cow<'_, str>, times: usize) -> Cow<'_, str> {
	let mut text = text;

	for _ in 0..times {
		let escaped = match escape(&text) {
			Cow::Owned(escaped) => escaped,
			Cow::Borrowed(_) => break,
		};
		text = Cow::Owned(escaped);
	}

	text
}
