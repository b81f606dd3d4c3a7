use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::LazyLock;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use tracing::debug;

use crate::HtmlResult;

static FILE_CACHE: LazyLock<FileCache> = LazyLock::new(FileCache::new);

/// Read a UTF-8 file once and serve every later call for the same path from
/// memory.
///
/// The cache lives for the whole process and is never invalidated, which
/// suits partials and inline assets that ship with the binary's working
/// directory. Failed reads are not cached.
///
/// ```rust,no_run
/// use ghtml_core::html;
/// use ghtml_core::include_file;
///
/// let styles = include_file("assets/inline.css").unwrap();
/// let page = html!("<style>!", styles, "</style>").render().unwrap();
/// ```
pub fn include_file(path: impl AsRef<Path>) -> HtmlResult<Arc<str>> {
	FILE_CACHE.get(path)
}

/// A cache of file contents keyed by path.
#[derive(Debug, Default)]
pub struct FileCache {
	files: Mutex<HashMap<PathBuf, Arc<str>>>,
}

impl FileCache {
	pub fn new() -> Self {
		Self::default()
	}

	/// The content of `path`, read from disk on the first call only.
	pub fn get(&self, path: impl AsRef<Path>) -> HtmlResult<Arc<str>> {
		let path = path.as_ref();

		if let Some(content) = self.lock().get(path) {
			debug!(path = %path.display(), "file cache hit");
			return Ok(Arc::clone(content));
		}

		debug!(path = %path.display(), "file cache miss");
		let content: Arc<str> = std::fs::read_to_string(path)?.into();

		// Concurrent readers may race here; the first inserted content wins.
		let content = self
			.lock()
			.entry(path.to_path_buf())
			.or_insert(content)
			.clone();

		Ok(content)
	}

	/// Number of cached files.
	pub fn len(&self) -> usize {
		self.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.lock().is_empty()
	}

	/// Forget every cached file.
	pub fn clear(&self) {
		self.lock().clear();
	}

	fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<str>>> {
		self.files.lock().unwrap_or_else(PoisonError::into_inner)
	}
}
