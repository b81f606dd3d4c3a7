//! Cache busting for static assets.
//!
//! Every file under the configured roots gets a short content hash. Text
//! files under the reference directories are then searched for
//! `prefix + relative/path` and each occurrence gains (or updates) a
//! `?hash=...` query parameter, so a changed asset is fetched under a new URL.
//!
//! ```text
//! public/app.css                 -> hash 3b1f09c2d4e5a6b7
//! views/layout.html  "/app.css"  -> "/app.css?hash=3b1f09c2d4e5a6b7"
//!                    "/app.css?v=2" -> "/app.css?hash=3b1f09c2d4e5a6b7&v=2"
//! ```

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use globset::Glob;
use globset::GlobSet;
use globset::GlobSetBuilder;
use ignore::WalkBuilder;
use regex::Captures;
use regex::Regex;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use tracing::debug;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use crate::GhtmlConfig;
use crate::HtmlError;
use crate::HtmlResult;

/// Number of hex characters kept from each content digest.
pub const HASH_LENGTH: usize = 16;

/// Prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "/";

/// Skip patterns used when none are configured.
pub const DEFAULT_SKIP_PATTERNS: [&str; 1] = ["**/node_modules/**"];

const HASH_PARAM: &str = "hash=";

/// Options for [`generate_hashes_and_replace`].
#[derive(Debug, Clone)]
pub struct AssetOptions {
	/// Directories whose files are hashed.
	pub roots: Vec<PathBuf>,
	/// Directories whose text files get their asset references rewritten.
	pub refs: Vec<PathBuf>,
	/// Prepended to each hashed file's relative path when searching.
	pub prefix: String,
	/// Also process files and directories whose name starts with a dot.
	pub include_dot_files: bool,
	/// Glob patterns, relative to each scanned directory, of files to skip.
	pub skip: Vec<String>,
}

impl Default for AssetOptions {
	fn default() -> Self {
		Self {
			roots: Vec::new(),
			refs: Vec::new(),
			prefix: DEFAULT_PREFIX.to_string(),
			include_dot_files: false,
			skip: default_skip_patterns(),
		}
	}
}

impl AssetOptions {
	/// Build options from the `[assets]` section of a loaded config,
	/// resolving relative directories against `root`.
	pub fn from_config(config: Option<&GhtmlConfig>, root: &Path) -> Self {
		let Some(assets) = config.map(|config| &config.assets) else {
			return Self::default();
		};

		Self {
			roots: assets.roots.iter().map(|dir| root.join(dir)).collect(),
			refs: assets.refs.iter().map(|dir| root.join(dir)).collect(),
			prefix: assets
				.prefix
				.clone()
				.unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
			include_dot_files: assets.include_dot_files,
			skip: assets.skip.clone().unwrap_or_else(default_skip_patterns),
		}
	}
}

fn default_skip_patterns() -> Vec<String> {
	DEFAULT_SKIP_PATTERNS.iter().map(ToString::to_string).collect()
}

/// Result of a hashing run.
#[derive(Debug, Default, Serialize)]
pub struct AssetReport {
	/// Number of distinct asset paths that were hashed.
	pub hashed_files: usize,
	/// Reference files whose content was rewritten, in processing order.
	pub updated_files: Vec<PathBuf>,
}

/// Hash every file under `options.roots`, then rewrite references to them in
/// every text file under `options.refs`.
#[instrument(skip_all, fields(roots = options.roots.len(), refs = options.refs.len()))]
pub fn generate_hashes_and_replace(options: &AssetOptions) -> HtmlResult<AssetReport> {
	let skip = build_skip_set(&options.skip)?;
	let hashes = hash_roots(&options.roots, options.include_dot_files, &skip)?;

	let references = hashes
		.iter()
		.map(|(path, hash)| HashedReference::new(&options.prefix, path, hash))
		.collect::<HtmlResult<Vec<_>>>()?;

	let mut updated_files = Vec::new();

	for dir in &options.refs {
		for file in collect_files(dir, options.include_dot_files, &skip)? {
			let content = match std::fs::read_to_string(&file) {
				Ok(content) => content,
				Err(error) if error.kind() == ErrorKind::InvalidData => {
					warn!(path = %file.display(), "skipping non UTF-8 file");
					continue;
				}
				Err(error) => return Err(error.into()),
			};

			if let Some(updated) = rewrite_references(&content, &references) {
				std::fs::write(&file, updated)?;
				debug!(path = %file.display(), "rewrote asset references");
				updated_files.push(file);
			}
		}
	}

	info!(
		hashed = hashes.len(),
		updated = updated_files.len(),
		"asset hashing finished"
	);

	Ok(AssetReport {
		hashed_files: hashes.len(),
		updated_files,
	})
}

/// Map the path of every file under `roots`, relative to its root and with
/// `/` separators, to its content hash. A later root wins when two roots
/// contain the same relative path.
pub fn hash_roots(
	roots: &[PathBuf],
	include_dot_files: bool,
	skip: &GlobSet,
) -> HtmlResult<BTreeMap<String, String>> {
	let mut hashes = BTreeMap::new();

	for root in roots {
		let files = collect_files(root, include_dot_files, skip)?;
		debug!(root = %root.display(), files = files.len(), "hashing assets");

		for file in files {
			let Ok(relative) = file.strip_prefix(root) else {
				continue;
			};
			hashes.insert(normalize_path_key(relative), hash_file(&file)?);
		}
	}

	Ok(hashes)
}

/// The first [`HASH_LENGTH`] hex characters of the SHA-256 digest of
/// `content`.
pub fn content_hash(content: &[u8]) -> String {
	let mut hash = hex::encode(Sha256::digest(content));
	hash.truncate(HASH_LENGTH);
	hash
}

/// A file vanishing between listing and reading hashes to the empty string.
fn hash_file(path: &Path) -> HtmlResult<String> {
	match std::fs::read(path) {
		Ok(content) => Ok(content_hash(&content)),
		Err(error) if error.kind() == ErrorKind::NotFound => Ok(String::new()),
		Err(error) => Err(error.into()),
	}
}

/// Build the matcher for skip patterns.
pub fn build_skip_set(patterns: &[String]) -> HtmlResult<GlobSet> {
	let mut builder = GlobSetBuilder::new();

	for pattern in patterns {
		let glob = Glob::new(pattern).map_err(|e| {
			HtmlError::InvalidPattern {
				pattern: pattern.clone(),
				reason: e.to_string(),
			}
		})?;
		builder.add(glob);
	}

	builder.build().map_err(|e| {
		HtmlError::InvalidPattern {
			pattern: patterns.join(", "),
			reason: e.to_string(),
		}
	})
}

/// All regular files under `dir`, following symlinks, sorted.
fn collect_files(dir: &Path, include_dot_files: bool, skip: &GlobSet) -> HtmlResult<Vec<PathBuf>> {
	let mut files = Vec::new();
	let walker = WalkBuilder::new(dir)
		.standard_filters(false)
		.hidden(!include_dot_files)
		.follow_links(true)
		.build();

	for entry in walker {
		let entry = entry.map_err(|e| {
			HtmlError::Walk {
				path: dir.display().to_string(),
				reason: e.to_string(),
			}
		})?;
		let path = entry.path();

		if !path.is_file() {
			continue;
		}

		let relative = path.strip_prefix(dir).unwrap_or(path);
		if skip.is_match(normalize_path_key(relative)) {
			continue;
		}

		files.push(path.to_path_buf());
	}

	// Sort for deterministic ordering.
	files.sort();
	Ok(files)
}

fn normalize_path_key(path: &Path) -> String {
	path.to_string_lossy().replace('\\', "/")
}

/// A search pattern for one hashed asset.
#[derive(Debug, Clone)]
pub struct HashedReference {
	pattern: Regex,
	hash: String,
}

impl HashedReference {
	/// Match `prefix + path`, optionally followed by a query string that ends
	/// at `#`, a quote, or a backtick. The match must start the input or
	/// follow a character that cannot be part of a URL path, so `/z.css`
	/// never matches the tail of `/a/z.css`.
	pub fn new(prefix: &str, path: &str, hash: &str) -> HtmlResult<Self> {
		let source = format!(
			r##"(?P<lead>^|[^A-Za-z0-9_.~%/-])(?P<path>{})(?:\?(?P<query>[^#"'`]*))?"##,
			regex::escape(&format!("{prefix}{path}"))
		);
		let pattern = Regex::new(&source).map_err(|e| {
			HtmlError::InvalidPattern {
				pattern: source.clone(),
				reason: e.to_string(),
			}
		})?;

		Ok(Self {
			pattern,
			hash: hash.to_string(),
		})
	}

	/// Add or refresh the hash parameter on every reference in `content`.
	pub fn apply<'c>(&self, content: &'c str) -> Cow<'c, str> {
		self.pattern.replace_all(content, |captures: &Captures<'_>| {
			let lead = &captures["lead"];
			let path = &captures["path"];
			let hash = &self.hash;

			match captures.name("query").map(|query| query.as_str()) {
				None | Some("") => format!("{lead}{path}?{HASH_PARAM}{hash}"),
				Some(query) if query.contains(HASH_PARAM) => {
					format!("{lead}{path}?{}", replace_hash_param(query, hash))
				}
				Some(query) => format!("{lead}{path}?{HASH_PARAM}{hash}&{query}"),
			}
		})
	}
}

/// Apply every reference pattern in turn. Returns `None` when nothing
/// changed.
pub fn rewrite_references(content: &str, references: &[HashedReference]) -> Option<String> {
	let mut current = Cow::Borrowed(content);

	for reference in references {
		let replaced = match reference.apply(&current) {
			Cow::Owned(replaced) => replaced,
			Cow::Borrowed(_) => continue,
		};
		current = Cow::Owned(replaced);
	}

	match current {
		Cow::Owned(updated) if updated != content => Some(updated),
		_ => None,
	}
}

/// Replace the hex run after the first `hash=` in `query`.
fn replace_hash_param(query: &str, hash: &str) -> String {
	let Some(start) = query.find(HASH_PARAM) else {
		return query.to_string();
	};

	let value_start = start + HASH_PARAM.len();
	let value_end = query[value_start..]
		.find(|c: char| !c.is_ascii_hexdigit())
		.map_or(query.len(), |offset| value_start + offset);

	format!("{}{hash}{}", &query[..value_start], &query[value_end..])
}
