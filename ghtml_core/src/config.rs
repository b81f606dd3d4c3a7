use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::HtmlError;
use crate::HtmlResult;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = ["ghtml.toml", ".ghtml.toml", ".config/ghtml.toml"];

/// Configuration loaded from a `ghtml.toml` file.
///
/// ```toml
/// [assets]
/// roots = ["public/assets"]
/// refs = ["views"]
/// prefix = "/assets/"
/// include_dot_files = false
/// skip = ["**/node_modules/**", "**/*.map"]
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct GhtmlConfig {
	/// Settings for content hashing of static assets.
	#[serde(default)]
	pub assets: AssetsConfig,
}

/// The `[assets]` section. Every key is optional; relative paths are
/// resolved against the project root.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct AssetsConfig {
	/// Directories whose files are hashed.
	#[serde(default)]
	pub roots: Vec<PathBuf>,
	/// Directories whose text files get their asset references rewritten.
	#[serde(default)]
	pub refs: Vec<PathBuf>,
	/// Prepended to every hashed file's relative path when searching for
	/// references. Defaults to `/`.
	#[serde(default)]
	pub prefix: Option<String>,
	/// Also hash and rewrite files whose name starts with a dot.
	#[serde(default)]
	pub include_dot_files: bool,
	/// Glob patterns, relative to each scanned directory, of files to leave
	/// alone. Defaults to `["**/node_modules/**"]`.
	#[serde(default)]
	pub skip: Option<Vec<String>>,
}

impl GhtmlConfig {
	/// Resolve the first existing config file path at `root`.
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if no config file exists.
	pub fn load(root: &Path) -> HtmlResult<Option<GhtmlConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config: GhtmlConfig =
			toml::from_str(&content).map_err(|e| HtmlError::ConfigParse(e.to_string()))?;

		Ok(Some(config))
	}
}
