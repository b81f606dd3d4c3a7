use std::path::PathBuf;

use clap::Parser;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Append content hashes to asset references so browsers never serve stale files.",
	long_about = "ghtml hashes every file under the asset roots and rewrites references to \
	              them in the files under the reference directories.\n\nA reference is the \
	              prefix followed by the asset's path relative to its root. Each reference \
	              gains a `hash` query parameter, or has its existing one refreshed:\n  \
	              /app.css        -> /app.css?hash=3b1f09c2d4e5a6b7\n  /app.css?v=2    -> \
	              /app.css?hash=3b1f09c2d4e5a6b7&v=2\n\nDefaults are read from the `[assets]` \
	              section of ghtml.toml; command line flags take precedence."
)]
pub struct GhtmlCli {
	/// Path to the project root directory. Config files are discovered here
	/// and relative directories are resolved against it.
	#[arg(long, short)]
	pub path: Option<PathBuf>,

	/// Directories whose files are hashed. Accepts a comma separated list
	/// or repeated flags.
	#[arg(long, value_delimiter = ',')]
	pub roots: Vec<PathBuf>,

	/// Directories whose files get their asset references rewritten.
	/// Accepts a comma separated list or repeated flags.
	#[arg(long, value_delimiter = ',')]
	pub refs: Vec<PathBuf>,

	/// Prepended to each asset's relative path when searching for
	/// references. Defaults to `/`.
	#[arg(long)]
	pub prefix: Option<String>,

	/// Also hash and rewrite files whose name starts with a dot.
	#[arg(long, default_value_t = false)]
	pub include_dot_files: bool,

	/// Glob patterns of files to leave alone. Replaces the default
	/// `**/node_modules/**`.
	#[arg(long, value_delimiter = ',')]
	pub skip: Vec<String>,

	/// Output format for the run summary.
	#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
	pub format: OutputFormat,

	/// Enable verbose output.
	#[arg(long, short, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output with colors and formatting.
	Text,
	/// JSON output for programmatic consumption.
	Json,
}
