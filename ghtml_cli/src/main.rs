use std::path::Path;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use clap::Parser;
use ghtml_cli::GhtmlCli;
use ghtml_cli::OutputFormat;
use ghtml_core::GhtmlConfig;
use ghtml_core::HtmlError;
use ghtml_core::assets::AssetOptions;
use ghtml_core::assets::AssetReport;
use ghtml_core::assets::generate_hashes_and_replace;
use owo_colors::OwoColorize;
use tracing::info;
use tracing_subscriber::EnvFilter;

static USE_COLOR: AtomicBool = AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

const USAGE: &str = "Usage: ghtml --roots <DIRS> --refs <DIRS> [--prefix <PREFIX>]\n\nBoth \
                     --roots and --refs are required, either as flags or in the [assets] \
                     section of ghtml.toml. Run `ghtml --help` for every option.";

fn main() {
	let args = GhtmlCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, Ordering::Relaxed);
	}

	init_tracing(args.verbose, use_color);

	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	if let Err(e) = run(&args) {
		match e.downcast::<HtmlError>() {
			Ok(html_err) => {
				let report: miette::Report = (*html_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// Logs go to stderr so stdout only carries the run summary. `RUST_LOG`
/// overrides the level chosen by `--verbose`.
fn init_tracing(verbose: bool, use_color: bool) {
	let default_level = if verbose { "info" } else { "warn" };
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.with_target(false)
		.init();
}

fn resolve_root(args: &GhtmlCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Config values are the base; every flag that was given replaces its
/// counterpart.
fn resolve_options(args: &GhtmlCli, config: Option<&GhtmlConfig>, root: &Path) -> AssetOptions {
	let mut options = AssetOptions::from_config(config, root);

	if !args.roots.is_empty() {
		options.roots = args.roots.iter().map(|dir| root.join(dir)).collect();
	}

	if !args.refs.is_empty() {
		options.refs = args.refs.iter().map(|dir| root.join(dir)).collect();
	}

	if let Some(prefix) = &args.prefix {
		options.prefix.clone_from(prefix);
	}

	if args.include_dot_files {
		options.include_dot_files = true;
	}

	if !args.skip.is_empty() {
		options.skip.clone_from(&args.skip);
	}

	options
}

fn run(args: &GhtmlCli) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let config = GhtmlConfig::load(&root)?;

	if let Some(config_path) = GhtmlConfig::resolve_path(&root) {
		info!(path = %config_path.display(), "loaded config");
	}

	let options = resolve_options(args, config.as_ref(), &root);

	if options.roots.is_empty() || options.refs.is_empty() {
		eprintln!("{USAGE}");
		process::exit(1);
	}

	let report = generate_hashes_and_replace(&options)?;
	let report = AssetReport {
		hashed_files: report.hashed_files,
		updated_files: report
			.updated_files
			.iter()
			.map(|file| make_relative(file, &root))
			.collect(),
	};

	match args.format {
		OutputFormat::Json => {
			println!("{}", serde_json::to_string_pretty(&report)?);
		}
		OutputFormat::Text => print_report(&report),
	}

	Ok(())
}

fn print_report(report: &AssetReport) {
	println!(
		"{} {} asset file(s).",
		colored!("Hashed", green),
		report.hashed_files
	);

	if report.updated_files.is_empty() {
		println!("All asset references are up to date.");
		return;
	}

	println!(
		"{} {} file(s):",
		colored!("Updated", bold),
		report.updated_files.len()
	);
	for file in &report.updated_files {
		println!("  {}", file.display());
	}
}

fn make_relative(path: &Path, root: &Path) -> PathBuf {
	path.strip_prefix(root).unwrap_or(path).to_path_buf()
}
