mod watch;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use po2vue::{ModuleSyntax, Options, convert};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "po2vue", author, version, about, long_about = None)]
struct Args {
    /// Catalog files or glob patterns to convert
    #[arg(value_name = "GLOB_OR_FILE")]
    po: Vec<String>,

    /// Header that contains the locale name; file stem otherwise
    #[arg(long, alias = "localeNameHeader", value_name = "HEADER")]
    locale_name_header: Option<String>,

    /// Output JS file exporting the locale -> plural-function table
    #[arg(long, alias = "pluralRules", value_name = "FILE.js")]
    plural_rules: Option<PathBuf>,

    /// Single output JSON file with all translations, locale as key
    #[arg(long, alias = "messagesFile", value_name = "FILE.json")]
    messages_file: Option<PathBuf>,

    /// Output directory with one JSON file per locale
    #[arg(long, alias = "messagesDir", value_name = "DIR")]
    messages_dir: Option<PathBuf>,

    /// Glob of source files scanned for key usage; unused keys are dropped
    #[arg(long, alias = "whiteList", value_name = "GLOB")]
    white_list: Option<String>,

    /// Keep dotted keys flat instead of expanding them into nested maps
    #[arg(long)]
    flat: bool,

    /// Module syntax of the generated plural-rules file
    #[arg(
        long,
        alias = "moduleSyntax",
        value_name = "cjs|esm",
        default_value = "cjs"
    )]
    module_syntax: String,

    /// Re-run the conversion when catalog files change
    #[arg(long)]
    watch: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if args.po.is_empty() {
        // Mirror the original tool: missing input prints usage and is
        // not an error exit.
        Args::command().print_help()?;
        return Ok(());
    }

    let module_syntax: ModuleSyntax = args
        .module_syntax
        .parse()
        .with_context(|| format!("invalid --module-syntax `{}`", args.module_syntax))?;

    let mut options = Options::new(args.po)
        .with_flat(args.flat)
        .with_module_syntax(module_syntax);
    options.locale_name_header = args.locale_name_header;
    options.plural_rules = args.plural_rules;
    options.messages_file = args.messages_file;
    options.messages_dir = args.messages_dir;
    options.white_list = args.white_list;

    let output = convert(&options).context("conversion failed")?;
    info!(locales = output.len(), "conversion finished");

    if args.watch {
        watch::watch_and_rerun(&options, Duration::from_millis(300))?;
    }

    Ok(())
}
