use anyhow::{Context, Result};
use argh::FromArgs;
use command_flow::command::{ExitCode, FAILURE, SUCCESS};
use command_flow::{AliasStore, Interpreter, Registry, Settings};
use std::path::PathBuf;
use std::process;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

#[derive(FromArgs)]
/// Run command lines chained with `&&`, `||` and parentheses.
/// Starts an interactive prompt unless a command is given.
struct Args {
    #[argh(option, short = 'c')]
    /// run this command line and exit with its exit code.
    command: Option<String>,

    #[argh(option)]
    /// additional config file, applied over the global one.
    config: Option<PathBuf>,

    #[argh(option)]
    /// alias file to use instead of the configured one.
    aliases: Option<PathBuf>,

    #[argh(switch, short = 'd')]
    /// verbose logging on stderr.
    debug: bool,
}

fn main() {
    let args: Args = argh::from_env();
    setup_logging(args.debug);

    match run(args) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(FAILURE);
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let settings = Settings::load(args.config.as_deref())?;
    tracing::debug!(?settings, "settings loaded");

    let mut registry = Registry::with_builtins();
    let store = args
        .aliases
        .or_else(|| settings.alias_file())
        .map(AliasStore::new);
    if let Some(store) = &store {
        store
            .apply(&mut registry)
            .with_context(|| format!("load aliases from {}", store.path().display()))?;
    }

    let mut sh = Interpreter::with_settings(registry, &settings);
    sh.session_mut().alias_store = store;

    let Some(line) = args.command else {
        return Ok(sh.repl());
    };
    let code = match sh.execute(&line) {
        Some(result) => {
            if let Some(err) = &result.error {
                eprintln!("Error: {err}");
            }
            result.exit_code
        }
        None => SUCCESS,
    };
    Ok(code)
}

fn setup_logging(debug: bool) {
    let default = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    // RUST_LOG wins over the default level
    let filter = EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy();

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false);

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter))
        .init();

    tracing::debug!(level = %default, "logging initialized");
}
