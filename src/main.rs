use clap::Parser;
use marklist::cli::commands::Cli;
use marklist::cli::handlers;
use tracing_subscriber::EnvFilter;

fn main() {
    init_logging();
    let cli = Cli::parse();
    if let Err(e) = handlers::dispatch(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

/// Log to stderr so piped output stays clean. `MARKLIST_LOG` wins over
/// `RUST_LOG`; the default only shows warnings.
fn init_logging() {
    let filter = EnvFilter::try_from_env("MARKLIST_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();
}
