//! Beacon watchdog CLI.

use clap::{Arg, ArgAction, Command};
use std::time::Duration;
use tracing::error;
use watchdog::dispatch::Dispatcher;
use watchdog::fetch::HttpFetcher;
use watchdog::oracle::{EngineConfig, EngineOracle};
use watchdog::report::LogReporter;
use watchdog::verify::Verifier;

/// Returns the version of the crate.
pub const fn crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Flag for verbose output
const VERBOSE_FLAG: &str = "verbose";

/// Entrypoint for the beacon watchdog.
#[tokio::main]
async fn main() -> std::process::ExitCode {
    // Define application
    let matches = Command::new("watchdog")
        .version(crate_version())
        .about("Cross-validate a beacon node's block-import decisions against a reference state-transition engine.")
        .arg(
            Arg::new(VERBOSE_FLAG)
                .short('v')
                .long(VERBOSE_FLAG)
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("node")
                .long("node")
                .default_value("localhost:5052")
                .help("host:port of the node's query service"),
        )
        .arg(
            Arg::new("stream")
                .long("stream")
                .default_value("ws://localhost:5053")
                .help("URI of the node's block-import event stream"),
        )
        .arg(
            Arg::new("engine")
                .long("engine")
                .required(true)
                .help("Reference engine command; receives {\"pre_state\", \"block\"} as JSON on stdin and prints the post-state on stdout"),
        )
        .arg(
            Arg::new("engine-arg")
                .long("engine-arg")
                .action(ArgAction::Append)
                .help("Argument passed to the engine command, repeatable (preset and config selection)"),
        )
        .arg(
            Arg::new("concurrency")
                .long("concurrency")
                .help("Maximum in-flight verifications (default: unbounded)")
                .value_parser(clap::builder::RangedU64ValueParser::<usize>::new().range(1..)),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .help("Per-verification deadline in seconds (default: none)")
                .value_parser(clap::value_parser!(u64)),
        )
        .get_matches();

    // Create logger
    let level = if matches.get_flag(VERBOSE_FLAG) {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let node = matches.get_one::<String>("node").unwrap().clone();
    let stream = matches.get_one::<String>("stream").unwrap().clone();
    let engine = matches.get_one::<String>("engine").unwrap().clone();
    let args = matches
        .get_many::<String>("engine-arg")
        .map(|args| args.cloned().collect())
        .unwrap_or_default();

    // The engine configuration is built once, before the listener starts,
    // and is immutable for the process lifetime.
    let oracle = EngineOracle::new(EngineConfig {
        command: engine,
        args,
    });
    let mut verifier = Verifier::new(HttpFetcher::new(node), oracle, LogReporter);
    if let Some(timeout) = matches.get_one::<u64>("timeout") {
        verifier = verifier.with_deadline(Duration::from_secs(*timeout));
    }
    let mut dispatcher = Dispatcher::new(verifier);
    if let Some(limit) = matches.get_one::<usize>("concurrency") {
        dispatcher = dispatcher.with_concurrency(*limit);
    }

    if let Err(e) = watchdog::listener::listen(&stream, dispatcher).await {
        error!(error = ?e, "event stream terminated abnormally");
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}
