use std::io;

use clap::{CommandFactory, FromArgMatches};
use clap_complete::generate;
use schemaview::cli::args::Cli;
use schemaview::cli::commands::execute;
use schemaview::cli::output;
use schemaview::config::Settings;
use schemaview::exitcode;
use schemaview::format;
use schemaview::trace::TraceGuard;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

fn main() {
    std::process::exit(run());
}

/// Compute the exit code with every scoped resource (the trace guard in
/// particular) dropped before the process exits.
fn run() -> i32 {
    let registry = format::builtin_registry();

    // --help shows usage plus the registered formats and exits 0 without
    // touching any input.
    let command = Cli::command().after_help(registry.help_listing());
    let matches = command.get_matches();
    let cli = match Cli::from_arg_matches(&matches) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return exitcode::FAILURE;
        }
    };

    if let Some(shell) = cli.completions {
        let mut command = Cli::command();
        generate(shell, &mut command, "schemaview", &mut io::stdout());
        return exitcode::OK;
    }

    let trace = match &cli.trace {
        Some(path) => match TraceGuard::create(path) {
            Ok(guard) => Some(guard),
            Err(e) => {
                output::error(&format!("cannot create trace file {}: {e}", path.display()));
                return exitcode::FAILURE;
            }
        },
        None => None,
    };
    setup_logging(cli.debug, trace.as_ref());

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            output::error(&e);
            return exitcode::FAILURE;
        }
    };

    match execute(
        &cli,
        &settings,
        &registry,
        &mut io::stdin().lock(),
        &mut io::stdout().lock(),
    ) {
        Ok(()) => exitcode::OK,
        Err(e) => {
            output::report(&e);
            e.exit_code()
        }
    }
}

fn setup_logging(verbosity: u8, trace: Option<&TraceGuard>) {
    let filter = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(filter);

    // The execution trace rides the same subscriber: a second layer capturing
    // span enter/close events into the trace file.
    let trace_layer = trace.map(|guard| {
        fmt::layer()
            .with_writer(guard.writer())
            .with_ansi(false)
            .with_target(true)
            .with_span_events(FmtSpan::ENTER)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(LevelFilter::TRACE)
    });

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(trace_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    // https://docs.rs/clap/latest/clap/_derive/_tutorial/index.html#testing
    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }
}
