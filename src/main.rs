use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use samplr::cli::{Cli, Invocation};
use samplr::render;
use samplr::session::Session;
use samplr::target::Target;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit status when samplr is started without any argument
const NO_ARGUMENTS_EXIT: u8 = 2;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Build the session for this invocation, or `None` when there is nothing to do
fn build_session(cli: &Cli) -> Result<Option<Session>> {
    let session = match cli.invocation() {
        Invocation::Live { program, args } => {
            let target = Target::prepare(&program, &args)
                .with_context(|| format!("Cannot profile {}", program))?;
            Session::capture(&target, &cli.capture_config())
                .with_context(|| format!("Profiling {} failed", program))?
        }
        Invocation::Replay(source) => Session::replay(&source)
            .with_context(|| format!("Cannot load capture from {}", source.name()))?,
        Invocation::Usage => return Ok(None),
    };
    Ok(Some(session))
}

fn main() -> Result<ExitCode> {
    if std::env::args_os().len() <= 1 {
        eprintln!("{}", Cli::command().render_usage());
        return Ok(ExitCode::from(NO_ARGUMENTS_EXIT));
    }

    let cli = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(cli.debug);

    let Some(session) = build_session(&cli)? else {
        println!("{}", Cli::command().render_usage());
        return Ok(ExitCode::SUCCESS);
    };

    // The destination is opened only now that a session exists
    render::write_output(session, cli.output_format(), &cli.destination())
        .context("Failed to write report")?;

    Ok(ExitCode::SUCCESS)
}
