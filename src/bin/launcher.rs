use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use naino_academy_bot::{
    config::Credentials,
    guard::{default_program, Handoff, ProcessExec, StartupGuard},
};

#[derive(Parser)]
#[command(author, version, long_about = None)]
#[command(about = "Check the bot's required environment and hand the process over to it.")]
struct Cli {
    /// Downstream entry point to start
    #[arg(value_enum, env = "LAUNCH_MODE", default_value_t = Handoff::Bot)]
    mode: Handoff,

    /// Bot executable, defaults to `bot` next to this launcher
    #[arg(long)]
    program: Option<PathBuf>,

    /// Port for the webhook server
    #[arg(long, env = "PORT")]
    port: Option<String>,
}

fn main() -> ExitCode {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let program = cli.program.unwrap_or_else(default_program);
    let err = StartupGuard::new(ProcessExec, std::io::stdout().lock()).run(
        Credentials::from_env(),
        cli.mode,
        &program,
        cli.port.as_deref(),
    );
    eprintln!("{err}");
    err.exit_code()
}
