//! Startup guard: check the required configuration, report it, then hand the
//! process over to the bot.
//!
//! The handoff replaces the current process image. Nothing runs after a
//! successful [`StartupGuard::run`], so there is no supervision or retry.

use std::{
    ffi::OsString,
    fmt,
    io::{self, Write},
    path::{Path, PathBuf},
    process::{Command, ExitCode},
};

use clap::ValueEnum;
use thiserror::Error;

use crate::config::{preview, Credentials, MissingConfiguration};

/// Exit status when a required variable is unset or empty.
pub const EXIT_MISSING_CONFIGURATION: u8 = 1;
/// Exit status when the downstream program could not be executed.
pub const EXIT_HANDOFF_FAILED: u8 = 127;

/// Name of the downstream binary looked up next to the launcher.
pub const DEFAULT_PROGRAM: &str = "bot";

#[derive(Error, Debug)]
pub enum GuardError {
    #[error(transparent)]
    MissingConfiguration(#[from] MissingConfiguration),
    #[error("failed to hand off to {program}: {source}")]
    Handoff {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl GuardError {
    pub fn status(&self) -> u8 {
        match self {
            GuardError::MissingConfiguration(_) => EXIT_MISSING_CONFIGURATION,
            GuardError::Handoff { .. } => EXIT_HANDOFF_FAILED,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.status())
    }
}

/// Which downstream entry point receives the process.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handoff {
    /// Long-polling bot.
    Bot,
    /// Webhook HTTP server.
    Server,
}

impl Handoff {
    /// Downstream command line. The environment is inherited untouched;
    /// `port` only adds an explicit `--port` for the server variant.
    pub fn command(self, program: &Path, port: Option<&str>) -> Command {
        let mut cmd = Command::new(program);
        match self {
            Handoff::Bot => {
                cmd.arg("polling");
            }
            Handoff::Server => {
                cmd.arg("webhook");
                if let Some(port) = port.filter(|p| !p.is_empty()) {
                    cmd.args(["--port", port]);
                }
            }
        }
        cmd
    }
}

/// `bot` in the same directory as the running executable, falling back to a
/// `PATH` lookup when the executable location is unknown.
pub fn default_program() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_PROGRAM)))
        .filter(|candidate| candidate.exists())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PROGRAM))
}

/// Performs the one-way process replacement.
pub trait Exec {
    /// Only returns if the replacement failed.
    fn exec(&mut self, cmd: Command) -> io::Error;
}

/// Replaces the process image via `execvp(3)`.
pub struct ProcessExec;

impl Exec for ProcessExec {
    #[cfg(unix)]
    fn exec(&mut self, mut cmd: Command) -> io::Error {
        use std::os::unix::process::CommandExt;
        cmd.exec()
    }

    #[cfg(not(unix))]
    fn exec(&mut self, mut cmd: Command) -> io::Error {
        // No exec on this platform: run the child to completion and mirror its status.
        match cmd.status() {
            Ok(status) => std::process::exit(status.code().unwrap_or(1)),
            Err(e) => e,
        }
    }
}

pub struct StartupGuard<E, W> {
    exec: E,
    out: W,
}

impl<E: Exec, W: Write> StartupGuard<E, W> {
    pub fn new(exec: E, out: W) -> Self {
        Self { exec, out }
    }

    /// Diagnostics are best effort: a closed or full output must not keep the
    /// bot from starting.
    fn say(&mut self, line: fmt::Arguments<'_>) {
        if let Err(e) = self.out.write_fmt(format_args!("{line}\n")) {
            log::debug!("diagnostic output failed: {e}");
        }
    }

    /// check → log → exec. On success this never returns; the `Err` carries
    /// the reason the process must exit instead.
    pub fn run(
        &mut self,
        credentials: Result<Credentials, MissingConfiguration>,
        handoff: Handoff,
        program: &Path,
        port: Option<&str>,
    ) -> GuardError {
        let credentials = match credentials {
            Ok(c) => c,
            Err(e) => {
                log::error!("{e}");
                self.say(format_args!("❌ ERROR: {e}"));
                return e.into();
            }
        };

        self.say(format_args!("✅ All required environment variables are set"));
        for (name, value) in credentials.entries() {
            self.say(format_args!("   {name}: {}", preview(value)));
        }

        let cmd = handoff.command(program, port);
        let target = match handoff {
            Handoff::Bot => "bot in polling mode",
            Handoff::Server => "webhook server",
        };
        self.say(format_args!("🚀 Starting {target} ({})", describe(&cmd)));
        if let Err(e) = self.out.flush() {
            log::debug!("diagnostic output failed: {e}");
        }
        log::debug!("exec {:?}", cmd);

        let source = self.exec.exec(cmd);
        log::error!("handoff to {} failed: {source}", program.display());
        GuardError::Handoff {
            program: program.display().to_string(),
            source,
        }
    }
}

fn describe(cmd: &Command) -> String {
    std::iter::once(cmd.get_program().to_os_string())
        .chain(cmd.get_args().map(OsString::from))
        .map(|s| s.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod guard_test {
    use super::*;
    use crate::config::{BOT_TOKEN_1, CHAT_ID_1, REQUIRED_VARS};
    use std::collections::HashMap;

    #[derive(Default)]
    struct RecordingExec {
        calls: Vec<(String, Vec<String>)>,
    }

    impl Exec for &mut RecordingExec {
        fn exec(&mut self, cmd: Command) -> io::Error {
            self.calls.push((
                cmd.get_program().to_string_lossy().into_owned(),
                cmd.get_args()
                    .map(|a| a.to_string_lossy().into_owned())
                    .collect(),
            ));
            io::Error::new(io::ErrorKind::NotFound, "recorded")
        }
    }

    fn credentials(pairs: &[(&str, &str)]) -> Result<Credentials, MissingConfiguration> {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        Credentials::from_lookup(|name| map.get(name).cloned())
    }

    const ALL_SET: [(&str, &str); 4] = [
        ("BOT_TOKEN_1", "7412589630:AAHk-first-secret-token"),
        ("CHAT_ID_1", "123456789"),
        ("BOT_TOKEN_2", "8523697410:BBQz-second-secret-token"),
        ("CHAT_ID_2", "-1001234567890"),
    ];

    fn run(
        pairs: &[(&str, &str)],
        handoff: Handoff,
        port: Option<&str>,
    ) -> (GuardError, RecordingExec, String) {
        let mut exec = RecordingExec::default();
        let mut out = Vec::new();
        let err = StartupGuard::new(&mut exec, &mut out).run(
            credentials(pairs),
            handoff,
            Path::new("/opt/app/bot"),
            port,
        );
        (err, exec, String::from_utf8(out).unwrap())
    }

    #[test]
    fn nothing_set_fails_without_handoff() {
        let (err, exec, out) = run(&[], Handoff::Bot, None);
        assert!(matches!(err, GuardError::MissingConfiguration(_)));
        assert_eq!(err.status(), EXIT_MISSING_CONFIGURATION);
        assert!(exec.calls.is_empty());
        for name in REQUIRED_VARS {
            assert!(out.contains(name), "{out} should name {name}");
        }
    }

    #[test]
    fn partial_configuration_fails_without_handoff() {
        let (err, exec, _) = run(
            &[(BOT_TOKEN_1, "123:abc"), (CHAT_ID_1, "42")],
            Handoff::Server,
            Some("8080"),
        );
        assert!(matches!(err, GuardError::MissingConfiguration(_)));
        assert!(exec.calls.is_empty());
    }

    #[test]
    fn bot_variant_hands_off_once() {
        let (err, exec, out) = run(&ALL_SET, Handoff::Bot, None);
        assert!(matches!(err, GuardError::Handoff { .. }));
        assert_eq!(err.status(), EXIT_HANDOFF_FAILED);
        assert_eq!(
            exec.calls,
            vec![("/opt/app/bot".to_string(), vec!["polling".to_string()])]
        );
        assert!(out.contains("All required environment variables are set"));
    }

    #[test]
    fn server_variant_binds_port() {
        let (_, exec, _) = run(&ALL_SET, Handoff::Server, Some("8080"));
        assert_eq!(exec.calls.len(), 1);
        assert_eq!(exec.calls[0].1, vec!["webhook", "--port", "8080"]);
    }

    #[test]
    fn server_variant_without_port() {
        let (_, exec, _) = run(&ALL_SET, Handoff::Server, Some(""));
        assert_eq!(exec.calls[0].1, vec!["webhook"]);
    }

    #[test]
    fn diagnostics_do_not_leak_secrets() {
        let (_, _, out) = run(&ALL_SET, Handoff::Bot, None);
        assert!(out.contains("7412589630:AAHk..."));
        assert!(!out.contains("first-secret-token"));
        assert!(!out.contains("second-secret-token"));
        assert!(out.contains("123456789"));
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::ErrorKind::BrokenPipe.into())
        }
    }

    #[test]
    fn closed_output_still_hands_off() {
        let mut exec = RecordingExec::default();
        let err = StartupGuard::new(&mut exec, ClosedPipe).run(
            credentials(&ALL_SET),
            Handoff::Bot,
            Path::new("/opt/app/bot"),
            None,
        );
        assert!(matches!(err, GuardError::Handoff { .. }));
        assert_eq!(exec.calls.len(), 1);
    }
}
