use crate::error::{InstallerError, Result};
use std::fmt;
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

pub const COMPOSER_PHAR: &str = "composer.phar";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallStep {
    pub program: String,
    pub args: Vec<String>,
}

impl InstallStep {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl fmt::Display for InstallStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Commands run inside the new project, in order. A step only runs when
/// every step before it exited successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    pub steps: Vec<InstallStep>,
}

impl InstallPlan {
    pub fn new(steps: Vec<InstallStep>) -> Self {
        Self { steps }
    }

    /// Composer install followed by the post-install scripts.
    ///
    /// A `composer.phar` in `working_dir` is preferred and run through
    /// `php_binary`; otherwise the global `composer` executable is used.
    pub fn composer(working_dir: &Path, php_binary: &str) -> Self {
        let phar = working_dir.join(COMPOSER_PHAR);

        let (program, prefix) = if phar.is_file() {
            tracing::debug!("Using {}", phar.display());
            (
                php_binary.to_string(),
                vec![phar.to_string_lossy().to_string()],
            )
        } else {
            ("composer".to_string(), Vec::new())
        };

        let step = |args: &[&str]| {
            let mut all: Vec<&str> = prefix.iter().map(String::as_str).collect();
            all.extend_from_slice(args);
            InstallStep::new(program.clone(), &all)
        };

        Self::new(vec![
            step(&["install", "--no-scripts"]),
            step(&["run-script", "post-install-cmd"]),
        ])
    }
}

/// Runs an [`InstallPlan`] and relays the output of each step.
#[derive(Debug, Clone, Copy)]
pub struct Installer {
    allow_tty: bool,
}

impl Installer {
    pub fn new(allow_tty: bool) -> Self {
        Self { allow_tty }
    }

    /// Run every step of `plan` with `dir` as working directory.
    ///
    /// With a usable terminal the steps get `/dev/tty` directly so they can
    /// prompt. Otherwise stdout and stderr are forwarded to `sink` line by
    /// line as they arrive.
    pub async fn run(&self, plan: &InstallPlan, dir: &Path, sink: &mut dyn Write) -> Result<()> {
        let tty = if self.allow_tty { open_tty() } else { None };

        for step in &plan.steps {
            tracing::info!("Running `{}` in {}", step, dir.display());

            let status = match &tty {
                Some(tty) => run_attached(step, dir, tty).await?,
                None => run_streamed(step, dir, sink).await?,
            };

            if !status.success() {
                return Err(InstallerError::Subprocess {
                    command: step.to_string(),
                    code: status.code(),
                });
            }
        }

        Ok(())
    }
}

fn open_tty() -> Option<fs::File> {
    if cfg!(windows) || !io::stdout().is_terminal() {
        return None;
    }

    match fs::OpenOptions::new().read(true).write(true).open("/dev/tty") {
        Ok(tty) => Some(tty),
        Err(e) => {
            tracing::debug!("/dev/tty unavailable: {}", e);
            None
        }
    }
}

fn command_for(step: &InstallStep, dir: &Path) -> Command {
    let mut command = Command::new(&step.program);
    command.args(&step.args).current_dir(dir).kill_on_drop(true);
    command
}

fn spawn_error(step: &InstallStep, dir: &Path, e: io::Error) -> InstallerError {
    if e.kind() == io::ErrorKind::NotFound {
        InstallerError::MissingDependency {
            program: step.program.clone(),
        }
    } else {
        InstallerError::io(dir, e)
    }
}

async fn run_attached(step: &InstallStep, dir: &Path, tty: &fs::File) -> Result<ExitStatus> {
    let handle = |tty: &fs::File| {
        tty.try_clone()
            .map(Stdio::from)
            .map_err(|e| InstallerError::io("/dev/tty", e))
    };

    let mut child = command_for(step, dir)
        .stdin(handle(tty)?)
        .stdout(handle(tty)?)
        .stderr(handle(tty)?)
        .spawn()
        .map_err(|e| spawn_error(step, dir, e))?;

    child.wait().await.map_err(|e| InstallerError::io(dir, e))
}

async fn run_streamed(step: &InstallStep, dir: &Path, sink: &mut dyn Write) -> Result<ExitStatus> {
    let mut child = command_for(step, dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| spawn_error(step, dir, e))?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(forward_lines(stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(forward_lines(stderr, tx.clone()));
    }
    drop(tx);

    while let Some(line) = rx.recv().await {
        writeln!(sink, "{}", line).map_err(InstallerError::Output)?;
        sink.flush().map_err(InstallerError::Output)?;
    }

    child.wait().await.map_err(|e| InstallerError::io(dir, e))
}

async fn forward_lines<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf)
                    .trim_end_matches(['\r', '\n'])
                    .to_string();
                if tx.send(line).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::debug!("Stopped reading installer output: {}", e);
                break;
            }
        }
    }
}
