use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::time::{Duration, timeout};
use tracing::debug;

use super::{ExtractRequest, Extractor};
use crate::error::ExtractError;

/// Maximum output size from the extractor (10MB)
const MAX_OUTPUT_SIZE: usize = 10 * 1024 * 1024;

/// Default timeout for one extraction (60 seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Runs an external program once per page.
///
/// The request is written to the program's stdin as JSON and the critical CSS
/// is read from its stdout. A typical program is a small node script that
/// passes the request to penthouse:
///
/// ```no_run
/// use fold_plugin_critical::CommandExtractor;
///
/// let extractor = CommandExtractor::new("node")
///     .arg("scripts/critical.mjs")
///     .with_timeout_secs(120);
/// ```
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    timeout_secs: u64,
    max_output: usize,
}

impl CommandExtractor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_output: MAX_OUTPUT_SIZE,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Working directory for the program
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Cap on accepted stdout size in bytes
    pub fn with_max_output(mut self, bytes: usize) -> Self {
        self.max_output = bytes;
        self
    }
}

#[async_trait]
impl Extractor for CommandExtractor {
    async fn extract(&self, request: &ExtractRequest) -> Result<String, ExtractError> {
        let input = serde_json::to_vec(request).map_err(ExtractError::request)?;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }

        debug!("[critical-css] Spawning {} for {}", self.program, request.url);
        let mut child = cmd.spawn().map_err(ExtractError::spawn_failed)?;

        let (Some(mut stdin), Some(stdout), Some(mut stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            return Err(ExtractError::spawn_failed(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "Failed to capture extractor stdio",
            )));
        };

        let max_output = self.max_output;
        // stdin, stdout and stderr are driven together so a large request
        // cannot block on a full pipe outside the timeout.
        let run = async {
            let write_input = async move {
                match stdin.write_all(&input).await {
                    // The exit status and stderr explain an early exit
                    Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                    other => other,
                }
            };
            let read_output = async {
                let mut buf = Vec::new();
                stdout
                    .take(max_output as u64 + 1)
                    .read_to_end(&mut buf)
                    .await?;
                if buf.len() > max_output {
                    if let Err(e) = child.start_kill() {
                        debug!("[critical-css] Failed to stop extractor: {}", e);
                    }
                }
                Ok::<_, io::Error>(buf)
            };
            let read_errors = async {
                let mut buf = Vec::new();
                stderr.read_to_end(&mut buf).await.map(|_| buf)
            };

            let (written, output, errors) = futures::join!(write_input, read_output, read_errors);
            written?;
            let (output, errors) = (output?, errors?);
            let status = child.wait().await?;
            Ok::<_, io::Error>((status, output, errors))
        };

        let (status, stdout, stderr) = timeout(Duration::from_secs(self.timeout_secs), run)
            .await
            .map_err(|_| ExtractError::timeout(self.timeout_secs))?
            .map_err(ExtractError::spawn_failed)?;

        if stdout.len() > max_output {
            return Err(ExtractError::output_too_large(max_output));
        }

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr).trim().to_string();
            let exit_code = status.code().unwrap_or(-1);
            return Err(ExtractError::exit_error(exit_code, stderr));
        }

        String::from_utf8(stdout).map_err(ExtractError::parse_error)
    }
}
