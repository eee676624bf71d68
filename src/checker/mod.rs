//! External static checker (luacheck).
//!
//! The document text is piped to `luacheck -` and the plain formatter output
//! is turned into diagnostics. Every run is bounded by [`CHECK_TIMEOUT`]; on
//! any failure the caller gets a [`CheckError`] and should treat the
//! revision as having no diagnostics.

use regex::Regex;
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::StaticCheckConfig;
use crate::types::{Diagnostic, Range, Severity};

pub const CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// luacheck exit codes 0..=2 mean "ran fine" (no warnings, warnings,
/// errors); anything higher is a fatal problem with the invocation.
const MAX_OK_EXIT: i32 = 2;

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' did not finish within {}s", .timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    #[error("'{program}' exited with status {status}: {stderr}")]
    Failed {
        program: String,
        status: i32,
        stderr: String,
    },

    #[error("I/O error talking to the checker: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct Checker {
    config: StaticCheckConfig,
    timeout: Duration,
}

impl Checker {
    pub fn new(config: StaticCheckConfig) -> Self {
        Self {
            config,
            timeout: CHECK_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn config(&self) -> &StaticCheckConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enable
    }

    /// Whether a document of `len` bytes is small enough to check.
    pub fn within_size_limit(&self, len: usize) -> bool {
        (len as u64) <= self.config.file_size_limit.saturating_mul(1024)
    }

    /// Command-line arguments for checking stdin reported as `filename`.
    pub fn args(&self, filename: &str) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "--formatter".into(),
            "plain".into(),
            "--codes".into(),
            "--ranges".into(),
            "--filename".into(),
            filename.into(),
        ];
        if !self.config.std.is_empty() {
            args.push("--std".into());
            args.push(self.config.std.join("+"));
        }
        if !self.config.ignore.is_empty() {
            args.push("--ignore".into());
            args.extend(self.config.ignore.iter().cloned());
        }
        if self.config.jobs > 1 {
            args.push("-j".into());
            args.push(self.config.jobs.to_string());
        }
        if !self.config.config_file_path.is_empty() {
            args.push("--config".into());
            args.push(self.config.config_file_path.clone());
        }
        args.push("-".into());
        args
    }

    /// Run the checker over `text`. Oversized documents and a disabled
    /// checker produce no diagnostics without running anything.
    pub async fn check(&self, filename: &str, text: &str) -> Result<Vec<Diagnostic>, CheckError> {
        if !self.is_enabled() {
            return Ok(Vec::new());
        }
        if !self.within_size_limit(text.len()) {
            tracing::debug!(
                "[checker] skipping {filename}: {} KB over limit {} KB",
                text.len() / 1024,
                self.config.file_size_limit
            );
            return Ok(Vec::new());
        }

        let program = self.config.executable().to_string();
        let mut child = Command::new(&program)
            .args(self.args(filename))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CheckError::Spawn {
                program: program.clone(),
                source,
            })?;

        let input = text.as_bytes().to_vec();
        let mut stdin = child.stdin.take();
        let run = async move {
            if let Some(stdin) = stdin.as_mut() {
                stdin.write_all(&input).await?;
                stdin.shutdown().await?;
            }
            drop(stdin);
            child.wait_with_output().await
        };

        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| CheckError::Timeout {
                program: program.clone(),
                timeout: self.timeout,
            })??;

        let status = output.status.code().unwrap_or(-1);
        if !(0..=MAX_OK_EXIT).contains(&status) {
            return Err(CheckError::Failed {
                program,
                status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let diagnostics = parse_output(&stdout, self.config.max_problems);
        crate::debug_event!("checker", "checked", "{filename}: {} problems", diagnostics.len());
        Ok(diagnostics)
    }
}

fn line_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^.*?:(\d+):(\d+)(?:-(\d+))?: \(([EW])(\d+)\) (.*)$").ok())
        .as_ref()
}

/// Parse plain formatter output, keeping at most `max_problems`.
///
/// Lines and columns are 1-based with an inclusive end column; diagnostics
/// use 0-based positions with an exclusive end.
pub fn parse_output(output: &str, max_problems: usize) -> Vec<Diagnostic> {
    let Some(pattern) = line_pattern() else {
        return Vec::new();
    };
    output
        .lines()
        .filter_map(|line| {
            let caps = pattern.captures(line.trim_end())?;
            let line_no: u32 = caps.get(1)?.as_str().parse().ok()?;
            let column: u32 = caps.get(2)?.as_str().parse().ok()?;
            let end_column: u32 = caps
                .get(3)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(column);
            let severity = match caps.get(4)?.as_str() {
                "E" => Severity::Error,
                _ => Severity::Warning,
            };
            let code = format!("{}{}", caps.get(4)?.as_str(), caps.get(5)?.as_str());
            let line_no = line_no.saturating_sub(1);
            let range = Range::new(line_no, column.saturating_sub(1), line_no, end_column);
            Some(
                Diagnostic::new(range, severity, "luacheck", caps.get(6)?.as_str())
                    .with_code(code),
            )
        })
        .take(max_problems)
        .collect()
}
