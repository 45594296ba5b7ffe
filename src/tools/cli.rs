//! Tools backed by an external command-line binary.

use super::Tool;
use crate::error::{InfraError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// How a model-supplied command is turned into process arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    /// Split on whitespace and pass each word as an argument (`kubectl get pods`).
    Split,
    /// Pass fixed flags, then the whole command as one argument (`mysql -e <sql>`).
    Flag(Vec<String>),
}

/// How stdout is returned to the model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Trimmed,
    Raw,
    /// Pretty-print stdout when it parses as JSON, otherwise trim it.
    PrettyJson,
}

/// What a non-zero exit status turns into.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureMode {
    /// Return `"<prefix>: <stderr>"` as the tool result.
    Report(String),
    /// Fail the call with `"<prefix>: <stderr>"`.
    Raise(String),
}

/// Command run once at startup to confirm the binary is usable.
#[derive(Debug, Clone)]
pub struct Probe {
    pub args: Vec<String>,
    /// Text that must appear in stdout (case-insensitive).
    pub expect: Option<String>,
    /// Shown when the probe fails.
    pub hint: String,
}

/// Static description of a CLI-backed tool.
#[derive(Debug, Clone)]
pub struct CliSpec {
    pub name: String,
    pub binary: String,
    pub description: String,
    pub invocation: Invocation,
    /// Leading word dropped from commands (models often repeat the binary name).
    pub strip_prefix: Option<String>,
    pub probe: Option<Probe>,
    pub output: OutputFormat,
    pub failure: FailureMode,
    pub workdir: Option<PathBuf>,
}

impl CliSpec {
    /// Build the argument list for a command.
    pub fn args_for(&self, command: &str) -> Result<Vec<String>> {
        let command = command.trim();
        let command = match &self.strip_prefix {
            Some(prefix) => strip_leading_word(command, prefix),
            None => command,
        };

        if command.is_empty() {
            return Err(InfraError::InvalidInput(format!(
                "Empty command for {}",
                self.name
            )));
        }

        Ok(match &self.invocation {
            Invocation::Split => command.split_whitespace().map(str::to_string).collect(),
            Invocation::Flag(flags) => {
                let mut args = flags.clone();
                args.push(command.to_string());
                args
            }
        })
    }

    fn format_output(&self, stdout: &str) -> String {
        match self.output {
            OutputFormat::Raw => stdout.to_string(),
            OutputFormat::Trimmed => stdout.trim().to_string(),
            OutputFormat::PrettyJson => serde_json::from_str::<serde_json::Value>(stdout)
                .ok()
                .and_then(|v| serde_json::to_string_pretty(&v).ok())
                .unwrap_or_else(|| stdout.trim().to_string()),
        }
    }
}

fn strip_leading_word<'a>(command: &'a str, word: &str) -> &'a str {
    match command.split_once(char::is_whitespace) {
        Some((first, rest)) if first.eq_ignore_ascii_case(word) => rest.trim_start(),
        None if command.eq_ignore_ascii_case(word) => "",
        _ => command,
    }
}

/// A tool that shells out to a located binary.
#[derive(Debug)]
pub struct CliTool {
    spec: CliSpec,
    program: PathBuf,
    timeout: Duration,
}

impl CliTool {
    /// Locate the binary and run the probe, if any.
    pub async fn new(spec: CliSpec, timeout: Duration) -> Result<Self> {
        info!("Initializing {}", spec.name);

        let program = locate_binary(&spec.binary)
            .ok_or_else(|| InfraError::ToolNotFound(spec.binary.clone()))?;
        info!("{} found at: {}", spec.binary, program.display());

        let tool = Self {
            spec,
            program,
            timeout,
        };

        if let Some(probe) = tool.spec.probe.clone() {
            tool.run_probe(&probe).await?;
        }

        Ok(tool)
    }

    async fn run_probe(&self, probe: &Probe) -> Result<()> {
        let output = self.run(&probe.args).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(InfraError::ToolFailed(format!(
                "{} is not working: {}. {}",
                self.spec.binary,
                stderr.trim(),
                probe.hint
            )));
        }

        if let Some(expect) = &probe.expect {
            if !stdout.to_lowercase().contains(&expect.to_lowercase()) {
                return Err(InfraError::ToolFailed(format!(
                    "{} is not configured. {}",
                    self.spec.binary, probe.hint
                )));
            }
        }

        debug!("{} probe output: {}", self.spec.binary, stdout.trim());
        Ok(())
    }

    async fn run(&self, args: &[String]) -> Result<Output> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.spec.workdir {
            cmd.current_dir(dir);
        }

        match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(InfraError::ToolNotFound(self.spec.binary.clone()))
            }
            Ok(Err(e)) => Err(InfraError::ToolFailed(format!(
                "{} execution failed: {}",
                self.spec.binary, e
            ))),
            Err(_) => Err(InfraError::ToolTimeout {
                command: format!("{} {}", self.spec.binary, args.join(" ")),
                seconds: self.timeout.as_secs(),
            }),
        }
    }
}

#[async_trait]
impl Tool for CliTool {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn description(&self) -> &str {
        &self.spec.description
    }

    #[instrument(skip(self), fields(tool = %self.spec.name))]
    async fn execute(&self, command: &str) -> Result<String> {
        let args = self.spec.args_for(command)?;
        info!("Command input: {}", command);

        let output = self.run(&args).await?;

        if output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            debug!("Command output: {}", stdout.trim());
            return Ok(self.spec.format_output(&stdout));
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!("Command failed ({}): {}", output.status, stderr.trim());

        match &self.spec.failure {
            FailureMode::Report(prefix) => Ok(format!("{}: {}", prefix, stderr.trim())),
            FailureMode::Raise(prefix) => Err(InfraError::ToolFailed(format!(
                "{}: {}",
                prefix,
                stderr.trim()
            ))),
        }
    }
}

/// Find an executable by name on `PATH`, or check an explicit path.
pub fn locate_binary(binary: &str) -> Option<PathBuf> {
    let candidate = Path::new(binary);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }

    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .flat_map(|dir| executable_names(binary).into_iter().map(move |n| dir.join(n)))
        .find(|p| is_executable(p))
}

fn executable_names(binary: &str) -> Vec<String> {
    if cfg!(windows) {
        vec![format!("{}.exe", binary), format!("{}.cmd", binary), binary.to_string()]
    } else {
        vec![binary.to_string()]
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn spec(binary: &str, invocation: Invocation) -> CliSpec {
        CliSpec {
            name: "Test Tool".to_string(),
            binary: binary.to_string(),
            description: "Runs test commands.".to_string(),
            invocation,
            strip_prefix: None,
            probe: None,
            output: OutputFormat::Trimmed,
            failure: FailureMode::Report("Error executing test command".to_string()),
            workdir: None,
        }
    }

    fn shell() -> CliSpec {
        spec("sh", Invocation::Flag(vec!["-c".to_string()]))
    }

    #[test]
    fn test_args_split() {
        let s = spec("kubectl", Invocation::Split);
        assert_eq!(
            s.args_for("  get pods   -n kube-system ").unwrap(),
            vec!["get", "pods", "-n", "kube-system"]
        );
    }

    #[test]
    fn test_args_flag_keeps_command_whole() {
        let s = spec("mysql", Invocation::Flag(vec!["-e".to_string()]));
        assert_eq!(
            s.args_for("SELECT * FROM users WHERE name = 'a b'").unwrap(),
            vec!["-e", "SELECT * FROM users WHERE name = 'a b'"]
        );
    }

    #[test]
    fn test_strip_prefix() {
        let mut s = spec("kong", Invocation::Split);
        s.strip_prefix = Some("kong".to_string());
        assert_eq!(s.args_for("KONG routes list").unwrap(), vec!["routes", "list"]);
        assert_eq!(s.args_for("routes list").unwrap(), vec!["routes", "list"]);
        assert_eq!(s.args_for("kongctl x").unwrap(), vec!["kongctl", "x"]);
        assert!(s.args_for("kong").is_err());
    }

    #[test]
    fn test_empty_command_rejected() {
        let s = spec("redis-cli", Invocation::Split);
        assert!(matches!(s.args_for("   "), Err(InfraError::InvalidInput(_))));
    }

    #[test]
    fn test_pretty_json_output() {
        let mut s = spec("redis-cli", Invocation::Split);
        s.output = OutputFormat::PrettyJson;
        assert_eq!(s.format_output("{\"a\":1}\n"), "{\n  \"a\": 1\n}");
        assert_eq!(s.format_output("PONG\n"), "PONG");
    }

    #[test]
    fn test_locate_binary() {
        assert!(locate_binary("sh").is_some());
        assert!(locate_binary("definitely-not-a-real-binary-name").is_none());
        assert!(locate_binary("/definitely/not/here").is_none());
    }

    #[tokio::test]
    async fn test_missing_binary_fails_init() {
        let result = CliTool::new(
            spec("definitely-not-a-real-binary-name", Invocation::Split),
            Duration::from_secs(5),
        )
        .await;
        assert!(matches!(result, Err(InfraError::ToolNotFound(_))));
    }

    #[tokio::test]
    async fn test_execute_success() {
        let tool = CliTool::new(shell(), Duration::from_secs(5)).await.unwrap();
        let out = tool.execute("echo '  hello world  '").await.unwrap();
        assert_eq!(out, "hello world");
    }

    #[tokio::test]
    async fn test_split_invocation_runs_binary() {
        let mut s = spec("echo", Invocation::Split);
        s.strip_prefix = Some("aws".to_string());
        let tool = CliTool::new(s, Duration::from_secs(5)).await.unwrap();
        assert_eq!(tool.execute("aws s3   ls").await.unwrap(), "s3 ls");
    }

    #[tokio::test]
    async fn test_failure_is_reported() {
        let tool = CliTool::new(shell(), Duration::from_secs(5)).await.unwrap();
        let out = tool.execute("echo 'no such pod' >&2; exit 3").await.unwrap();
        assert_eq!(out, "Error executing test command: no such pod");
    }

    #[tokio::test]
    async fn test_failure_is_raised() {
        let mut s = shell();
        s.failure = FailureMode::Raise("Docker command failed".to_string());
        let tool = CliTool::new(s, Duration::from_secs(5)).await.unwrap();
        let err = tool.execute("echo 'daemon down' >&2; exit 1").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "External tool failed: Docker command failed: daemon down"
        );
    }

    #[tokio::test]
    async fn test_timeout() {
        let tool = CliTool::new(shell(), Duration::from_millis(200)).await.unwrap();
        let result = tool.execute("sleep 5").await;
        assert!(matches!(result, Err(InfraError::ToolTimeout { .. })));
    }

    #[tokio::test]
    async fn test_workdir() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = shell();
        s.workdir = Some(dir.path().to_path_buf());
        let tool = CliTool::new(s, Duration::from_secs(5)).await.unwrap();
        std::fs::write(dir.path().join("marker.txt"), "x").unwrap();
        assert_eq!(tool.execute("ls").await.unwrap(), "marker.txt");
    }

    #[tokio::test]
    async fn test_probe() {
        let mut s = shell();
        s.probe = Some(Probe {
            args: vec!["-c".to_string(), "echo 'ACCESS_KEY ****'".to_string()],
            expect: Some("access_key".to_string()),
            hint: "Run configure".to_string(),
        });
        assert_ok!(CliTool::new(s.clone(), Duration::from_secs(5)).await);

        s.probe = Some(Probe {
            args: vec!["-c".to_string(), "echo nothing".to_string()],
            expect: Some("access_key".to_string()),
            hint: "Run configure".to_string(),
        });
        assert_err!(CliTool::new(s.clone(), Duration::from_secs(5)).await);

        s.probe = Some(Probe {
            args: vec!["-c".to_string(), "exit 1".to_string()],
            expect: None,
            hint: "Reinstall".to_string(),
        });
        assert_err!(CliTool::new(s, Duration::from_secs(5)).await);
    }
}
