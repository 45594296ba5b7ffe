//! Doctor command - verify system requirements and configuration.

use crate::cli::Output;
use crate::config::Settings;
use crate::tools::{cli_specs, locate_binary, RabbitMqTool, ToolKind};
use console::style;
use std::path::Path;
use std::time::Duration;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub async fn run_doctor(settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    Output::header("infrachat doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let mut checks = Vec::new();

    println!("{}", style("Environment").bold());
    let env_checks = vec![
        check_path(std::env::var("PATH").ok()),
        check_openai_api_key(std::env::var("OPENAI_API_KEY").ok()),
    ];
    print_section(&mut checks, env_checks);

    println!("{}", style("Infrastructure Tools").bold());
    let mut tool_checks = Vec::new();
    for (kind, spec) in cli_specs(&settings.tools) {
        tool_checks.push(check_binary(kind, &spec.binary));
    }
    if settings.tools.rabbitmq.enabled {
        tool_checks.push(check_rabbitmq(settings).await);
    }
    for kind in ToolKind::ALL.iter().filter(|k| !k.is_enabled(&settings.tools)) {
        tool_checks.push(CheckResult::ok(kind.label(), "disabled"));
    }
    print_section(&mut checks, tool_checks);

    println!("{}", style("Configuration").bold());
    print_section(&mut checks, config_checks(settings, config_path));

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before starting infrachat.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!(
            "All checks passed with {} warning(s). Tools with warnings will be unavailable.",
            warnings
        ));
    } else {
        Output::success("All checks passed! infrachat is ready to use.");
    }

    Ok(())
}

fn print_section(all: &mut Vec<CheckResult>, section: Vec<CheckResult>) {
    for check in &section {
        check.print();
    }
    println!();
    all.extend(section);
}

fn check_path(path: Option<String>) -> CheckResult {
    match path {
        Some(p) if !p.trim().is_empty() => {
            let entries = std::env::split_paths(&p).count();
            CheckResult::ok("PATH", &format!("{} entries", entries))
        }
        _ => CheckResult::error(
            "PATH",
            "not set or empty",
            "Tools are located through PATH; export it before starting infrachat",
        ),
    }
}

/// Check if OpenAI API key is configured.
fn check_openai_api_key(key: Option<String>) -> CheckResult {
    match key {
        Some(key) if key.starts_with("sk-") && key.chars().count() > 20 => {
            CheckResult::ok("OPENAI_API_KEY", &format!("configured ({})", mask_key(&key)))
        }
        Some(key) if key.is_empty() => CheckResult::error(
            "OPENAI_API_KEY",
            "empty",
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
        Some(_) => CheckResult::warning(
            "OPENAI_API_KEY",
            "set but format looks unusual",
            "Expected format: sk-... (OpenAI API key)",
        ),
        None => CheckResult::error(
            "OPENAI_API_KEY",
            "not set",
            "Set with: export OPENAI_API_KEY='sk-...' (or add it to .env)",
        ),
    }
}

/// First 7 and last 4 characters of a secret.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let head: String = chars.iter().take(7).collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("{}...{}", head, tail)
}

fn check_binary(kind: ToolKind, binary: &str) -> CheckResult {
    match locate_binary(binary) {
        Some(path) => CheckResult::ok(kind.label(), &format!("{}", path.display())),
        None => CheckResult::warning(
            kind.label(),
            &format!("{} not found in PATH", binary),
            install_hint(kind),
        ),
    }
}

async fn check_rabbitmq(settings: &Settings) -> CheckResult {
    let rmq = &settings.tools.rabbitmq;
    let target = format!("{}:{}", rmq.host, rmq.management_port);
    let timeout = Duration::from_secs(settings.tools.timeout_secs.min(10));

    match RabbitMqTool::connect(rmq, timeout).await {
        Ok(_) => CheckResult::ok(ToolKind::RabbitMq.label(), &format!("reachable at {}", target)),
        Err(e) => CheckResult::warning(
            ToolKind::RabbitMq.label(),
            &format!("management API at {} unreachable: {}", target, e),
            "Check RMQ_HOST, RMQ_MANAGEMENT_PORT, RMQ_USERNAME and RMQ_PASSWORD",
        ),
    }
}

/// Check if config file exists.
/// Checks for the config file in use and the log file it names.
fn config_checks(settings: &Settings, config_path: &Path) -> Vec<CheckResult> {
    let mut checks = vec![check_config_file(config_path)];
    if let Some(log_file) = settings.log_file() {
        checks.push(check_log_file(&log_file));
    }
    checks
}

fn check_config_file(config_path: &Path) -> CheckResult {
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: infrachat config edit",
        )
    }
}

fn check_log_file(log_file: &Path) -> CheckResult {
    match log_file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => CheckResult::warning(
            "Log file",
            &format!("{} (directory will be created)", log_file.display()),
            "The directory is created on startup",
        ),
        _ => CheckResult::ok("Log file", &format!("{}", log_file.display())),
    }
}

/// Install hint for a CLI-backed tool.
fn install_hint(kind: ToolKind) -> &'static str {
    match kind {
        ToolKind::Kubernetes => "Install from: https://kubernetes.io/docs/tasks/tools/",
        ToolKind::Aws => "Install from: https://aws.amazon.com/cli/",
        ToolKind::Redis => "Install redis-cli with your package manager (redis-tools)",
        ToolKind::MongoDb => "Install from: https://www.mongodb.com/try/download/shell",
        ToolKind::MySql => "Install the MySQL client with your package manager",
        ToolKind::MariaDb => "Install the MariaDB client with your package manager",
        ToolKind::Docker => "Install from: https://docs.docker.com/get-docker/",
        ToolKind::Kong => "Install from: https://docs.konghq.com/gateway/latest/install/",
        ToolKind::RabbitMq => "Enable the rabbitmq_management plugin",
    }
}
