//! The built-in infrastructure tools.

use super::cli::{CliSpec, FailureMode, Invocation, OutputFormat, Probe};
use crate::config::{CliToolSettings, ToolsSettings};

/// Every infrastructure integration, in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Kubernetes,
    Aws,
    RabbitMq,
    Redis,
    MongoDb,
    MySql,
    MariaDb,
    Docker,
    Kong,
}

impl ToolKind {
    pub const ALL: [ToolKind; 9] = [
        ToolKind::Kubernetes,
        ToolKind::Aws,
        ToolKind::RabbitMq,
        ToolKind::Redis,
        ToolKind::MongoDb,
        ToolKind::MySql,
        ToolKind::MariaDb,
        ToolKind::Docker,
        ToolKind::Kong,
    ];

    /// Human-readable label used in logs and diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            ToolKind::Kubernetes => "Kubernetes",
            ToolKind::Aws => "AWS",
            ToolKind::RabbitMq => "RabbitMQ",
            ToolKind::Redis => "Redis",
            ToolKind::MongoDb => "MongoDB",
            ToolKind::MySql => "MySQL",
            ToolKind::MariaDb => "MariaDB",
            ToolKind::Docker => "Docker",
            ToolKind::Kong => "Kong Gateway",
        }
    }

    /// Default binary for CLI-backed tools; `None` for HTTP-backed ones.
    pub fn default_binary(&self) -> Option<&'static str> {
        match self {
            ToolKind::Kubernetes => Some("kubectl"),
            ToolKind::Aws => Some("aws"),
            ToolKind::Redis => Some("redis-cli"),
            ToolKind::MongoDb => Some("mongosh"),
            ToolKind::MySql => Some("mysql"),
            ToolKind::MariaDb => Some("mariadb"),
            ToolKind::Docker => Some("docker"),
            ToolKind::Kong => Some("kong"),
            ToolKind::RabbitMq => None,
        }
    }

    /// Settings for CLI-backed tools.
    pub fn cli_settings<'a>(&self, tools: &'a ToolsSettings) -> Option<&'a CliToolSettings> {
        match self {
            ToolKind::Kubernetes => Some(&tools.kubernetes),
            ToolKind::Aws => Some(&tools.aws),
            ToolKind::Redis => Some(&tools.redis),
            ToolKind::MongoDb => Some(&tools.mongodb),
            ToolKind::MySql => Some(&tools.mysql),
            ToolKind::MariaDb => Some(&tools.mariadb),
            ToolKind::Docker => Some(&tools.docker),
            ToolKind::Kong => Some(&tools.kong),
            ToolKind::RabbitMq => None,
        }
    }

    pub fn is_enabled(&self, tools: &ToolsSettings) -> bool {
        match self.cli_settings(tools) {
            Some(cli) => cli.enabled,
            None => tools.rabbitmq.enabled,
        }
    }

    /// Binary to look up, honoring a configured override.
    pub fn binary(&self, tools: &ToolsSettings) -> Option<String> {
        let default = self.default_binary()?;
        let configured = self
            .cli_settings(tools)
            .and_then(|s| s.binary.clone())
            .filter(|b| !b.is_empty());
        Some(configured.unwrap_or_else(|| default.to_string()))
    }

    /// Full spec for CLI-backed tools.
    pub fn cli_spec(&self, tools: &ToolsSettings) -> Option<CliSpec> {
        let binary = self.binary(tools)?;
        let spec = match self {
            ToolKind::Kubernetes => CliSpec {
                name: "Kubernetes Tool".to_string(),
                description: "Executes kubectl commands to manage Kubernetes clusters. It can run any \
                    kubectl command. Example commands: get nodes, get pods, get services, \
                    describe pod [name], get deployments"
                    .to_string(),
                invocation: Invocation::Split,
                strip_prefix: Some("kubectl".to_string()),
                probe: None,
                output: OutputFormat::Trimmed,
                failure: FailureMode::Report("Error executing kubectl command".to_string()),
                workdir: None,
                binary,
            },
            ToolKind::Aws => CliSpec {
                name: "AWS Services Tool".to_string(),
                description: "Use this tool to manage AWS services and resources. This tool executes \
                    AWS CLI commands. Common commands: ec2 describe-vpcs, ec2 describe-vpc-endpoints, \
                    ec2 describe-instances, ec2 describe-security-groups, s3 ls, s3 ls s3://[bucket-name], \
                    eks list-clusters, eks describe-cluster --name [cluster-name]. \
                    The tool will execute any valid AWS CLI command and return the results."
                    .to_string(),
                invocation: Invocation::Split,
                strip_prefix: Some("aws".to_string()),
                probe: Some(Probe {
                    args: vec!["configure".to_string(), "list".to_string()],
                    expect: Some("access_key".to_string()),
                    hint: "Run 'aws configure' to set up your credentials.".to_string(),
                }),
                output: OutputFormat::Trimmed,
                failure: FailureMode::Report("Error: AWS CLI command failed".to_string()),
                workdir: dirs::home_dir(),
                binary,
            },
            ToolKind::Redis => CliSpec {
                name: "Redis Tool".to_string(),
                description: "Executes redis-cli commands to manage Redis servers. Common commands: \
                    info, keys *, get [key], set [key] [value]"
                    .to_string(),
                invocation: Invocation::Split,
                strip_prefix: Some("redis-cli".to_string()),
                probe: None,
                output: OutputFormat::PrettyJson,
                failure: FailureMode::Report("Error executing redis-cli command".to_string()),
                workdir: None,
                binary,
            },
            ToolKind::MongoDb => CliSpec {
                name: "MongoDB Tool".to_string(),
                description: "Executes mongosh commands to manage MongoDB databases. Common commands: \
                    show dbs, use [db], show collections, db.[collection].find(). \
                    The tool will execute any valid mongosh command and return the results."
                    .to_string(),
                invocation: Invocation::Flag(vec!["--quiet".to_string(), "--eval".to_string()]),
                strip_prefix: None,
                probe: None,
                output: OutputFormat::Trimmed,
                failure: FailureMode::Report("Error executing mongosh command".to_string()),
                workdir: None,
                binary,
            },
            ToolKind::MySql => CliSpec {
                name: "MySQL Tool".to_string(),
                description: "Executes MySQL CLI commands to manage MySQL databases. Common commands: \
                    SHOW DATABASES, USE [db], SHOW TABLES, SELECT * FROM [table]. \
                    The tool will execute any valid MySQL CLI command and return the results."
                    .to_string(),
                invocation: Invocation::Flag(vec!["-e".to_string()]),
                strip_prefix: None,
                probe: None,
                output: OutputFormat::Trimmed,
                failure: FailureMode::Report("Error executing MySQL command".to_string()),
                workdir: None,
                binary,
            },
            ToolKind::MariaDb => CliSpec {
                name: "MariaDB Tool".to_string(),
                description: "Executes MariaDB CLI commands to manage MariaDB databases. Common commands: \
                    SHOW DATABASES, USE [db], SHOW TABLES, SELECT * FROM [table]"
                    .to_string(),
                invocation: Invocation::Flag(vec!["-e".to_string()]),
                strip_prefix: None,
                probe: None,
                output: OutputFormat::Trimmed,
                failure: FailureMode::Report("Error executing MariaDB command".to_string()),
                workdir: None,
                binary,
            },
            ToolKind::Docker => CliSpec {
                name: "Docker Tool".to_string(),
                description: "Executes Docker commands. Examples: 'ps', 'logs mariadb', 'inspect mariadb'"
                    .to_string(),
                invocation: Invocation::Split,
                strip_prefix: Some("docker".to_string()),
                probe: None,
                output: OutputFormat::Raw,
                failure: FailureMode::Raise("Docker command failed".to_string()),
                workdir: None,
                binary,
            },
            ToolKind::Kong => CliSpec {
                name: "Kong Gateway Tool".to_string(),
                description: "Executes `kong` CLI commands to manage a self-managed Kong Gateway \
                    installation. Examples: 'kong routes list', 'kong services list', \
                    'kong consumers create --username user1'. Use this tool for any administrative \
                    or configuration tasks in Kong."
                    .to_string(),
                invocation: Invocation::Split,
                strip_prefix: Some("kong".to_string()),
                probe: Some(Probe {
                    args: vec!["version".to_string()],
                    expect: None,
                    hint: "Check the Kong installation.".to_string(),
                }),
                output: OutputFormat::Trimmed,
                failure: FailureMode::Report("Error executing kong command".to_string()),
                workdir: None,
                binary,
            },
            ToolKind::RabbitMq => return None,
        };
        Some(spec)
    }
}

/// Specs for every enabled CLI-backed tool.
pub fn cli_specs(tools: &ToolsSettings) -> Vec<(ToolKind, CliSpec)> {
    ToolKind::ALL
        .iter()
        .filter(|kind| kind.is_enabled(tools))
        .filter_map(|kind| kind.cli_spec(tools).map(|spec| (*kind, spec)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_cli_tools_enabled_by_default() {
        let specs = cli_specs(&ToolsSettings::default());
        assert_eq!(specs.len(), 8);
        assert!(specs.iter().all(|(kind, _)| *kind != ToolKind::RabbitMq));
    }

    #[test]
    fn test_disabled_tools_are_skipped() {
        let mut tools = ToolsSettings::default();
        tools.mysql.enabled = false;
        tools.docker.enabled = false;
        let specs = cli_specs(&tools);
        assert_eq!(specs.len(), 6);
        assert!(!specs.iter().any(|(kind, _)| *kind == ToolKind::MySql));
    }

    #[test]
    fn test_binary_override() {
        let mut tools = ToolsSettings::default();
        tools.kubernetes.binary = Some("/usr/local/bin/kubectl-1.30".to_string());
        assert_eq!(
            ToolKind::Kubernetes.binary(&tools).as_deref(),
            Some("/usr/local/bin/kubectl-1.30")
        );
        assert_eq!(ToolKind::Redis.binary(&tools).as_deref(), Some("redis-cli"));
        assert!(ToolKind::RabbitMq.binary(&tools).is_none());
    }

    #[test]
    fn test_mongo_evaluates_whole_command() {
        let spec = ToolKind::MongoDb.cli_spec(&ToolsSettings::default()).unwrap();
        assert_eq!(
            spec.args_for("db.users.find({ active: true })").unwrap(),
            vec!["--quiet", "--eval", "db.users.find({ active: true })"]
        );
    }

    #[test]
    fn test_aws_strips_binary_name() {
        let spec = ToolKind::Aws.cli_spec(&ToolsSettings::default()).unwrap();
        assert_eq!(spec.args_for("aws s3 ls").unwrap(), vec!["s3", "ls"]);
    }
}
