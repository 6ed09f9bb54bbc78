//! Command-line interface definition.

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::api::Scope;

/// Create and search JIRA issues from the terminal.
#[derive(Debug, Parser)]
#[command(name = "jira", version, about)]
pub struct Cli {
    /// Print request/response diagnostics to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    /// Disable SSL certificate verification
    #[arg(long = "no-verify-ssl", global = true)]
    pub no_verify_ssl: bool,

    /// JIRA instance URL (overrides the stored URL and JIRA_URL)
    #[arg(long = "jira-url", global = true, value_name = "URL")]
    pub jira_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn verify_ssl(&self) -> bool {
        !self.no_verify_ssl
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search issues with a structured filter
    List(ListArgs),
    /// Create an issue
    Create(CreateArgs),
    /// List the projects you can see
    Projects,
    /// List the issue types that can be created in a project
    IssueTypes {
        /// Project key
        project: String,
    },
    /// Manage stored credentials
    Auth {
        #[command(subcommand)]
        action: AuthCommand,
    },
}

impl Command {
    /// Whether the command reads `config.toml`.
    ///
    /// Only `list` and `create` have configurable defaults; everything else
    /// must keep working when the file is broken.
    pub fn uses_config(&self) -> bool {
        matches!(self, Command::List(_) | Command::Create(_))
    }
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Project key to search in
    #[arg(short, long)]
    pub project: Option<String>,

    /// Restrict to issues assigned to or reported by you
    #[arg(short, long, value_enum)]
    pub scope: Option<ScopeArg>,

    /// Status name to filter by
    #[arg(long)]
    pub status: Option<String>,

    /// Issues fetched per request
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Stop after this many issues
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScopeArg {
    Assigned,
    Reported,
    All,
}

impl From<ScopeArg> for Scope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Assigned => Scope::MineAssigned,
            ScopeArg::Reported => Scope::MineReported,
            ScopeArg::All => Scope::All,
        }
    }
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Project key
    #[arg(short, long)]
    pub project: Option<String>,

    /// Issue type name or id
    #[arg(short = 't', long = "type")]
    pub issue_type: String,

    /// Issue summary
    #[arg(short, long)]
    pub summary: String,

    /// Issue description
    #[arg(short, long)]
    pub description: Option<String>,

    /// Text field, as FIELD_ID=VALUE
    #[arg(long = "field", value_parser = parse_key_value)]
    pub fields: Vec<(String, String)>,

    /// Numeric field, as FIELD_ID=NUMBER
    #[arg(long = "number", value_parser = parse_key_value)]
    pub numbers: Vec<(String, String)>,

    /// Option field by allowed-value id, as FIELD_ID=ID
    #[arg(long = "option", value_parser = parse_key_value)]
    pub options: Vec<(String, String)>,

    /// User field by username, as FIELD_ID=USERNAME
    #[arg(long = "user", value_parser = parse_key_value)]
    pub users: Vec<(String, String)>,

    /// Comma-separated labels
    #[arg(long, value_delimiter = ',')]
    pub labels: Vec<String>,

    /// Comma-separated component names
    #[arg(long, value_delimiter = ',')]
    pub components: Vec<String>,

    /// Print the request body instead of creating the issue
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Save a token (and optionally the --jira-url) in the system credential store
    Login {
        /// Token to store; read from stdin when omitted
        #[arg(long)]
        token: Option<String>,
    },
    /// Remove stored credentials
    Logout,
    /// Check that the resolved credentials work
    Status,
}

/// Parse `KEY=VALUE`.
pub fn parse_key_value(input: &str) -> Result<(String, String), String> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{}'", input))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing field name in '{}'", input));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("customfield_10010 = 42").unwrap(),
            ("customfield_10010".to_string(), "42".to_string())
        );
        assert_eq!(
            parse_key_value("environment=a=b").unwrap(),
            ("environment".to_string(), "a=b".to_string())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "jira",
            "list",
            "--project",
            "PROJ",
            "--scope",
            "assigned",
            "--no-verify-ssl",
            "--jira-url",
            "https://jira.example.com",
        ])
        .unwrap();

        assert!(!cli.verify_ssl());
        assert_eq!(cli.jira_url.as_deref(), Some("https://jira.example.com"));
        match cli.command {
            Command::List(args) => {
                assert_eq!(args.project.as_deref(), Some("PROJ"));
                assert_eq!(args.scope.map(Scope::from), Some(Scope::MineAssigned));
            }
            other => panic!("Expected list command, got {:?}", other),
        }
    }

    #[test]
    fn test_only_list_and_create_read_config() {
        let parse = |argv: &[&str]| Cli::try_parse_from(argv).unwrap().command;

        assert!(parse(&["jira", "list"]).uses_config());
        assert!(parse(&["jira", "create", "-t", "Bug", "-s", "x"]).uses_config());
        assert!(!parse(&["jira", "auth", "login", "--token", "abcdefghijkl"]).uses_config());
        assert!(!parse(&["jira", "auth", "logout"]).uses_config());
        assert!(!parse(&["jira", "auth", "status"]).uses_config());
        assert!(!parse(&["jira", "projects"]).uses_config());
        assert!(!parse(&["jira", "issue-types", "PROJ"]).uses_config());
    }

    #[test]
    fn test_create_args() {
        let cli = Cli::try_parse_from([
            "jira",
            "create",
            "-p",
            "PROJ",
            "-t",
            "Bug",
            "-s",
            "Crash",
            "--option",
            "priority=2",
            "--labels",
            "ui,backend",
        ])
        .unwrap();

        match cli.command {
            Command::Create(args) => {
                assert_eq!(args.issue_type, "Bug");
                assert_eq!(args.options, vec![("priority".to_string(), "2".to_string())]);
                assert_eq!(args.labels, vec!["ui".to_string(), "backend".to_string()]);
                assert!(!args.dry_run);
            }
            other => panic!("Expected create command, got {:?}", other),
        }
    }
}
