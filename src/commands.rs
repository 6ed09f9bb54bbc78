//! Command handlers: thin glue between the CLI and the API layer.

use std::io::{self, BufRead};

use tracing::{debug, info};

use crate::api::{
    CredentialResolver, EnvCredentials, FieldValue, IssueDraft, JiraClient, KeyringStore,
    SearchFilter,
};
use crate::cli::{AuthCommand, Cli, Command, CreateArgs, ListArgs};
use crate::config::{Config, Settings};
use crate::error::{AppError, Result};

/// Run the parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let config = if cli.command.uses_config() {
        Config::load()?
    } else {
        Config::default()
    };
    let verify_ssl = cli.verify_ssl();
    let jira_url = cli.jira_url.as_deref();

    match cli.command {
        Command::Auth { action } => auth(action, jira_url, verify_ssl).await,
        Command::List(args) => {
            let client = connect(jira_url, verify_ssl)?;
            list(&client, args, &config.settings).await
        }
        Command::Create(args) => create(args, jira_url, verify_ssl, &config.settings).await,
        Command::Projects => {
            let client = connect(jira_url, verify_ssl)?;
            for project in client.list_projects().await? {
                println!("{}", project);
            }
            Ok(())
        }
        Command::IssueTypes { project } => {
            let client = connect(jira_url, verify_ssl)?;
            for issue_type in client.list_issue_types(&project.to_uppercase()).await? {
                println!("{:>8}  {}", issue_type.id, issue_type.name);
            }
            Ok(())
        }
    }
}

fn resolver() -> CredentialResolver<KeyringStore> {
    CredentialResolver::new(KeyringStore::new(), EnvCredentials::from_env())
}

/// Resolve credentials once and build the client for this run.
fn connect(jira_url: Option<&str>, verify_ssl: bool) -> Result<JiraClient> {
    let credentials = resolver().resolve(jira_url, verify_ssl)?;
    Ok(JiraClient::new(credentials)?)
}

async fn list(client: &JiraClient, args: ListArgs, settings: &Settings) -> Result<()> {
    let filter = SearchFilter {
        project_key: args
            .project
            .or_else(|| settings.default_project.clone())
            .map(|p| p.to_uppercase()),
        scope: args.scope.map(Into::into).unwrap_or(settings.default_scope),
        status: args.status,
    };
    let page_size = args.page_size.unwrap_or(settings.page_size);
    let limit = args.limit.unwrap_or(usize::MAX);

    let jql = filter.to_jql();
    if jql.is_empty() {
        eprintln!("No filter given; listing every issue you can see.");
    } else {
        eprintln!("JQL: {}", jql);
    }

    let mut pages = client.search_all(&filter, page_size);
    let mut shown = 0;
    let mut total = 0;
    while shown < limit {
        let Some(page) = pages.next_page().await else {
            break;
        };
        let page = page?;
        total = page.total;

        for issue in page.issues.iter().take(limit - shown) {
            println!(
                "{:<12} {:<14} {:<20} {}",
                issue.key,
                issue.status,
                issue.assignee_name(),
                issue.summary
            );
            shown += 1;
        }
    }

    if shown == 0 {
        eprintln!("No issues found matching your criteria.");
    } else {
        eprintln!("Showing {} of {} issue(s).", shown, total);
    }
    Ok(())
}

/// Build the draft described by the `create` arguments.
pub fn draft_from_args(args: &CreateArgs, project: &str) -> Result<IssueDraft> {
    let mut draft = IssueDraft::new(project, &args.issue_type, &args.summary);

    if let Some(description) = &args.description {
        draft = draft.with_field("description", FieldValue::Text(description.clone()));
    }
    for (id, value) in &args.fields {
        draft = draft.with_field(id, FieldValue::Text(value.clone()));
    }
    for (id, value) in &args.numbers {
        let number = value
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| AppError::usage(format!("'{}' is not a number for {}", value, id)))?;
        draft = draft.with_field(id, FieldValue::Number(number));
    }
    for (id, value) in &args.options {
        draft = draft.with_field(id, FieldValue::OptionRef { id: value.clone() });
    }
    for (id, value) in &args.users {
        draft = draft.with_field(id, FieldValue::UserRef { name: value.clone() });
    }
    if !args.labels.is_empty() {
        draft = draft.with_field("labels", FieldValue::Labels(args.labels.clone()));
    }
    if !args.components.is_empty() {
        draft = draft.with_field("components", FieldValue::NamedList(args.components.clone()));
    }

    draft.validate()?;
    Ok(draft)
}

async fn create(
    args: CreateArgs,
    jira_url: Option<&str>,
    verify_ssl: bool,
    settings: &Settings,
) -> Result<()> {
    let project = args
        .project
        .clone()
        .or_else(|| settings.default_project.clone())
        .ok_or_else(|| AppError::usage("a project is required: pass --project"))?;
    let mut draft = draft_from_args(&args, &project)?;

    if args.dry_run {
        let body = serde_json::to_string_pretty(&draft.to_payload())
            .map_err(|e| AppError::usage(format!("could not render request: {}", e)))?;
        println!("{}", body);
        return Ok(());
    }

    let client = connect(jira_url, verify_ssl)?;

    let issue_types = client.list_issue_types(&draft.project_key).await?;
    let issue_type = issue_types
        .iter()
        .find(|t| t.id == draft.issue_type || t.name.eq_ignore_ascii_case(&draft.issue_type))
        .ok_or_else(|| {
            let names: Vec<_> = issue_types.iter().map(|t| t.name.as_str()).collect();
            AppError::usage(format!(
                "issue type '{}' is not available in {}; choose one of: {}",
                draft.issue_type,
                draft.project_key,
                names.join(", ")
            ))
        })?;
    debug!(issue_type_id = %issue_type.id, "Resolved issue type");
    draft.issue_type = issue_type.id.clone();

    let fields = client
        .list_create_fields(&draft.project_key, &issue_type.id)
        .await?;
    let missing = draft.missing_required(&fields);
    if !missing.is_empty() {
        let names: Vec<_> = missing
            .iter()
            .map(|f| format!("{} ({})", f.name, f.field_id))
            .collect();
        return Err(AppError::usage(format!(
            "missing required fields: {}",
            names.join(", ")
        )));
    }

    let key = client.create_issue(&draft).await?;
    println!("Created {}", key);
    println!("{}", client.browse_url(&key));
    Ok(())
}

async fn auth(action: AuthCommand, jira_url: Option<&str>, verify_ssl: bool) -> Result<()> {
    let resolver = resolver();
    match action {
        AuthCommand::Login { token } => {
            let token = match token {
                Some(token) => token,
                None => {
                    eprintln!("Enter JIRA token:");
                    let mut line = String::new();
                    io::stdin().lock().read_line(&mut line)?;
                    line
                }
            };
            resolver.store(jira_url, &token)?;
            println!("Credentials saved to the system credential store.");
        }
        AuthCommand::Logout => {
            resolver.clear()?;
            println!("Stored credentials removed.");
        }
        AuthCommand::Status => {
            let credentials = resolver.resolve(jira_url, verify_ssl)?;
            let client = JiraClient::new(credentials)?;
            let user = client.current_user().await?;
            info!("Credential check succeeded");
            println!("{}: logged in as {}", client.base_url(), user.display_name);
        }
    }
    Ok(())
}
