//! JIRA API request and response types.
//!
//! Wire types model the JIRA REST API v2 responses; the flattened projections
//! (`IssueSummary`, `SearchPage`, `ProjectSummary`) are what callers see.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The current authenticated user.
///
/// Returned by `GET /rest/api/2/myself`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    /// The username (Server/Data Center) or account ID (Cloud).
    #[serde(default, alias = "accountId")]
    pub name: Option<String>,
    /// The user's display name.
    pub display_name: String,
    /// The user's email address (may be hidden).
    #[serde(default)]
    pub email_address: Option<String>,
}

/// Search result from a JQL query.
///
/// Returned by `GET /rest/api/2/search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// The index of the first result.
    pub start_at: u32,
    /// Maximum results requested.
    #[serde(default)]
    pub max_results: u32,
    /// Total number of matching issues.
    pub total: u32,
    /// The list of issues.
    #[serde(default)]
    pub issues: Vec<Issue>,
}

impl SearchResult {
    /// Check if there are more pages of results.
    pub fn has_more(&self) -> bool {
        !self.issues.is_empty() && self.next_start() < self.total
    }

    /// Get the starting index for the next page.
    pub fn next_start(&self) -> u32 {
        self.start_at + self.issues.len() as u32
    }
}

/// A JIRA issue as returned by search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// The issue ID.
    #[serde(default)]
    pub id: String,
    /// The issue key (e.g., "PROJ-123").
    pub key: String,
    /// The issue fields.
    pub fields: IssueFields,
}

/// The subset of issue fields requested by search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueFields {
    /// The issue summary/title.
    #[serde(default)]
    pub summary: String,
    /// The issue status.
    #[serde(default)]
    pub status: Option<Status>,
    /// The issue assignee.
    #[serde(default)]
    pub assignee: Option<User>,
    /// The issue reporter.
    #[serde(default)]
    pub reporter: Option<User>,
    /// The issue priority.
    #[serde(default)]
    pub priority: Option<Priority>,
}

/// Issue status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub id: String,
    /// The status name (e.g., "To Do", "In Progress", "Done").
    pub name: String,
}

/// Issue priority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Priority {
    #[serde(default)]
    pub id: String,
    pub name: String,
}

/// A JIRA user reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, alias = "accountId")]
    pub name: Option<String>,
    pub display_name: String,
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name)
    }
}

/// A JIRA project.
///
/// Returned by `GET /rest/api/2/project`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// The project ID.
    pub id: String,
    /// The project key (e.g., "PROJ").
    pub key: String,
    /// The project name.
    pub name: String,
}

/// Issue type (Bug, Story, Task, Epic, etc.).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueType {
    /// The issue type ID.
    pub id: String,
    /// The issue type name.
    pub name: String,
    /// Whether this is a subtask type.
    #[serde(default)]
    pub subtask: bool,
    /// The issue type description.
    #[serde(default)]
    pub description: Option<String>,
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// One page of a `createmeta` listing.
///
/// Returned by `GET /rest/api/2/issue/createmeta/{project}/issuetypes[/{id}]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMetaPage<T> {
    #[serde(default)]
    pub start_at: u32,
    #[serde(default)]
    pub total: u32,
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,
}

/// Schema of a create-screen field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSchema {
    /// The value type ("string", "number", "array", "user", "option", ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Element type for array fields.
    #[serde(default)]
    pub items: Option<String>,
}

/// A field available on the create screen of an issue type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMeta {
    /// The field ID used in the create payload (e.g., "customfield_10010").
    pub field_id: String,
    /// The human-readable field name.
    pub name: String,
    #[serde(default)]
    pub required: bool,
    /// Whether JIRA fills the field when it is omitted.
    #[serde(default)]
    pub has_default_value: bool,
    pub schema: FieldSchema,
    /// Values the field accepts, for option-like fields.
    #[serde(default)]
    pub allowed_values: Vec<serde_json::Value>,
}

/// Response of `POST /rest/api/2/issue`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedIssue {
    pub id: String,
    pub key: String,
    #[serde(default, rename = "self")]
    pub self_url: Option<String>,
}

/// The key of an issue, e.g. `PROJ-123`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IssueKey(pub String);

impl IssueKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IssueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A project as shown in selection lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSummary {
    pub id: String,
    pub key: String,
    pub name: String,
}

impl From<Project> for ProjectSummary {
    fn from(project: Project) -> Self {
        Self {
            id: project.id,
            key: project.key,
            name: project.name,
        }
    }
}

impl fmt::Display for ProjectSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.name)
    }
}

/// A read-only, flattened view of a search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueSummary {
    pub key: String,
    pub summary: String,
    pub status: String,
    pub assignee: Option<String>,
    pub priority: Option<String>,
}

impl IssueSummary {
    /// Get the assignee display name, or "Unassigned" if not set.
    pub fn assignee_name(&self) -> &str {
        self.assignee.as_deref().unwrap_or("Unassigned")
    }

    /// Get the priority name, or "None" if not set.
    pub fn priority_name(&self) -> &str {
        self.priority.as_deref().unwrap_or("None")
    }
}

impl From<Issue> for IssueSummary {
    fn from(issue: Issue) -> Self {
        let fields = issue.fields;
        Self {
            key: issue.key,
            summary: fields.summary,
            status: fields
                .status
                .map(|s| s.name)
                .unwrap_or_else(|| "Unknown".to_string()),
            assignee: fields.assignee.map(|u| u.display_name),
            priority: fields.priority.map(|p| p.name),
        }
    }
}

impl fmt::Display for IssueSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.summary)
    }
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPage {
    pub issues: Vec<IssueSummary>,
    pub start_at: u32,
    pub total: u32,
    /// True only for the final page of a result set.
    pub is_last: bool,
}

impl From<SearchResult> for SearchPage {
    fn from(result: SearchResult) -> Self {
        let is_last = !result.has_more();
        Self {
            start_at: result.start_at,
            total: result.total,
            is_last,
            issues: result.issues.into_iter().map(IssueSummary::from).collect(),
        }
    }
}
