//! JIRA API client implementation.
//!
//! This module provides the client for the JIRA REST API v2 calls used by the
//! CLI: project and issue-type metadata, issue creation and JQL search. All
//! HTTP concerns (auth, TLS, timeouts, retries) live in [`HttpSession`].

use reqwest::Method;
use tracing::{debug, info, instrument, warn};

use super::credentials::Credentials;
use super::draft::{IssueDraft, SYSTEM_FIELDS};
use super::error::{ApiError, ErrorKind, Result};
use super::query::{self, PageCursor, PageSource, Pages, SearchFilter};
use super::session::HttpSession;
use super::types::{
    CreateMetaPage, CreatedIssue, CurrentUser, FieldMeta, IssueKey, IssueType, Project,
    ProjectSummary, SearchPage, SearchResult,
};

/// Fields requested for each search hit.
const SEARCH_FIELDS: &str = "summary,status,assignee,reporter,priority";

/// The JIRA API client.
#[derive(Debug)]
pub struct JiraClient {
    session: HttpSession,
}

impl JiraClient {
    /// Create a client for the given credentials with the default session
    /// settings.
    ///
    /// Does NOT validate the connection; see [`JiraClient::current_user`].
    pub fn new(credentials: Credentials) -> Result<Self> {
        Ok(Self::with_session(HttpSession::new(credentials)?))
    }

    /// Create a client on top of an existing session.
    pub fn with_session(session: HttpSession) -> Self {
        Self { session }
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        self.session.base_url()
    }

    /// The web URL of an issue.
    pub fn browse_url(&self, key: &IssueKey) -> String {
        format!("{}/browse/{}", self.base_url(), key)
    }

    /// Get the current authenticated user.
    ///
    /// Calls `GET /rest/api/2/myself`; useful to check that the credentials work.
    #[instrument(skip(self))]
    pub async fn current_user(&self) -> Result<CurrentUser> {
        let user: CurrentUser = self.session.get_json("rest/api/2/myself", &[]).await?;
        info!("Connected as user: {}", user.display_name);
        Ok(user)
    }

    /// List the projects visible to the caller.
    #[instrument(skip(self))]
    pub async fn list_projects(&self) -> Result<Vec<ProjectSummary>> {
        let projects: Vec<Project> = self.session.get_json("rest/api/2/project", &[]).await?;
        debug!("Fetched {} projects", projects.len());
        Ok(projects.into_iter().map(ProjectSummary::from).collect())
    }

    /// List the issue types that can be created in a project.
    ///
    /// Subtask types are left out, since they need a parent issue.
    #[instrument(skip(self))]
    pub async fn list_issue_types(&self, project_key: &str) -> Result<Vec<IssueType>> {
        let path = format!(
            "rest/api/2/issue/createmeta/{}/issuetypes",
            urlencoding::encode(project_key)
        );
        let page: CreateMetaPage<IssueType> =
            self.session.get_json(&path, &[]).await.map_err(|e| {
                if matches!(e, ApiError::NotFound(_)) {
                    ApiError::NotFound(format!("project '{}'", project_key))
                } else {
                    e
                }
            })?;

        Ok(page.values.into_iter().filter(|t| !t.subtask).collect())
    }

    /// List the fields on the create screen of an issue type.
    ///
    /// Fields JIRA manages itself (reporter, status, ...) are dropped.
    #[instrument(skip(self))]
    pub async fn list_create_fields(
        &self,
        project_key: &str,
        issue_type_id: &str,
    ) -> Result<Vec<FieldMeta>> {
        let path = format!(
            "rest/api/2/issue/createmeta/{}/issuetypes/{}",
            urlencoding::encode(project_key),
            urlencoding::encode(issue_type_id)
        );
        let page: CreateMetaPage<FieldMeta> = self.session.get_json(&path, &[]).await?;

        Ok(page
            .values
            .into_iter()
            .filter(|f| !SYSTEM_FIELDS.contains(&f.field_id.as_str()))
            .collect())
    }

    /// Create an issue.
    ///
    /// This is not idempotent and is never retried: sending the same draft
    /// twice creates two issues. After a network failure the issue may or may
    /// not exist, so callers must check before trying again.
    #[instrument(skip(self, draft), fields(project = %draft.project_key, issue_type = %draft.issue_type))]
    pub async fn create_issue(&self, draft: &IssueDraft) -> Result<IssueKey> {
        draft.validate()?;

        let payload = draft.to_payload();
        let created: CreatedIssue = self
            .session
            .post_json("rest/api/2/issue", &payload)
            .await
            .map_err(|e| {
                if e.kind() == ErrorKind::Network {
                    warn!(
                        "Issue creation failed in transit; the issue may already exist in {}",
                        draft.project_key
                    );
                }
                e
            })?;

        info!("Created issue {}", created.key);
        Ok(IssueKey(created.key))
    }

    /// Run one page of a search.
    ///
    /// Without a cursor the first page of [`query::MAX_PAGE_SIZE`] issues is
    /// returned.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        filter: &SearchFilter,
        page: Option<PageCursor>,
    ) -> Result<SearchPage> {
        let cursor = page.unwrap_or_else(|| PageCursor::first(query::MAX_PAGE_SIZE));
        self.search_jql(&filter.to_jql(), cursor).await
    }

    /// Page through every issue matching `filter`.
    pub fn search_all(&self, filter: &SearchFilter, page_size: u32) -> Pages<'_, Self> {
        query::fetch_all(self, &filter.to_jql(), page_size)
    }

    async fn search_jql(&self, jql: &str, cursor: PageCursor) -> Result<SearchPage> {
        debug!(
            "Searching issues: startAt={}, maxResults={}",
            cursor.start_at(), cursor.page_size()
        );

        let params = [
            ("jql", jql.to_string()),
            ("startAt", cursor.start_at().to_string()),
            ("maxResults", cursor.page_size().to_string()),
            ("fields", SEARCH_FIELDS.to_string()),
        ];
        let result: SearchResult = self
            .session
            .request(Method::GET, "rest/api/2/search", &params, None)
            .await?
            .json()?;

        debug!("Found {} issues (total: {})", result.issues.len(), result.total);
        Ok(SearchPage::from(result))
    }
}

impl PageSource for JiraClient {
    async fn fetch_page(&self, jql: &str, cursor: PageCursor) -> Result<SearchPage> {
        self.search_jql(jql, cursor).await
    }
}
