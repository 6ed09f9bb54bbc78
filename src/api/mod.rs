//! JIRA API client and types.
//!
//! This module provides the interface for communicating with the JIRA REST API:
//! credential resolution, the authenticated HTTP session, the typed client and
//! JQL search.

pub mod client;
pub mod credentials;
pub mod draft;
pub mod error;
pub mod query;
pub mod session;
pub mod types;

pub use client::JiraClient;
pub use credentials::{CredentialResolver, Credentials, EnvCredentials, KeyringStore, SecretStore};
pub use draft::{FieldValue, IssueDraft};
pub use error::{ApiError, ErrorKind};
pub use query::{build_jql, fetch_all, PageCursor, PageSource, Pages, Scope, SearchFilter};
pub use session::{HttpSession, RetryPolicy};
pub use types::{IssueKey, IssueSummary, ProjectSummary, SearchPage};
