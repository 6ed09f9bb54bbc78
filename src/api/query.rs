//! JQL construction and paginated search.
//!
//! [`build_jql`] turns a [`SearchFilter`] into a deterministic JQL string.
//! [`fetch_all`] walks the result set page by page through a [`PageSource`];
//! the returned [`Pages`] cursor only requests a page when asked for it, so a
//! consumer can stop early without triggering further requests.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::Result;
use super::types::SearchPage;

/// Largest page JIRA will return from the search endpoint.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Whose issues to search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    /// Issues assigned to the caller.
    MineAssigned,
    /// Issues reported by the caller.
    MineReported,
    /// No user restriction.
    #[default]
    All,
}

/// Structured search criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    pub project_key: Option<String>,
    pub scope: Scope,
    pub status: Option<String>,
}

impl SearchFilter {
    /// The JQL expression for this filter.
    pub fn to_jql(&self) -> String {
        build_jql(self)
    }
}

/// Build a JQL string from `filter`.
///
/// Clauses are emitted in a fixed order (project, scope, status) and joined
/// with ` AND `. An empty filter yields the empty string, which JIRA treats as
/// "every issue visible to the caller". Embedded double quotes are doubled;
/// values are otherwise passed through unchecked.
pub fn build_jql(filter: &SearchFilter) -> String {
    let mut clauses = Vec::with_capacity(3);

    if let Some(project) = populated(&filter.project_key) {
        clauses.push(format!("project = {}", quote(project)));
    }

    match filter.scope {
        Scope::MineAssigned => clauses.push("assignee = currentUser()".to_string()),
        Scope::MineReported => clauses.push("reporter = currentUser()".to_string()),
        Scope::All => {}
    }

    if let Some(status) = populated(&filter.status) {
        clauses.push(format!("status = {}", quote(status)));
    }

    clauses.join(" AND ")
}

fn populated(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Position of a page within a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    start_at: u32,
    page_size: u32,
}

impl PageCursor {
    pub fn new(start_at: u32, page_size: u32) -> Self {
        Self {
            start_at,
            page_size: clamp_page_size(page_size),
        }
    }

    /// The first page of the given size.
    pub fn first(page_size: u32) -> Self {
        Self::new(0, page_size)
    }

    /// Offset of the first issue on this page.
    pub fn start_at(&self) -> u32 {
        self.start_at
    }

    /// Issues requested per page, always within 1..=[`MAX_PAGE_SIZE`].
    pub fn page_size(&self) -> u32 {
        self.page_size
    }
}

/// Clamp a requested page size to what the search endpoint accepts.
pub fn clamp_page_size(page_size: u32) -> u32 {
    page_size.clamp(1, MAX_PAGE_SIZE)
}

/// Something that can fetch one page of search results.
pub trait PageSource {
    fn fetch_page(
        &self,
        jql: &str,
        cursor: PageCursor,
    ) -> impl Future<Output = Result<SearchPage>>;
}

/// Start a paginated search for `jql`.
///
/// No request is made until [`Pages::next_page`] is awaited. Calling this again
/// with the same arguments restarts the search from the first page.
pub fn fetch_all<'a, S: PageSource>(source: &'a S, jql: &str, page_size: u32) -> Pages<'a, S> {
    Pages {
        source,
        jql: jql.to_string(),
        next: Some(PageCursor::first(page_size)),
    }
}

/// A lazy, finite cursor over the pages of one search.
#[derive(Debug)]
pub struct Pages<'a, S> {
    source: &'a S,
    jql: String,
    next: Option<PageCursor>,
}

impl<'a, S: PageSource> Pages<'a, S> {
    /// Fetch the next page, or `None` once the result set is exhausted.
    ///
    /// After an error the cursor is finished; restart with [`fetch_all`].
    pub async fn next_page(&mut self) -> Option<Result<SearchPage>> {
        let cursor = self.next.take()?;
        debug!(
            start_at = cursor.start_at,
            page_size = cursor.page_size,
            "Fetching search page"
        );

        let mut page = match self.source.fetch_page(&self.jql, cursor).await {
            Ok(page) => page,
            Err(e) => return Some(Err(e)),
        };

        let next_start = cursor.start_at + page.issues.len() as u32;
        page.is_last = page.issues.is_empty() || next_start >= page.total;
        if !page.is_last {
            self.next = Some(PageCursor::new(next_start, cursor.page_size));
        }

        Some(Ok(page))
    }

    /// Drain the remaining pages, stopping at the first error.
    pub async fn collect_all(mut self) -> Result<Vec<SearchPage>> {
        let mut pages = Vec::new();
        while let Some(page) = self.next_page().await {
            pages.push(page?);
        }
        Ok(pages)
    }

    /// The JQL this cursor runs.
    pub fn jql(&self) -> &str {
        &self.jql
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use tokio_test::block_on;

    use super::*;
    use crate::api::error::ApiError;
    use crate::api::types::IssueSummary;

    /// Serves pages out of a fixed number of issues and records each request.
    struct MockSource {
        total: u32,
        requests: RefCell<Vec<PageCursor>>,
        fail_at: Option<u32>,
        /// Server-side limit on issues per page, below the requested size.
        cap: Option<u32>,
    }

    impl MockSource {
        fn new(total: u32) -> Self {
            Self {
                total,
                requests: RefCell::new(Vec::new()),
                fail_at: None,
                cap: None,
            }
        }
    }

    impl PageSource for MockSource {
        async fn fetch_page(&self, _jql: &str, cursor: PageCursor) -> Result<SearchPage> {
            self.requests.borrow_mut().push(cursor);
            if self.fail_at == Some(cursor.start_at()) {
                return Err(ApiError::Network("connection reset".to_string()));
            }

            let size = self.cap.map_or(cursor.page_size(), |cap| cap.min(cursor.page_size()));
            let end = (cursor.start_at() + size).min(self.total);
            let issues = (cursor.start_at()..end)
                .map(|i| IssueSummary {
                    key: format!("PROJ-{}", i + 1),
                    summary: format!("Issue {}", i + 1),
                    status: "Open".to_string(),
                    assignee: None,
                    priority: None,
                })
                .collect();

            Ok(SearchPage {
                issues,
                start_at: cursor.start_at(),
                total: self.total,
                is_last: false,
            })
        }
    }

    fn filter(project: Option<&str>, scope: Scope, status: Option<&str>) -> SearchFilter {
        SearchFilter {
            project_key: project.map(str::to_string),
            scope,
            status: status.map(str::to_string),
        }
    }

    #[test]
    fn test_empty_filter_is_empty_jql() {
        assert_eq!(build_jql(&SearchFilter::default()), "");
    }

    #[test]
    fn test_full_filter() {
        let jql = build_jql(&filter(Some("PROJ"), Scope::MineAssigned, Some("Open")));
        assert_eq!(
            jql,
            r#"project = "PROJ" AND assignee = currentUser() AND status = "Open""#
        );
    }

    #[test]
    fn test_reported_scope_only() {
        let jql = build_jql(&filter(None, Scope::MineReported, None));
        assert_eq!(jql, "reporter = currentUser()");
    }

    #[test]
    fn test_status_quote_is_doubled() {
        let jql = build_jql(&filter(None, Scope::All, Some(r#"Can"t Reproduce"#)));
        assert_eq!(jql, r#"status = "Can""t Reproduce""#);
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let jql = build_jql(&filter(Some("  "), Scope::All, Some("")));
        assert_eq!(jql, "");
    }

    #[test]
    fn test_no_dangling_and_for_any_combination() {
        let projects = [None, Some("PROJ")];
        let scopes = [Scope::MineAssigned, Scope::MineReported, Scope::All];
        let statuses = [None, Some("In Progress")];

        for project in projects {
            for scope in scopes {
                for status in statuses {
                    let f = filter(project, scope, status);
                    let jql = build_jql(&f);
                    assert_eq!(jql, build_jql(&f));
                    assert!(!jql.starts_with(" AND"), "{}", jql);
                    assert!(!jql.ends_with("AND "), "{}", jql);
                    assert!(!jql.contains("AND  AND"), "{}", jql);
                }
            }
        }
    }

    #[test]
    fn test_fetch_all_pages_through_result_set() {
        let source = MockSource::new(25);
        let pages = block_on(fetch_all(&source, "project = \"PROJ\"", 10).collect_all()).unwrap();

        let sizes: Vec<_> = pages.iter().map(|p| p.issues.len()).collect();
        assert_eq!(sizes, vec![10, 10, 5]);
        let last_flags: Vec<_> = pages.iter().map(|p| p.is_last).collect();
        assert_eq!(last_flags, vec![false, false, true]);
        assert_eq!(
            source
                .requests
                .borrow()
                .iter()
                .map(|c| c.start_at())
                .collect::<Vec<_>>(),
            vec![0, 10, 20]
        );
    }

    #[test]
    fn test_fetch_all_steps_by_returned_count_when_server_caps_pages() {
        let mut source = MockSource::new(12);
        source.cap = Some(5);
        let pages = block_on(fetch_all(&source, "", 10).collect_all()).unwrap();

        let sizes: Vec<_> = pages.iter().map(|p| p.issues.len()).collect();
        assert_eq!(sizes, vec![5, 5, 2]);
        let starts: Vec<_> = source
            .requests
            .borrow()
            .iter()
            .map(|c| c.start_at())
            .collect();
        assert_eq!(starts, vec![0, 5, 10]);
        assert!(pages[2].is_last);
    }

    #[test]
    fn test_fetch_all_is_lazy() {
        let source = MockSource::new(25);
        let mut pages = fetch_all(&source, "", 10);
        assert!(source.requests.borrow().is_empty());

        let first = block_on(pages.next_page()).unwrap().unwrap();
        assert_eq!(first.issues.len(), 10);
        drop(pages);

        assert_eq!(source.requests.borrow().len(), 1);
    }

    #[test]
    fn test_fetch_all_restarts_from_first_page() {
        let source = MockSource::new(15);
        let first_run = block_on(fetch_all(&source, "", 10).collect_all()).unwrap();
        let second_run = block_on(fetch_all(&source, "", 10).collect_all()).unwrap();

        assert_eq!(first_run, second_run);
        assert_eq!(source.requests.borrow().len(), 4);
    }

    #[test]
    fn test_empty_result_set_is_single_last_page() {
        let source = MockSource::new(0);
        let pages = block_on(fetch_all(&source, "", 10).collect_all()).unwrap();

        assert_eq!(pages.len(), 1);
        assert!(pages[0].is_last);
        assert!(pages[0].issues.is_empty());
    }

    #[test]
    fn test_error_ends_cursor() {
        let mut source = MockSource::new(25);
        source.fail_at = Some(10);
        let mut pages = fetch_all(&source, "", 10);

        assert!(block_on(pages.next_page()).unwrap().is_ok());
        assert!(block_on(pages.next_page()).unwrap().is_err());
        assert!(block_on(pages.next_page()).is_none());
    }

    #[test]
    fn test_page_size_is_clamped() {
        assert_eq!(PageCursor::first(0).page_size(), 1);
        assert_eq!(PageCursor::first(500).page_size(), MAX_PAGE_SIZE);
        assert_eq!(PageCursor::first(50).page_size(), 50);
    }
}
