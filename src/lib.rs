//! jira-cli - create and search JIRA issues from the terminal.
//!
//! The [`api`] module is the reusable part: credential resolution, the HTTP
//! session, the typed client and JQL/pagination helpers. The remaining modules
//! wire it to the `jira` binary.

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
