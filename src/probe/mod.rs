//! Collaborators that look outside the session record: the git working tree,
//! stored OAuth credentials, the usage API and agent config files.

pub mod config_counts;
pub mod credentials;
pub mod git;
pub mod usage_api;
