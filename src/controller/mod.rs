//! # Reconcile Engine
//!
//! Controllers for the watched custom resources, the status reporter, and
//! the namespace filter applied to incoming events.

use std::collections::HashSet;

pub mod agent;
pub mod knowledge_base;
pub mod status;

pub use status::StatusReporter;

/// Optional namespace filter parsed from `WATCH_NAMESPACES`.
///
/// An empty filter matches every namespace.
#[derive(Debug, Clone, Default)]
pub struct NamespaceFilter {
    namespaces: HashSet<String>,
}

impl NamespaceFilter {
    pub fn from_env() -> Self {
        Self::parse(std::env::var("WATCH_NAMESPACES").ok().as_deref())
    }

    pub fn parse(value: Option<&str>) -> Self {
        let namespaces = value
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect();
        Self { namespaces }
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    pub fn matches(&self, namespace: &str) -> bool {
        self.namespaces.is_empty() || self.namespaces.contains(namespace)
    }

    /// Namespace names for startup logging.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.namespaces.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
