//! Resource lifecycle tracker.
//!
//! Every backend resource a test creates is recorded here and deleted at
//! teardown, most dependent kind first. Teardown never fails the test: each
//! deletion is attempted once, failures are logged and collected in a
//! [`TeardownReport`], and the remaining resources are still processed.

use crate::result::{HarnessError, HarnessResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

// =============================================================================
// RESOURCE KIND
// =============================================================================

/// Category of backend-managed entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Console users
    Users,
    /// Projects (owned by an organization)
    Projects,
    /// Databases (inside a project)
    Databases,
    /// Backups (of a database)
    Backups,
}

/// Deletion order: every kind comes before the kinds it depends on
pub const TEARDOWN_ORDER: [ResourceKind; 4] = [
    ResourceKind::Backups,
    ResourceKind::Databases,
    ResourceKind::Projects,
    ResourceKind::Users,
];

impl ResourceKind {
    /// All kinds in declaration order
    pub const ALL: [Self; 4] = [Self::Users, Self::Projects, Self::Databases, Self::Backups];

    /// REST collection name and UI menu key
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Projects => "projects",
            Self::Databases => "databases",
            Self::Backups => "backups",
        }
    }

    /// Kinds that must outlive resources of this kind
    #[must_use]
    pub const fn depends_on(&self) -> &'static [Self] {
        match self {
            Self::Users => &[],
            Self::Projects => &[Self::Users],
            Self::Databases => &[Self::Projects],
            Self::Backups => &[Self::Databases],
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| HarnessError::config(format!("unknown resource kind '{s}'")))
    }
}

/// One tracked resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Resource kind
    pub kind: ResourceKind,
    /// Backend name (path below the kind's collection)
    pub name: String,
}

impl fmt::Display for ResourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

// =============================================================================
// BACKEND
// =============================================================================

/// Listing and deletion surface teardown needs from the backend
#[async_trait]
pub trait ResourceBackend: Send + Sync {
    /// Names of every resource of this kind
    async fn list(&self, kind: ResourceKind) -> HarnessResult<Vec<String>>;

    /// Delete one resource
    async fn delete(&self, kind: ResourceKind, name: &str) -> HarnessResult<()>;
}

/// What teardown deletes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupStrategy {
    /// Only what the test recorded, newest first within a kind
    Bookkeeping,
    /// Everything the backend lists, except the protected bootstrap user.
    /// Kinds whose listing fails fall back to the recorded names.
    Relist {
        /// Qualified user name (`org/user`) never deleted
        protected_user: String,
    },
}

impl CleanupStrategy {
    /// Relist strategy protecting the given user
    #[must_use]
    pub fn relist(protected_user: impl Into<String>) -> Self {
        Self::Relist {
            protected_user: protected_user.into(),
        }
    }
}

// =============================================================================
// REPORT
// =============================================================================

/// A deletion that failed during teardown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownFailure {
    /// Resource that could not be deleted
    pub record: ResourceRecord,
    /// Error text
    pub error: String,
}

/// Outcome of [`ResourceTracker::teardown_all`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// Resources deleted, in deletion order
    pub deleted: Vec<ResourceRecord>,
    /// Deletions that failed
    pub failures: Vec<TeardownFailure>,
    /// Kinds whose listing failed, with the error text
    pub listing_failures: Vec<(ResourceKind, String)>,
}

impl TeardownReport {
    /// True when nothing failed
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.listing_failures.is_empty()
    }

    /// Number of deletion attempts made
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.deleted.len() + self.failures.len()
    }
}

// =============================================================================
// TRACKER
// =============================================================================

/// Per-test record of created resources
#[derive(Debug, Clone)]
pub struct ResourceTracker {
    records: BTreeMap<ResourceKind, Vec<String>>,
    strategy: CleanupStrategy,
}

impl Default for ResourceTracker {
    fn default() -> Self {
        Self::new(CleanupStrategy::Bookkeeping)
    }
}

impl ResourceTracker {
    /// Create an empty tracker
    #[must_use]
    pub fn new(strategy: CleanupStrategy) -> Self {
        Self {
            records: BTreeMap::new(),
            strategy,
        }
    }

    /// Active cleanup strategy
    #[must_use]
    pub const fn strategy(&self) -> &CleanupStrategy {
        &self.strategy
    }

    /// Record a successful creation. Recording the same pair twice is a no-op.
    pub fn record_creation(&mut self, kind: ResourceKind, name: impl Into<String>) {
        let name = name.into();
        let names = self.records.entry(kind).or_default();
        if !names.contains(&name) {
            names.push(name);
        }
    }

    /// Record an explicit deletion. Returns false if the pair was not tracked.
    pub fn record_deletion(&mut self, kind: ResourceKind, name: &str) -> bool {
        let Some(names) = self.records.get_mut(&kind) else {
            return false;
        };
        let before = names.len();
        names.retain(|n| n != name);
        before != names.len()
    }

    /// Whether a pair is currently tracked
    #[must_use]
    pub fn contains(&self, kind: ResourceKind, name: &str) -> bool {
        self.records
            .get(&kind)
            .is_some_and(|names| names.iter().any(|n| n == name))
    }

    /// Tracked names of one kind, in creation order
    #[must_use]
    pub fn names(&self, kind: ResourceKind) -> &[String] {
        self.records.get(&kind).map_or(&[][..], Vec::as_slice)
    }

    /// Every tracked record, in teardown order
    #[must_use]
    pub fn pending(&self) -> Vec<ResourceRecord> {
        TEARDOWN_ORDER
            .iter()
            .flat_map(|&kind| {
                self.names(kind).iter().rev().map(move |name| ResourceRecord {
                    kind,
                    name: name.clone(),
                })
            })
            .collect()
    }

    /// True when nothing is tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.values().all(Vec::is_empty)
    }

    async fn targets(
        &self,
        kind: ResourceKind,
        backend: &dyn ResourceBackend,
        report: &mut TeardownReport,
    ) -> Vec<String> {
        let bookkept: Vec<String> = self.names(kind).iter().rev().cloned().collect();
        let CleanupStrategy::Relist { protected_user } = &self.strategy else {
            return bookkept;
        };
        match backend.list(kind).await {
            Ok(items) => items
                .into_iter()
                .filter(|item| kind != ResourceKind::Users || item != protected_user)
                .collect(),
            Err(err) => {
                warn!(%kind, error = %err, "listing failed, falling back to recorded names");
                report.listing_failures.push((kind, err.to_string()));
                bookkept
            }
        }
    }

    /// Delete every remaining resource, most dependent kind first.
    ///
    /// Each pair is attempted exactly once. Failures are logged and reported,
    /// never returned. The tracker is empty afterwards.
    pub async fn teardown_all(&mut self, backend: &dyn ResourceBackend) -> TeardownReport {
        let mut report = TeardownReport::default();
        for kind in TEARDOWN_ORDER {
            let mut targets = self.targets(kind, backend, &mut report).await;
            let mut seen = Vec::with_capacity(targets.len());
            targets.retain(|name| {
                let fresh = !seen.contains(name);
                if fresh {
                    seen.push(name.clone());
                }
                fresh
            });
            for name in targets {
                let record = ResourceRecord { kind, name };
                info!(resource = %record, "deleting resource");
                match backend.delete(kind, &record.name).await {
                    Ok(()) => report.deleted.push(record),
                    Err(err) => {
                        warn!(resource = %record, error = %err, "teardown deletion failed");
                        report.failures.push(TeardownFailure {
                            record,
                            error: err.to_string(),
                        });
                    }
                }
            }
        }
        self.records.clear();
        report
    }
}
