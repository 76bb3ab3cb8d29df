//! Protocol version registry
//!
//! Contributors are upgraded independently of each other. A view only accepts
//! contributors that declare the highest protocol major version in use.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CoordinatorError;
use crate::query::ContributorId;

/// Version of the contributor <-> coordinator protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProtocolVersion {
    pub major: u32,
    #[serde(default)]
    pub minor: u32,
    #[serde(default)]
    pub patch: u32,
}

impl ProtocolVersion {
    /// The protocol this crate speaks
    pub const CURRENT: ProtocolVersion = ProtocolVersion::new(1, 0, 0);

    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    pub const fn major(major: u32) -> Self {
        Self::new(major, 0, 0)
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Major version -> contributors declaring it, scoped to one coordinator
#[derive(Debug, Clone, Default)]
pub struct VersionRegistry {
    register: BTreeMap<u32, BTreeSet<ContributorId>>,
}

impl VersionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a contributor's major version and check the whole view agrees
    ///
    /// Fails with [`CoordinatorError::IncompatibleVersion`] naming every
    /// contributor that is not on the maximum declared version. A failed
    /// declaration is not kept.
    pub fn declare(&mut self, contributor_id: &str, major: u32) -> Result<(), CoordinatorError> {
        debug!(%contributor_id, major, "VersionRegistry::declare: called");
        let previous = self.version_of(contributor_id);
        self.unregister(contributor_id);
        self.register
            .entry(major)
            .or_default()
            .insert(contributor_id.to_string());

        let Some(required) = self.register.keys().next_back().copied() else {
            return Ok(());
        };

        let outdated: Vec<ContributorId> = self
            .register
            .iter()
            .filter(|(version, _)| **version != required)
            .flat_map(|(_, ids)| ids.iter().cloned())
            .collect();

        if outdated.is_empty() {
            return Ok(());
        }

        debug!(%contributor_id, required, ?outdated, "VersionRegistry::declare: rolling back");
        self.unregister(contributor_id);
        if let Some(previous) = previous {
            self.register
                .entry(previous)
                .or_default()
                .insert(contributor_id.to_string());
        }

        Err(CoordinatorError::IncompatibleVersion { required, outdated })
    }

    /// Forget a contributor; true if it was registered
    pub fn remove(&mut self, contributor_id: &str) -> bool {
        self.unregister(contributor_id)
    }

    /// Major version a contributor declared, if any
    pub fn version_of(&self, contributor_id: &str) -> Option<u32> {
        self.register
            .iter()
            .find(|(_, ids)| ids.contains(contributor_id))
            .map(|(version, _)| *version)
    }

    /// Highest major version in use
    pub fn max_version(&self) -> Option<u32> {
        self.register.keys().next_back().copied()
    }

    /// Number of registered contributors
    pub fn len(&self) -> usize {
        self.register.values().map(|ids| ids.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn unregister(&mut self, contributor_id: &str) -> bool {
        let mut removed = false;
        self.register.retain(|_, ids| {
            removed |= ids.remove(contributor_id);
            !ids.is_empty()
        });
        removed
    }
}
