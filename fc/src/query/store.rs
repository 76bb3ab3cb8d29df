//! Per-view fragment store

use indexmap::IndexMap;

use super::fragment::{Constraint, ContributorId, SortFragment};

/// Latest constraint and sort fragment of every contributor of one view
///
/// Iteration follows the order in which a contributor id was first stored;
/// replacing a fragment keeps the contributor's position.
#[derive(Debug, Clone, Default)]
pub struct FragmentStore {
    constraints: IndexMap<ContributorId, Constraint>,
    sorting: IndexMap<ContributorId, SortFragment>,
}

impl FragmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a contributor's constraint, returning the one it replaced
    pub fn set_constraint(&mut self, contributor_id: &str, constraint: Constraint) -> Option<Constraint> {
        self.constraints.insert(contributor_id.to_string(), constraint)
    }

    /// Upsert a contributor's sort fragment, returning the one it replaced
    pub fn set_sorting(&mut self, contributor_id: &str, sorting: SortFragment) -> Option<SortFragment> {
        self.sorting.insert(contributor_id.to_string(), sorting)
    }

    /// Drop both fragments of a contributor; true if anything was stored
    pub fn remove(&mut self, contributor_id: &str) -> bool {
        let constraint = self.constraints.shift_remove(contributor_id).is_some();
        let sorting = self.sorting.shift_remove(contributor_id).is_some();
        constraint || sorting
    }

    pub fn constraint(&self, contributor_id: &str) -> Option<&Constraint> {
        self.constraints.get(contributor_id)
    }

    pub fn sorting_of(&self, contributor_id: &str) -> Option<&SortFragment> {
        self.sorting.get(contributor_id)
    }

    pub fn constraints(&self) -> impl Iterator<Item = (&ContributorId, &Constraint)> {
        self.constraints.iter()
    }

    pub fn sorting(&self) -> impl Iterator<Item = (&ContributorId, &SortFragment)> {
        self.sorting.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty() && self.sorting.is_empty()
    }
}
