//! Data view surface
//!
//! The coordinator only talks to a view through [`DataView`]. Hosts implement
//! it over their own grid/list widget; [`MemoryView`] is an in-memory
//! implementation used by the simulator and tests.

mod done;
mod memory;
mod signal;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::query::{CombinedQuery, CompiledConstraints, QueryMode};

pub use done::RefreshDone;
pub use memory::{MemoryView, MemoryViewBuilder, RefreshBehavior, RefreshRecord};
pub use signal::LoadingSignal;

/// Identity of a bound data view
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewId(String);

impl ViewId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh unique identity
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ViewId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Where the view gets its rows from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceType {
    Database,
    #[serde(rename = "xpath")]
    XPath,
    Microflow,
    EntityPath,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::Database => write!(f, "database"),
            SourceType::XPath => write!(f, "xpath"),
            SourceType::Microflow => write!(f, "microflow"),
            SourceType::EntityPath => write!(f, "entity-path"),
        }
    }
}

/// A list/grid backed by a query, shared by every contributor bound to it
///
/// Implementations use interior mutability: the view is a shared handle and
/// the coordinator is its only writer of query state.
pub trait DataView: Send + Sync + 'static {
    /// Stable identity used to find the view's coordinator
    fn view_id(&self) -> ViewId;

    /// Entity the view lists, if the host exposes it
    fn entity(&self) -> Option<String>;

    /// Data source type, if the host exposes it
    fn source_type(&self) -> Option<SourceType>;

    /// Constraint representation the host expects
    fn query_mode(&self) -> QueryMode {
        QueryMode::Textual
    }

    /// Current content of the query-constraint field; `None` if the host has no such field
    fn constraints(&self) -> Option<CompiledConstraints>;

    /// Write the combined payload into the constraint field (and sort field, if supported)
    fn write_query(&self, query: &CombinedQuery);

    /// Whether [`DataView::refresh`] is available
    fn supports_refresh(&self) -> bool {
        true
    }

    /// Reload the view with its current query; call `done.complete()` when finished
    fn refresh(&self, done: RefreshDone);

    /// Add a presentation class to the view's root element
    fn add_class(&self, class: &str);

    /// Remove a presentation class from the view's root element
    fn remove_class(&self, class: &str);
}

/// Capabilities the coordinator requires that `view` does not expose
pub fn missing_capabilities(view: &dyn DataView) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if view.constraints().is_none() {
        missing.push("query-constraint field");
    }
    if view.entity().is_none_or(|entity| entity.is_empty()) {
        missing.push("entity identity");
    }
    if !view.supports_refresh() {
        missing.push("refresh primitive");
    }
    if view.source_type().is_none() {
        missing.push("data source type");
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_host_has_no_missing_capabilities() {
        let view = MemoryView::builder("Sales.Customer").build();
        assert!(missing_capabilities(view.as_ref()).is_empty());
    }

    #[test]
    fn test_missing_capabilities_are_all_named() {
        let view = MemoryView::builder("")
            .without_constraint_field()
            .without_refresh()
            .without_source_type()
            .build();
        assert_eq!(
            missing_capabilities(view.as_ref()),
            vec![
                "query-constraint field",
                "entity identity",
                "refresh primitive",
                "data source type"
            ]
        );
    }

    #[test]
    fn test_source_type_serialization() {
        let source: SourceType = serde_yaml::from_str("xpath").unwrap();
        assert_eq!(source, SourceType::XPath);
        let source: SourceType = serde_yaml::from_str("entity-path").unwrap();
        assert_eq!(source, SourceType::EntityPath);
    }

    #[test]
    fn test_generated_view_ids_are_unique() {
        assert_ne!(ViewId::generate(), ViewId::generate());
    }
}
