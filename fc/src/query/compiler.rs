//! Query compiler: fragment store -> combined payload

use tracing::{debug, warn};

use super::fragment::{CombinedQuery, CompiledConstraints, Constraint, QueryMode, SortDirection};
use super::store::FragmentStore;

/// Combine every stored fragment into the payload the view understands
///
/// Textual fragments are concatenated without a separator, in store order;
/// contributors must write predicates that compose in any order.
pub fn compile(store: &FragmentStore, mode: QueryMode) -> CombinedQuery {
    let constraints = match mode {
        QueryMode::Textual => {
            let mut text = String::new();
            for (id, constraint) in store.constraints() {
                match constraint {
                    Constraint::Text(fragment) => text.push_str(fragment),
                    Constraint::Structured(entry) => {
                        warn!(contributor_id = %id, attribute = %entry.attribute, "Skipping structured constraint in textual mode");
                    }
                }
            }
            CompiledConstraints::Text(text)
        }
        QueryMode::Structured => {
            let mut entries = Vec::new();
            for (id, constraint) in store.constraints() {
                match constraint {
                    Constraint::Structured(entry) if !entry.value.is_empty() => entries.push(entry.clone()),
                    Constraint::Structured(_) => {
                        debug!(contributor_id = %id, "Dropping structured constraint without value");
                    }
                    Constraint::Text(fragment) if !fragment.is_empty() => {
                        warn!(contributor_id = %id, "Skipping textual constraint in structured mode");
                    }
                    Constraint::Text(_) => {}
                }
            }
            CompiledConstraints::Structured(entries)
        }
    };

    let sorting: Vec<(String, SortDirection)> = store
        .sorting()
        .filter(|(_, sort)| sort.is_complete())
        .filter_map(|(_, sort)| sort.direction.map(|direction| (sort.attribute.clone(), direction)))
        .collect();

    CombinedQuery { constraints, sorting }
}
