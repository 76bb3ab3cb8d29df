//! Query fragments, the per-view fragment store and the query compiler
//!
//! Contributors submit fragments; nothing is written to the view until the
//! scheduler starts a refresh and asks [`compile`] for the combined payload.

mod compiler;
mod fragment;
mod store;

pub use compiler::compile;
pub use fragment::{
    CombinedQuery, CompiledConstraints, Constraint, ContributorId, QueryMode, SortDirection, SortFragment,
    StructuredConstraint,
};
pub use store::FragmentStore;
