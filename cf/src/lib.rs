//! CheckFilter - checkbox filter contributor
//!
//! A checkbox bound to a data view. Each checkbox state maps to a constraint
//! (an attribute comparison, an XPath predicate or nothing) that is handed to
//! the view's shared coordinator under the filter's friendly id.

pub mod constraint;
pub mod error;
pub mod filter;
pub mod props;

pub use constraint::{AttributeKind, CURRENT_OBJECT_TOKEN, FilterContext, build_constraint};
pub use error::FilterError;
pub use filter::CheckboxFilter;
pub use props::{CheckboxFilterProps, FilterBy, FilterSide};
