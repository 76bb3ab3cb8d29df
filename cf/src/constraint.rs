//! Constraint building for one checkbox state

use std::collections::HashMap;

use filtercoord::{Constraint, QueryMode, StructuredConstraint};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::props::{FilterBy, FilterSide};

/// Placeholder in XPath constraints replaced by the current object's id
pub const CURRENT_OBJECT_TOKEN: &str = "'[%CurrentObject%]'";

/// Type of an attribute of the listed entity, as far as constraint syntax cares
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttributeKind {
    Enumeration,
    Boolean,
    #[default]
    Other,
}

/// What the filter knows about the page it sits on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FilterContext {
    /// Id of the object the page was opened for
    pub current_object: Option<String>,
    pub attributes: HashMap<String, AttributeKind>,
}

impl FilterContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_current_object(mut self, id: impl Into<String>) -> Self {
        self.current_object = Some(id.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, kind: AttributeKind) -> Self {
        self.attributes.insert(name.into(), kind);
        self
    }

    pub fn kind_of(&self, attribute: &str) -> AttributeKind {
        self.attributes.get(attribute).copied().unwrap_or_default()
    }
}

/// Build the constraint fragment for one checkbox state
pub fn build_constraint(side: &FilterSide<'_>, context: &FilterContext, mode: QueryMode) -> Constraint {
    match mode {
        QueryMode::Textual => Constraint::Text(textual(side, context)),
        QueryMode::Structured => Constraint::Structured(structured(side, context)),
    }
}

fn textual(side: &FilterSide<'_>, context: &FilterContext) -> String {
    match side.filter_by {
        FilterBy::XPath => match &context.current_object {
            Some(id) => side.constraint.replacen(CURRENT_OBJECT_TOKEN, id, 1),
            None => {
                if side.constraint.contains(CURRENT_OBJECT_TOKEN) {
                    warn!(constraint = %side.constraint, "No current object for XPath constraint");
                }
                side.constraint.to_string()
            }
        },
        FilterBy::Attribute => {
            let attribute = side.attribute;
            match context.kind_of(attribute) {
                AttributeKind::Enumeration => format!("[{}='{}']", attribute, side.attribute_value.trim()),
                AttributeKind::Boolean => {
                    format!("[{} = {}()]", attribute, side.attribute_value.trim().to_lowercase())
                }
                AttributeKind::Other => format!("[contains({},'{}')]", attribute, side.attribute_value),
            }
        }
        FilterBy::None => String::new(),
    }
}

fn structured(side: &FilterSide<'_>, context: &FilterContext) -> StructuredConstraint {
    match side.filter_by {
        FilterBy::Attribute => {
            let attribute = side.attribute;
            match context.kind_of(attribute) {
                AttributeKind::Enumeration => StructuredConstraint::new(attribute, "equals", side.attribute_value.trim()),
                AttributeKind::Boolean => {
                    StructuredConstraint::new(attribute, "equals", side.attribute_value.trim().to_lowercase())
                }
                AttributeKind::Other => StructuredConstraint::new(attribute, "contains", side.attribute_value),
            }
        }
        // No structured form; an entry without value is dropped by the compiler
        FilterBy::XPath | FilterBy::None => StructuredConstraint::new(side.attribute, "equals", ""),
    }
}
