//! Checkbox filter configuration

use filtercoord::{DataView, SourceType};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FilterError;

/// What a checkbox state filters on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterBy {
    #[serde(rename = "attribute")]
    Attribute,
    #[serde(rename = "XPath")]
    XPath,
    #[default]
    None,
}

/// Configured filter for one checkbox state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSide<'a> {
    pub filter_by: FilterBy,
    pub attribute: &'a str,
    pub attribute_value: &'a str,
    pub constraint: &'a str,
}

/// Checkbox filter properties, as configured on the widget
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CheckboxFilterProps {
    /// Contributor id used with the view's coordinator
    pub friendly_id: String,
    pub list_view_entity: String,

    pub filter_by: FilterBy,
    pub attribute: String,
    pub attribute_value: String,
    pub constraint: String,
    pub default_checked: bool,

    pub unchecked_filter_by: FilterBy,
    pub unchecked_attribute: String,
    pub unchecked_attribute_value: String,
    pub unchecked_constraint: String,
}

impl CheckboxFilterProps {
    /// Filter settings for the given checkbox state
    pub fn side(&self, checked: bool) -> FilterSide<'_> {
        if checked {
            FilterSide {
                filter_by: self.filter_by,
                attribute: &self.attribute,
                attribute_value: &self.attribute_value,
                constraint: &self.constraint,
            }
        } else {
            FilterSide {
                filter_by: self.unchecked_filter_by,
                attribute: &self.unchecked_attribute,
                attribute_value: &self.unchecked_attribute_value,
                constraint: &self.unchecked_constraint,
            }
        }
    }

    /// Check both checkbox states, reporting every problem at once
    pub fn validate(&self) -> Result<(), FilterError> {
        debug!(friendly_id = %self.friendly_id, "CheckboxFilterProps::validate: called");
        let mut problems = Vec::new();
        for (checked, label) in [(true, "Filter"), (false, "Unchecked filter")] {
            let side = self.side(checked);
            match side.filter_by {
                FilterBy::XPath if side.constraint.is_empty() => {
                    problems.push(format!("{} by 'XPath' requires an 'XPath constraint'", label));
                }
                FilterBy::Attribute => {
                    if side.attribute.is_empty() {
                        problems.push(format!("{} by 'Attribute' requires an 'Attribute'", label));
                    }
                    if side.attribute_value.is_empty() {
                        problems.push(format!("{} by 'Attribute' requires an 'Attribute value'", label));
                    }
                }
                _ => {}
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(FilterError::InvalidProps {
                friendly_id: self.friendly_id.clone(),
                problems,
            })
        }
    }

    /// Check the filter can be applied to `view`
    pub fn validate_target(&self, view: &dyn DataView) -> Result<(), FilterError> {
        match view.source_type() {
            Some(SourceType::Database | SourceType::XPath) | None => {}
            Some(found) => {
                return Err(FilterError::IncompatibleSource {
                    friendly_id: self.friendly_id.clone(),
                    found,
                });
            }
        }

        match view.entity() {
            Some(entity) if entity != self.list_view_entity => Err(FilterError::EntityMismatch {
                friendly_id: self.friendly_id.clone(),
                entity: self.list_view_entity.clone(),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filtercoord::MemoryView;

    fn props() -> CheckboxFilterProps {
        CheckboxFilterProps {
            friendly_id: "activeFilter".to_string(),
            list_view_entity: "Sales.Customer".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_deserialize_props() {
        let props: CheckboxFilterProps = serde_yaml::from_str(
            r#"
friendly-id: activeFilter
list-view-entity: Sales.Customer
filter-by: attribute
attribute: Active
attribute-value: "true"
default-checked: true
unchecked-filter-by: XPath
unchecked-constraint: "[Active = false()]"
"#,
        )
        .unwrap();

        assert_eq!(props.filter_by, FilterBy::Attribute);
        assert_eq!(props.unchecked_filter_by, FilterBy::XPath);
        assert!(props.default_checked);
        assert_eq!(props.side(false).constraint, "[Active = false()]");
        assert!(props.validate().is_ok());
    }

    #[test]
    fn test_validate_collects_every_problem() {
        let props = CheckboxFilterProps {
            filter_by: FilterBy::Attribute,
            unchecked_filter_by: FilterBy::XPath,
            ..props()
        };

        let err = props.validate().unwrap_err();
        match &err {
            FilterError::InvalidProps { problems, .. } => assert_eq!(
                problems,
                &vec![
                    "Filter by 'Attribute' requires an 'Attribute'".to_string(),
                    "Filter by 'Attribute' requires an 'Attribute value'".to_string(),
                    "Unchecked filter by 'XPath' requires an 'XPath constraint'".to_string(),
                ]
            ),
            other => panic!("Expected InvalidProps, got {:?}", other),
        }
        assert!(err.to_string().starts_with("activeFilter : Filter by"));
    }

    #[test]
    fn test_none_needs_nothing() {
        assert!(props().validate().is_ok());
    }

    #[test]
    fn test_validate_target_source_type() {
        let view = MemoryView::builder("Sales.Customer")
            .source_type(SourceType::Microflow)
            .build();
        assert!(matches!(
            props().validate_target(view.as_ref()),
            Err(FilterError::IncompatibleSource {
                found: SourceType::Microflow,
                ..
            })
        ));

        let view = MemoryView::builder("Sales.Customer")
            .source_type(SourceType::XPath)
            .build();
        assert!(props().validate_target(view.as_ref()).is_ok());
    }

    #[test]
    fn test_validate_target_entity() {
        let view = MemoryView::builder("Sales.Order").build();
        let err = props().validate_target(view.as_ref()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "activeFilter: supplied entity \"Sales.Customer\" does not belong to list view data source"
        );
    }
}
