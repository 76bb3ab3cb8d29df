//! Fragment and payload types

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of one contributor, unique per coordinator
pub type ContributorId = String;

/// Structured constraint entry used when the host cannot take a textual query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredConstraint {
    pub attribute: String,
    pub operator: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl StructuredConstraint {
    pub fn new(attribute: impl Into<String>, operator: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            operator: operator.into(),
            value: value.into(),
            path: None,
        }
    }

    /// Set the association path the attribute is reached through
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// A contributor's constraint fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Constraint {
    /// Predicate text concatenated into the view's textual query
    Text(String),

    /// Entry collected into the view's structured filter list
    Structured(StructuredConstraint),
}

impl Constraint {
    /// An empty constraint; contributes nothing in either mode
    pub fn none() -> Self {
        Constraint::Text(String::new())
    }

    /// True when this fragment carries no usable filter
    pub fn is_empty(&self) -> bool {
        match self {
            Constraint::Text(text) => text.is_empty(),
            Constraint::Structured(entry) => entry.value.is_empty(),
        }
    }
}

impl Default for Constraint {
    fn default() -> Self {
        Constraint::none()
    }
}

impl From<&str> for Constraint {
    fn from(text: &str) -> Self {
        Constraint::Text(text.to_string())
    }
}

impl From<String> for Constraint {
    fn from(text: String) -> Self {
        Constraint::Text(text)
    }
}

impl From<StructuredConstraint> for Constraint {
    fn from(entry: StructuredConstraint) -> Self {
        Constraint::Structured(entry)
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}

/// A contributor's sort fragment; incomplete fragments are ignored at compile time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortFragment {
    #[serde(default)]
    pub attribute: String,
    #[serde(default)]
    pub direction: Option<SortDirection>,
}

impl SortFragment {
    pub fn new(attribute: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            attribute: attribute.into(),
            direction: Some(direction),
        }
    }

    /// Both attribute and direction are present
    pub fn is_complete(&self) -> bool {
        !self.attribute.is_empty() && self.direction.is_some()
    }
}

/// How constraints are represented for a view, decided by the host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    #[default]
    Textual,
    Structured,
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryMode::Textual => write!(f, "textual"),
            QueryMode::Structured => write!(f, "structured"),
        }
    }
}

impl std::str::FromStr for QueryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "textual" | "text" | "xpath" => Ok(Self::Textual),
            "structured" => Ok(Self::Structured),
            _ => Err(format!("Unknown query mode: {}. Use: textual or structured", s)),
        }
    }
}

/// Combined constraint written to the view's constraint field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompiledConstraints {
    Text(String),
    Structured(Vec<StructuredConstraint>),
}

impl CompiledConstraints {
    /// The empty payload for a mode
    pub fn empty(mode: QueryMode) -> Self {
        match mode {
            QueryMode::Textual => CompiledConstraints::Text(String::new()),
            QueryMode::Structured => CompiledConstraints::Structured(Vec::new()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CompiledConstraints::Text(text) => text.is_empty(),
            CompiledConstraints::Structured(entries) => entries.is_empty(),
        }
    }
}

impl fmt::Display for CompiledConstraints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompiledConstraints::Text(text) => write!(f, "{:?}", text),
            CompiledConstraints::Structured(entries) => {
                let parts: Vec<String> = entries
                    .iter()
                    .map(|e| match &e.path {
                        Some(path) => format!("{}/{} {} {:?}", path, e.attribute, e.operator, e.value),
                        None => format!("{} {} {:?}", e.attribute, e.operator, e.value),
                    })
                    .collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

/// The combined payload written to the view before each refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedQuery {
    pub constraints: CompiledConstraints,
    pub sorting: Vec<(String, SortDirection)>,
}

impl CombinedQuery {
    pub fn empty(mode: QueryMode) -> Self {
        Self {
            constraints: CompiledConstraints::empty(mode),
            sorting: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_emptiness() {
        assert!(Constraint::none().is_empty());
        assert!(!Constraint::from("[Active=true]").is_empty());
        assert!(Constraint::from(StructuredConstraint::new("Name", "contains", "")).is_empty());
        assert!(!Constraint::from(StructuredConstraint::new("Name", "contains", "x")).is_empty());
    }

    #[test]
    fn test_constraint_untagged_deserialization() {
        let text: Constraint = serde_yaml::from_str("\"[Active=true]\"").unwrap();
        assert_eq!(text, Constraint::Text("[Active=true]".to_string()));

        let structured: Constraint =
            serde_yaml::from_str("attribute: Name\noperator: contains\nvalue: x\npath: Order_Customer").unwrap();
        assert_eq!(
            structured,
            Constraint::Structured(StructuredConstraint::new("Name", "contains", "x").with_path("Order_Customer"))
        );
    }

    #[test]
    fn test_query_mode_from_str() {
        assert_eq!("textual".parse::<QueryMode>(), Ok(QueryMode::Textual));
        assert_eq!("Structured".parse::<QueryMode>(), Ok(QueryMode::Structured));
        assert!("sql".parse::<QueryMode>().is_err());
    }

    #[test]
    fn test_sort_fragment_completeness() {
        assert!(SortFragment::new("Name", SortDirection::Asc).is_complete());
        assert!(
            !SortFragment {
                attribute: String::new(),
                direction: Some(SortDirection::Desc),
            }
            .is_complete()
        );
        assert!(
            !SortFragment {
                attribute: "Name".to_string(),
                direction: None,
            }
            .is_complete()
        );
    }

    #[test]
    fn test_structured_path_skipped_when_absent() {
        let json = serde_json::to_string(&StructuredConstraint::new("Active", "equals", "true")).unwrap();
        assert!(!json.contains("path"));
    }

    #[test]
    fn test_compiled_constraints_display() {
        let text = CompiledConstraints::Text("[Active=true]".to_string());
        assert_eq!(text.to_string(), "\"[Active=true]\"");

        let structured = CompiledConstraints::Structured(vec![StructuredConstraint::new("Name", "contains", "x")]);
        assert_eq!(structured.to_string(), "[Name contains \"x\"]");
    }
}
