//! Scenario runner behind `fc simulate` and `fc compile`
//!
//! A scenario describes one in-memory view and a list of steps performed by
//! its contributors. Running it drives a real [`CoordinatorRegistry`] and
//! reports every refresh the view was asked to perform.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

use colored::*;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::coordinator::{CoordinatorConfig, CoordinatorHandle, CoordinatorMetrics, CoordinatorRegistry};
use crate::query::{CombinedQuery, Constraint, ContributorId, FragmentStore, QueryMode, SortDirection, SortFragment, compile};
use crate::scheduler::RefreshState;
use crate::version::ProtocolVersion;
use crate::view::{DataView, MemoryView, RefreshBehavior, RefreshRecord, SourceType};

/// A scenario file
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub view: ViewSettings,
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).context("Failed to read scenario file")?;
        let scenario: Self = serde_yaml::from_str(&content).context("Failed to parse scenario file")?;
        info!("Loaded scenario from: {}", path.as_ref().display());
        Ok(scenario)
    }
}

/// The simulated view
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ViewSettings {
    pub entity: String,
    pub source_type: SourceType,
    pub mode: QueryMode,
    pub refresh_latency_ms: u64,
    /// The view never reports refresh completion
    pub drop_refresh: bool,
    pub settle_timeout_ms: u64,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            entity: "MyFirstModule.Entity".to_string(),
            source_type: SourceType::Database,
            mode: QueryMode::Textual,
            refresh_latency_ms: 10,
            drop_refresh: false,
            settle_timeout_ms: 2000,
        }
    }
}

fn default_major() -> u32 {
    ProtocolVersion::CURRENT.major
}

/// One thing a contributor does
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Step {
    Attach {
        id: ContributorId,
        #[serde(default = "default_major")]
        major: u32,
    },
    Constraint {
        id: ContributorId,
        #[serde(default)]
        constraint: Constraint,
    },
    Sorting {
        id: ContributorId,
        #[serde(default)]
        attribute: String,
        #[serde(default)]
        direction: Option<SortDirection>,
    },
    Detach {
        id: ContributorId,
    },
    Wait {
        ms: u64,
    },
}

/// A step that did not go through
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    pub step: usize,
    pub contributor: ContributorId,
    pub error: String,
}

/// Outcome of a scenario run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    #[serde(rename = "view-id")]
    pub view_id: String,
    pub mode: QueryMode,
    pub refreshes: Vec<RefreshRecord>,
    pub failures: Vec<StepFailure>,
    pub classes: Vec<String>,
    pub settled: bool,
    pub metrics: Option<CoordinatorMetrics>,
}

/// Run a scenario to completion
pub async fn run(scenario: &Scenario, config: &CoordinatorConfig) -> Report {
    let settings = &scenario.view;
    let behavior = if settings.drop_refresh {
        RefreshBehavior::Drop
    } else {
        RefreshBehavior::Delayed(Duration::from_millis(settings.refresh_latency_ms))
    };
    let view = MemoryView::builder(settings.entity.clone())
        .source_type(settings.source_type)
        .mode(settings.mode)
        .behavior(behavior)
        .build();
    let view_id = view.view_id();
    info!(%view_id, steps = scenario.steps.len(), "Running scenario");

    let registry = CoordinatorRegistry::new(config.clone());
    let mut handles: HashMap<ContributorId, CoordinatorHandle> = HashMap::new();
    let mut failures = Vec::new();

    for (index, step) in scenario.steps.iter().enumerate() {
        let step_no = index + 1;
        debug!(step_no, ?step, "simulate::run: step");
        let outcome = match step {
            Step::Attach { id, major } => {
                match registry.attach(view.clone(), id, ProtocolVersion::major(*major)).await {
                    Ok(handle) => {
                        handles.insert(id.clone(), handle);
                        Ok(())
                    }
                    Err(e) => Err((id, e.to_string())),
                }
            }
            Step::Constraint { id, constraint } => match handles.get(id) {
                Some(handle) => handle.set_constraint(constraint.clone()).await.map_err(|e| (id, e.to_string())),
                None => Err((id, "contributor is not attached".to_string())),
            },
            Step::Sorting {
                id,
                attribute,
                direction,
            } => match handles.get(id) {
                Some(handle) => {
                    let sorting = SortFragment {
                        attribute: attribute.clone(),
                        direction: *direction,
                    };
                    handle.set_sorting(sorting).await.map_err(|e| (id, e.to_string()))
                }
                None => Err((id, "contributor is not attached".to_string())),
            },
            Step::Detach { id } => match handles.remove(id) {
                Some(handle) => handle.detach().await.map_err(|e| (id, e.to_string())),
                None => Err((id, "contributor is not attached".to_string())),
            },
            Step::Wait { ms } => {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
                Ok(())
            }
        };

        if let Err((contributor, error)) = outcome {
            warn!(step_no, %contributor, %error, "Scenario step failed");
            failures.push(StepFailure {
                step: step_no,
                contributor: contributor.clone(),
                error,
            });
        }
    }

    let settled = settle(&registry, &view, Duration::from_millis(settings.settle_timeout_ms)).await;
    let metrics = registry.metrics(&view_id).await;
    registry.release(&view_id).await;

    Report {
        view_id: view_id.to_string(),
        mode: settings.mode,
        refreshes: view.refreshes(),
        failures,
        classes: view.classes(),
        settled,
        metrics,
    }
}

/// Wait until the coordinator is idle with nothing in flight
async fn settle(registry: &CoordinatorRegistry, view: &MemoryView, timeout: Duration) -> bool {
    let view_id = view.view_id();
    let poll = async {
        loop {
            match registry.metrics(&view_id).await {
                Some(metrics) if metrics.state == RefreshState::Idle && view.in_flight() == 0 => return,
                None => return,
                Some(_) => tokio::time::sleep(Duration::from_millis(5)).await,
            }
        }
    };

    let settled = tokio::time::timeout(timeout, poll).await.is_ok();
    if !settled {
        warn!(%view_id, ?timeout, "Coordinator did not settle");
    }
    settled
}

impl Report {
    /// Human readable rendering
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "View: {} ({})", self.view_id.cyan(), self.mode);

        if self.refreshes.is_empty() {
            let _ = writeln!(out, "No refreshes");
        }
        for record in &self.refreshes {
            let mark = if record.completed { "✓".green() } else { "…".yellow() };
            let _ = writeln!(out, "{} Refresh #{}: constraints={}", mark, record.cycle, record.query.constraints);
            for (attribute, direction) in &record.query.sorting {
                let _ = writeln!(out, "    sort {} {}", attribute, direction.to_string().dimmed());
            }
        }

        for failure in &self.failures {
            let _ = writeln!(
                out,
                "{} Step {} ({}): {}",
                "✗".red(),
                failure.step,
                failure.contributor.yellow(),
                failure.error
            );
        }

        if !self.settled {
            let _ = writeln!(out, "{} Coordinator did not settle", "!".yellow());
        }
        if let Some(metrics) = &self.metrics {
            let _ = writeln!(
                out,
                "Contributors: {}  State: {}  Refreshes: {}/{}  Deferred: {}  Rejected: {}",
                metrics.contributors,
                metrics.state,
                metrics.scheduler.refreshes_completed,
                metrics.scheduler.refreshes_started,
                metrics.scheduler.deferred_contributions,
                metrics.rejected_attaches
            );
        }
        out
    }
}

/// One contributor's fragments in a `fc compile` input file
#[derive(Debug, Clone, Deserialize)]
pub struct FragmentEntry {
    pub id: ContributorId,
    #[serde(default)]
    pub constraint: Option<Constraint>,
    #[serde(default)]
    pub sorting: Option<SortFragment>,
}

/// Load a YAML or JSON list of fragment entries
pub fn load_fragments<P: AsRef<Path>>(path: P) -> Result<Vec<FragmentEntry>> {
    let content = std::fs::read_to_string(&path).context("Failed to read fragments file")?;
    // JSON is a subset of YAML
    let entries: Vec<FragmentEntry> = serde_yaml::from_str(&content).context("Failed to parse fragments file")?;
    Ok(entries)
}

/// Compile fragment entries in file order, later entries for the same id winning
pub fn compile_fragments(entries: &[FragmentEntry], mode: QueryMode) -> CombinedQuery {
    let mut store = FragmentStore::new();
    for entry in entries {
        if let Some(constraint) = &entry.constraint {
            store.set_constraint(&entry.id, constraint.clone());
        }
        if let Some(sorting) = &entry.sorting {
            store.set_sorting(&entry.id, sorting.clone());
        }
    }
    compile(&store, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{CompiledConstraints, StructuredConstraint};

    fn scenario(yaml: &str) -> Scenario {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_parse_scenario() {
        let scenario = scenario(
            r#"
view:
  entity: Sales.Customer
  source-type: xpath
  refresh-latency-ms: 25
steps:
  - action: attach
    id: a
  - action: constraint
    id: a
    constraint: "[Active = true()]"
  - action: sorting
    id: a
    attribute: Name
    direction: desc
  - action: wait
    ms: 100
  - action: detach
    id: a
"#,
        );
        assert_eq!(scenario.view.entity, "Sales.Customer");
        assert_eq!(scenario.view.source_type, SourceType::XPath);
        assert_eq!(scenario.view.refresh_latency_ms, 25);
        assert_eq!(scenario.view.settle_timeout_ms, 2000);
        assert_eq!(scenario.steps.len(), 5);
        assert!(matches!(&scenario.steps[0], Step::Attach { major: 1, .. }));
        assert!(matches!(
            &scenario.steps[2],
            Step::Sorting {
                direction: Some(SortDirection::Desc),
                ..
            }
        ));
    }

    #[test]
    fn test_parse_structured_constraint_step() {
        let scenario = scenario(
            r#"
steps:
  - action: constraint
    id: a
    constraint:
      attribute: Name
      operator: contains
      value: Jo
"#,
        );
        match &scenario.steps[0] {
            Step::Constraint { constraint, .. } => {
                assert_eq!(
                    constraint,
                    &Constraint::Structured(StructuredConstraint::new("Name", "contains", "Jo"))
                );
            }
            other => panic!("Expected constraint step, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_burst_produces_one_refresh() {
        let scenario = scenario(
            r#"
steps:
  - action: attach
    id: a
  - action: attach
    id: b
  - action: constraint
    id: a
    constraint: "[A]"
  - action: constraint
    id: b
    constraint: "[B]"
"#,
        );
        let report = run(&scenario, &CoordinatorConfig::default()).await;

        assert!(report.settled);
        assert!(report.failures.is_empty());
        assert_eq!(report.refreshes.len(), 1);
        assert_eq!(report.refreshes[0].query.constraints, CompiledConstraints::Text("[A][B]".to_string()));
        assert!(report.classes.is_empty());
        assert_eq!(report.metrics.unwrap().contributors, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_reports_failures() {
        let scenario = scenario(
            r#"
steps:
  - action: attach
    id: old
  - action: attach
    id: new
    major: 2
  - action: constraint
    id: ghost
    constraint: "[x]"
"#,
        );
        let report = run(&scenario, &CoordinatorConfig::default()).await;

        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].step, 2);
        assert!(report.failures[0].error.contains("old"));
        assert_eq!(report.failures[1].contributor, "ghost");
        assert!(report.refreshes.is_empty());
        assert!(report.to_text().contains("No refreshes"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_dropped_refresh_does_not_settle() {
        let scenario = scenario(
            r#"
view:
  drop-refresh: true
  settle-timeout-ms: 300
steps:
  - action: attach
    id: a
  - action: constraint
    id: a
    constraint: "[x]"
"#,
        );
        let report = run(&scenario, &CoordinatorConfig::default()).await;

        assert!(!report.settled);
        assert_eq!(report.refreshes.len(), 1);
        assert!(!report.refreshes[0].completed);
        assert_eq!(report.metrics.unwrap().state, RefreshState::Applying);
    }

    #[test]
    fn test_compile_fragments_last_entry_wins() {
        let entries: Vec<FragmentEntry> = serde_yaml::from_str(
            r#"
- id: a
  constraint: "[p1]"
- id: b
  constraint: "[q]"
  sorting: {attribute: Name, direction: asc}
- id: a
  constraint: "[p2]"
"#,
        )
        .unwrap();

        let query = compile_fragments(&entries, QueryMode::Textual);
        assert_eq!(query.constraints, CompiledConstraints::Text("[p2][q]".to_string()));
        assert_eq!(query.sorting, vec![("Name".to_string(), SortDirection::Asc)]);
    }
}
