//! Checkbox filter contributor

use std::sync::Arc;

use filtercoord::{CoordinatorHandle, CoordinatorRegistry, DataView, ProtocolVersion, QueryMode};
use tracing::{debug, info};

use crate::constraint::{FilterContext, build_constraint};
use crate::error::FilterError;
use crate::props::CheckboxFilterProps;

/// A checkbox that narrows its view with one constraint per state
#[derive(Debug)]
pub struct CheckboxFilter {
    props: CheckboxFilterProps,
    context: FilterContext,
    mode: QueryMode,
    handle: CoordinatorHandle,
    checked: bool,
}

impl CheckboxFilter {
    /// Validate `props`, attach to `view` and apply the default checked state
    pub async fn attach(
        registry: &CoordinatorRegistry,
        view: Arc<dyn DataView>,
        props: CheckboxFilterProps,
        context: FilterContext,
    ) -> Result<Self, FilterError> {
        debug!(friendly_id = %props.friendly_id, "CheckboxFilter::attach: called");
        props.validate()?;
        props.validate_target(view.as_ref())?;

        let mode = view.query_mode();
        let handle = registry
            .attach(view, &props.friendly_id, ProtocolVersion::CURRENT)
            .await?;
        info!(friendly_id = %props.friendly_id, view_id = %handle.view_id(), "Checkbox filter attached");

        let checked = props.default_checked;
        let filter = Self {
            props,
            context,
            mode,
            handle,
            checked,
        };
        filter.apply().await?;
        Ok(filter)
    }

    /// Change the checkbox state and submit the matching constraint
    pub async fn set_checked(&mut self, checked: bool) -> Result<(), FilterError> {
        debug!(friendly_id = %self.props.friendly_id, checked, "CheckboxFilter::set_checked: called");
        self.checked = checked;
        self.apply().await
    }

    pub fn is_checked(&self) -> bool {
        self.checked
    }

    pub fn props(&self) -> &CheckboxFilterProps {
        &self.props
    }

    pub fn handle(&self) -> &CoordinatorHandle {
        &self.handle
    }

    /// Withdraw this filter's constraint from the view
    pub async fn detach(self) -> Result<(), FilterError> {
        self.handle.detach().await?;
        Ok(())
    }

    async fn apply(&self) -> Result<(), FilterError> {
        let constraint = build_constraint(&self.props.side(self.checked), &self.context, self.mode);
        self.handle.set_constraint(constraint).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::FilterBy;
    use filtercoord::{CompiledConstraints, MemoryView, RefreshBehavior, SourceType};
    use std::time::Duration;

    fn active_props() -> CheckboxFilterProps {
        CheckboxFilterProps {
            friendly_id: "activeFilter".to_string(),
            list_view_entity: "Sales.Customer".to_string(),
            filter_by: FilterBy::XPath,
            constraint: "[Active = true()]".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_unchecked_state_applied_on_attach() {
        let registry = CoordinatorRegistry::default();
        let view = MemoryView::builder("Sales.Customer")
            .behavior(RefreshBehavior::Manual)
            .build();

        let filter = CheckboxFilter::attach(&registry, view.clone(), active_props(), FilterContext::new())
            .await
            .unwrap();
        assert!(!filter.is_checked());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(view.refresh_count(), 1);
        assert_eq!(view.query().constraints, CompiledConstraints::Text(String::new()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_checked_submits_constraint() {
        let registry = CoordinatorRegistry::default();
        let view = MemoryView::builder("Sales.Customer").build();

        let mut filter = CheckboxFilter::attach(&registry, view.clone(), active_props(), FilterContext::new())
            .await
            .unwrap();
        filter.set_checked(true).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(filter.is_checked());
        assert_eq!(view.query().constraints, CompiledConstraints::Text("[Active = true()]".to_string()));
    }

    #[tokio::test]
    async fn test_invalid_props_never_attach() {
        let registry = CoordinatorRegistry::default();
        let view = MemoryView::builder("Sales.Customer").build();
        let props = CheckboxFilterProps {
            constraint: String::new(),
            ..active_props()
        };

        let err = CheckboxFilter::attach(&registry, view, props, FilterContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FilterError::InvalidProps { .. }));
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_incompatible_source_never_attaches() {
        let registry = CoordinatorRegistry::default();
        let view = MemoryView::builder("Sales.Customer")
            .source_type(SourceType::EntityPath)
            .build();

        let err = CheckboxFilter::attach(&registry, view, active_props(), FilterContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FilterError::IncompatibleSource { .. }));
        assert!(registry.is_empty().await);
    }
}
