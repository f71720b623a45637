use crate::domain::model::{ClinicId, ResultItem};
use std::rc::Rc;
use tokio::sync::{broadcast, watch};

/// The highlight and route state shared by the list and the map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewSelection {
    pub highlighted_id: Option<ClinicId>,
    pub route_destination: Option<ResultItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorEvent {
    /// A route destination was chosen. Stacked layouts collapse the panel in response.
    RouteSelected(ClinicId),
}

/// Single source of truth for highlight and route destination.
///
/// Renderers never keep their own highlight flags; they hold a [`ListBinding`] or
/// [`MapBinding`] built from the same `Rc<ViewCoordinator>` and read its snapshot.
pub struct ViewCoordinator {
    selection: watch::Sender<ViewSelection>,
    events: broadcast::Sender<CoordinatorEvent>,
}

impl ViewCoordinator {
    pub fn new() -> Self {
        let (selection, _) = watch::channel(ViewSelection::default());
        let (events, _) = broadcast::channel(16);
        Self { selection, events }
    }

    pub fn snapshot(&self) -> ViewSelection {
        self.selection.borrow().clone()
    }

    pub fn highlighted_id(&self) -> Option<ClinicId> {
        self.selection.borrow().highlighted_id.clone()
    }

    pub fn route_destination(&self) -> Option<ResultItem> {
        self.selection.borrow().route_destination.clone()
    }

    /// Idempotent: subscribers are only notified when the value actually changes.
    pub fn set_highlight(&self, id: Option<ClinicId>) -> bool {
        self.selection.send_if_modified(|selection| {
            if selection.highlighted_id == id {
                false
            } else {
                tracing::trace!("highlight -> {:?}", id);
                selection.highlighted_id = id;
                true
            }
        })
    }

    /// Clears the highlight only if `id` still owns it (a late blur must not wipe a newer hover).
    pub fn clear_highlight(&self, id: &ClinicId) -> bool {
        self.selection.send_if_modified(|selection| {
            if selection.highlighted_id.as_ref() == Some(id) {
                selection.highlighted_id = None;
                true
            } else {
                false
            }
        })
    }

    /// Replaces the destination. Choosing one emits [`CoordinatorEvent::RouteSelected`].
    pub fn set_route_destination(&self, item: Option<ResultItem>) {
        let selected = item.as_ref().map(|item| item.id.clone());
        self.selection.send_modify(|selection| selection.route_destination = item);

        if let Some(id) = selected {
            tracing::debug!("route destination -> {}", id);
            // 沒有訂閱者時 send 會失敗，這是正常情況
            let _ = self.events.send(CoordinatorEvent::RouteSelected(id));
        }
    }

    /// Drops a highlight that points at a result no longer shown.
    pub fn retain_visible(&self, visible: &[ResultItem]) -> bool {
        self.selection.send_if_modified(|selection| {
            let hidden = matches!(
                &selection.highlighted_id,
                Some(id) if !visible.iter().any(|item| &item.id == id)
            );
            if hidden {
                selection.highlighted_id = None;
            }
            hidden
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewSelection> {
        self.selection.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.events.subscribe()
    }
}

impl Default for ViewCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// List renderer's handle on the shared selection.
pub struct ListBinding {
    coordinator: Rc<ViewCoordinator>,
    selection: watch::Receiver<ViewSelection>,
}

impl ListBinding {
    pub fn new(coordinator: Rc<ViewCoordinator>) -> Self {
        let selection = coordinator.subscribe();
        Self {
            coordinator,
            selection,
        }
    }

    pub fn highlighted_id(&self) -> Option<ClinicId> {
        self.selection.borrow().highlighted_id.clone()
    }

    pub fn is_highlighted(&self, id: &ClinicId) -> bool {
        self.selection.borrow().highlighted_id.as_ref() == Some(id)
    }

    pub fn route_destination(&self) -> Option<ResultItem> {
        self.selection.borrow().route_destination.clone()
    }

    /// Hover and keyboard focus behave the same.
    pub fn on_row_hover(&self, id: &ClinicId) {
        self.coordinator.set_highlight(Some(id.clone()));
    }

    pub fn on_row_blur(&self, id: &ClinicId) {
        self.coordinator.clear_highlight(id);
    }

    pub fn on_row_select(&self, item: &ResultItem) {
        self.coordinator.set_route_destination(Some(item.clone()));
    }

    /// True when the shared selection changed since the last [`ListBinding::mark_rendered`].
    pub fn needs_render(&self) -> bool {
        self.selection.has_changed().unwrap_or(false)
    }

    pub fn mark_rendered(&mut self) -> ViewSelection {
        self.selection.borrow_and_update().clone()
    }
}

/// Map renderer's handle; receives the map collaborator's marker callbacks.
pub struct MapBinding {
    coordinator: Rc<ViewCoordinator>,
    selection: watch::Receiver<ViewSelection>,
}

impl MapBinding {
    pub fn new(coordinator: Rc<ViewCoordinator>) -> Self {
        let selection = coordinator.subscribe();
        Self {
            coordinator,
            selection,
        }
    }

    pub fn highlighted_id(&self) -> Option<ClinicId> {
        self.selection.borrow().highlighted_id.clone()
    }

    pub fn is_highlighted(&self, id: &ClinicId) -> bool {
        self.selection.borrow().highlighted_id.as_ref() == Some(id)
    }

    pub fn route_destination(&self) -> Option<ResultItem> {
        self.selection.borrow().route_destination.clone()
    }

    pub fn on_marker_hover_change(&self, id: Option<ClinicId>) {
        self.coordinator.set_highlight(id);
    }

    /// Resolves the clicked marker against the rendered results. Unknown ids are ignored.
    pub fn on_marker_click(&self, id: &ClinicId, results: &[ResultItem]) -> bool {
        match results.iter().find(|item| &item.id == id) {
            Some(item) => {
                self.coordinator.set_route_destination(Some(item.clone()));
                true
            }
            None => {
                tracing::debug!("marker click for unknown clinic {}", id);
                false
            }
        }
    }

    pub fn needs_render(&self) -> bool {
        self.selection.has_changed().unwrap_or(false)
    }

    pub fn mark_rendered(&mut self) -> ViewSelection {
        self.selection.borrow_and_update().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Location;

    fn clinic(id: &str) -> ResultItem {
        ResultItem {
            id: ClinicId::new(id),
            name: format!("Clinic {}", id),
            address: "1 Test St".to_string(),
            coordinates: Location::new(14.6, 121.0),
            offered_service_ids: Default::default(),
            distance_km: 1.0,
        }
    }

    #[test]
    fn test_highlight_is_visible_from_both_views() {
        let coordinator = Rc::new(ViewCoordinator::new());
        let list = ListBinding::new(coordinator.clone());
        let map = MapBinding::new(coordinator.clone());

        coordinator.set_highlight(Some(ClinicId::new("x")));
        assert_eq!(list.highlighted_id(), Some(ClinicId::new("x")));
        assert_eq!(map.highlighted_id(), Some(ClinicId::new("x")));

        // 反方向：地圖 hover 反映到列表
        map.on_marker_hover_change(Some(ClinicId::new("y")));
        assert!(list.is_highlighted(&ClinicId::new("y")));
        map.on_marker_hover_change(None);
        assert_eq!(list.highlighted_id(), None);
    }

    #[test]
    fn test_set_highlight_is_idempotent() {
        let coordinator = Rc::new(ViewCoordinator::new());
        let mut list = ListBinding::new(coordinator.clone());

        assert!(coordinator.set_highlight(Some(ClinicId::new("a"))));
        assert!(list.needs_render());
        list.mark_rendered();

        assert!(!coordinator.set_highlight(Some(ClinicId::new("a"))));
        assert!(!list.needs_render());
    }

    #[test]
    fn test_late_blur_does_not_clear_newer_hover() {
        let coordinator = Rc::new(ViewCoordinator::new());
        let list = ListBinding::new(coordinator.clone());

        list.on_row_hover(&ClinicId::new("a"));
        list.on_row_hover(&ClinicId::new("b"));
        list.on_row_blur(&ClinicId::new("a"));
        assert_eq!(coordinator.highlighted_id(), Some(ClinicId::new("b")));

        list.on_row_blur(&ClinicId::new("b"));
        assert_eq!(coordinator.highlighted_id(), None);
    }

    #[test]
    fn test_route_selection_replaces_and_emits_event() {
        let coordinator = Rc::new(ViewCoordinator::new());
        let mut events = coordinator.subscribe_events();
        let list = ListBinding::new(coordinator.clone());

        list.on_row_select(&clinic("a"));
        list.on_row_select(&clinic("b"));

        assert_eq!(coordinator.route_destination().map(|c| c.id), Some(ClinicId::new("b")));
        assert_eq!(
            events.try_recv().unwrap(),
            CoordinatorEvent::RouteSelected(ClinicId::new("a"))
        );
        assert_eq!(
            events.try_recv().unwrap(),
            CoordinatorEvent::RouteSelected(ClinicId::new("b"))
        );
    }

    #[test]
    fn test_clearing_route_emits_nothing() {
        let coordinator = ViewCoordinator::new();
        let mut events = coordinator.subscribe_events();
        coordinator.set_route_destination(Some(clinic("a")));
        coordinator.set_route_destination(None);

        assert!(coordinator.route_destination().is_none());
        assert!(events.try_recv().is_ok());
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_marker_click_resolves_against_results() {
        let coordinator = Rc::new(ViewCoordinator::new());
        let map = MapBinding::new(coordinator.clone());
        let results = vec![clinic("a"), clinic("b")];

        assert!(map.on_marker_click(&ClinicId::new("b"), &results));
        assert_eq!(map.route_destination().map(|c| c.name), Some("Clinic b".to_string()));
        assert!(!map.on_marker_click(&ClinicId::new("zzz"), &results));
        assert_eq!(map.route_destination().map(|c| c.id), Some(ClinicId::new("b")));
    }

    #[test]
    fn test_retain_visible_drops_hidden_highlight() {
        let coordinator = ViewCoordinator::new();
        coordinator.set_highlight(Some(ClinicId::new("gone")));
        assert!(coordinator.retain_visible(&[clinic("a")]));
        assert_eq!(coordinator.highlighted_id(), None);

        coordinator.set_highlight(Some(ClinicId::new("a")));
        assert!(!coordinator.retain_visible(&[clinic("a")]));
    }
}
