use crate::config::toml_config::LocatorConfig;
use crate::core::geo_search::{FetchDisposition, FetchOutcome, GeoSearchOrchestrator, SearchStatus};
use crate::core::layout::{
    LayoutMode, LayoutRegions, OverlayRouter, OverlayView, Rect, ResponsiveLayoutSwitch, Viewport,
};
use crate::core::panel_motion::{PanelMetrics, PanelMotionController};
use crate::core::view_coordinator::{CoordinatorEvent, ListBinding, MapBinding, ViewCoordinator};
use crate::core::{ClinicApi, GeolocationProvider};
use crate::domain::model::{
    ClinicId, ErrorNotice, Location, PanelState, ResultItem, Service, ServiceFilterSet, ServiceId,
};
use serde::Serialize;
use std::rc::Rc;
use tokio::sync::broadcast;

/// Everything the map collaborator needs to draw markers and the route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapProps {
    pub results: Vec<ResultItem>,
    pub highlighted_id: Option<ClinicId>,
    pub route_destination: Option<ResultItem>,
    pub user_location: Option<Location>,
}

/// List, filter form and search controls; hosted by the sidebar or the overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelContent {
    pub status: SearchStatus,
    pub loading: bool,
    pub results: Vec<ResultItem>,
    pub highlighted_id: Option<ClinicId>,
    pub services: Vec<Service>,
    pub filter: ServiceFilterSet,
    pub radius_km: f64,
    pub notice: Option<ErrorNotice>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayProps {
    pub view: OverlayView,
    pub panel_state: PanelState,
    pub height: f64,
    pub content_opacity: f64,
    pub content_inert: bool,
    pub content: PanelContent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Composition {
    SideBySide {
        sidebar_area: Rect,
        sidebar: PanelContent,
        map_area: Rect,
        map: MapProps,
    },
    Stacked {
        map_area: Rect,
        map: MapProps,
        overlay: OverlayProps,
    },
}

/// Composition root: owns the search, the panel and the layout switch, and routes
/// coordinator events between them.
pub struct DiscoveryScreen {
    search: GeoSearchOrchestrator,
    coordinator: Rc<ViewCoordinator>,
    panel: PanelMotionController,
    layout: ResponsiveLayoutSwitch,
    overlay: OverlayRouter,
    events: broadcast::Receiver<CoordinatorEvent>,
}

impl DiscoveryScreen {
    pub fn new(config: &LocatorConfig, viewport: Viewport) -> Self {
        let coordinator = Rc::new(ViewCoordinator::new());
        let events = coordinator.subscribe_events();
        Self {
            search: GeoSearchOrchestrator::new(&config.search),
            panel: PanelMotionController::new(
                PanelMetrics::new(viewport.height, viewport.top_inset),
                config.panel.clone(),
                PanelState::Partial,
            ),
            layout: ResponsiveLayoutSwitch::new(config.layout.clone(), viewport),
            overlay: OverlayRouter::default(),
            coordinator,
            events,
        }
    }

    pub fn search(&self) -> &GeoSearchOrchestrator {
        &self.search
    }

    pub fn search_mut(&mut self) -> &mut GeoSearchOrchestrator {
        &mut self.search
    }

    pub fn coordinator(&self) -> Rc<ViewCoordinator> {
        self.coordinator.clone()
    }

    pub fn list_binding(&self) -> ListBinding {
        ListBinding::new(self.coordinator.clone())
    }

    pub fn map_binding(&self) -> MapBinding {
        MapBinding::new(self.coordinator.clone())
    }

    pub fn panel(&self) -> &PanelMotionController {
        &self.panel
    }

    /// Gesture input is only accepted in the stacked layout.
    pub fn panel_mut(&mut self) -> Option<&mut PanelMotionController> {
        if self.layout.is_stacked() {
            Some(&mut self.panel)
        } else {
            None
        }
    }

    pub fn layout_mode(&self) -> LayoutMode {
        self.layout.mode()
    }

    pub fn overlay_view(&self) -> OverlayView {
        self.overlay.current()
    }

    pub fn show_overlay(&mut self, view: OverlayView) {
        self.overlay.show(view);
    }

    pub fn toggle_overlay(&mut self) -> OverlayView {
        self.overlay.toggle()
    }

    /// Pending route events are settled under the current layout before any flip.
    pub fn on_viewport_change(&mut self, viewport: Viewport) -> Option<LayoutMode> {
        self.pump_events();
        self.panel
            .set_metrics(PanelMetrics::new(viewport.height, viewport.top_inset));
        self.layout.on_viewport_change(viewport)
    }

    /// Drains coordinator events. A route selection collapses the panel, in stacked mode only.
    pub fn pump_events(&mut self) -> usize {
        let mut handled = 0;
        loop {
            match self.events.try_recv() {
                Ok(CoordinatorEvent::RouteSelected(id)) => {
                    handled += 1;
                    if self.layout.is_stacked() {
                        tracing::debug!("route to {} selected, collapsing panel", id);
                        self.panel.set_state(PanelState::Collapsed);
                    }
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    // 只有 RouteSelected 一種事件，漏掉的也一樣要收合
                    tracing::warn!("skipped {} coordinator events", skipped);
                    handled += skipped as usize;
                    if self.layout.is_stacked() {
                        self.panel.set_state(PanelState::Collapsed);
                    }
                }
                Err(_) => break,
            }
        }
        handled
    }

    pub fn select_route(&mut self, item: &ResultItem) {
        self.coordinator.set_route_destination(Some(item.clone()));
        self.pump_events();
    }

    pub fn on_marker_click(&mut self, id: &ClinicId) -> bool {
        let selected = MapBinding::new(self.coordinator.clone())
            .on_marker_click(id, self.search.filtered_results());
        self.pump_events();
        selected
    }

    pub fn set_service_filter(&mut self, filter: ServiceFilterSet) {
        self.search.set_service_filter(filter);
        self.coordinator.retain_visible(self.search.filtered_results());
    }

    pub fn toggle_service(&mut self, id: ServiceId) -> bool {
        let selected = self.search.toggle_service(id);
        self.coordinator.retain_visible(self.search.filtered_results());
        selected
    }

    pub fn set_radius(&mut self, km: f64) -> f64 {
        self.search.set_radius(km).km()
    }

    pub fn finish_fetch(&mut self, outcome: FetchOutcome) -> FetchDisposition {
        let disposition = self.search.complete(outcome);
        self.coordinator.retain_visible(self.search.filtered_results());
        disposition
    }

    pub async fn search_at<A: ClinicApi + ?Sized>(
        &mut self,
        api: &A,
        location: Location,
    ) -> FetchDisposition {
        let request = self.search.set_location(location);
        let outcome = GeoSearchOrchestrator::execute(api, &request).await;
        self.finish_fetch(outcome)
    }

    /// The "apply" action for the radius slider. `None` without a location fix.
    pub async fn apply_radius<A: ClinicApi + ?Sized>(&mut self, api: &A) -> Option<FetchDisposition> {
        let request = self.search.apply_radius()?;
        let outcome = GeoSearchOrchestrator::execute(api, &request).await;
        Some(self.finish_fetch(outcome))
    }

    /// Acquires a fix and searches around it. Geolocation failures become a notice.
    pub async fn locate<G, A>(&mut self, geolocation: &G, api: &A) -> Option<FetchDisposition>
    where
        G: GeolocationProvider + ?Sized,
        A: ClinicApi + ?Sized,
    {
        match geolocation.current_position().await {
            Ok(location) => Some(self.search_at(api, location).await),
            Err(e) => {
                self.search.report_geolocation_error(e);
                None
            }
        }
    }

    pub async fn load_services<A: ClinicApi + ?Sized>(&mut self, api: &A) -> bool {
        self.search.load_services(api).await
    }

    fn panel_content(&self) -> PanelContent {
        PanelContent {
            status: self.search.status(),
            loading: self.search.is_loading(),
            results: self.search.filtered_results().to_vec(),
            highlighted_id: self.coordinator.highlighted_id(),
            services: self.search.available_services().to_vec(),
            filter: self.search.service_filter().clone(),
            radius_km: self.search.radius().km(),
            notice: self.search.notice().cloned(),
        }
    }

    fn map_props(&self) -> MapProps {
        let selection = self.coordinator.snapshot();
        MapProps {
            results: self.search.filtered_results().to_vec(),
            highlighted_id: selection.highlighted_id,
            route_destination: selection.route_destination,
            user_location: self.search.location(),
        }
    }

    pub fn compose(&self) -> Composition {
        match self.layout.regions() {
            LayoutRegions::SideBySide { sidebar, map } => Composition::SideBySide {
                sidebar_area: sidebar,
                sidebar: self.panel_content(),
                map_area: map,
                map: self.map_props(),
            },
            LayoutRegions::Stacked { map } => Composition::Stacked {
                map_area: map,
                map: self.map_props(),
                overlay: OverlayProps {
                    view: self.overlay.current(),
                    panel_state: self.panel.state(),
                    height: self.panel.rendered_height(),
                    content_opacity: self.panel.content_opacity(),
                    content_inert: self.panel.is_content_inert(),
                    content: self.panel_content(),
                },
            },
        }
    }
}
