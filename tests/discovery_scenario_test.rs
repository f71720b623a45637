use anyhow::Result;
use clinic_locator::core::geo_search::{FetchDisposition, GeoSearchOrchestrator, SearchStatus};
use clinic_locator::core::layout::Viewport;
use clinic_locator::domain::model::{ClinicId, Location, NoticeKind, PanelState, ServiceFilterSet};
use clinic_locator::{Composition, DiscoveryScreen, FixedGeolocation, HttpClinicApi, LocatorConfig};
use httpmock::prelude::*;

fn clinic_a() -> serde_json::Value {
    serde_json::json!({
        "id": "clinic-a",
        "name": "ClinicA",
        "address": "1 Taft Avenue, Manila",
        "coordinates": {"latitude": 14.61, "longitude": 121.01},
        "serviceIds": ["svc1"],
        "distance": 2.0
    })
}

fn narrow_screen() -> DiscoveryScreen {
    DiscoveryScreen::new(&LocatorConfig::default(), Viewport::new(390.0, 844.0, 47.0))
}

#[tokio::test]
async fn test_nearby_scenario_with_service_filters() -> Result<()> {
    let server = MockServer::start_async().await;
    // ClinicB (8km) 已被伺服器依半徑排除
    let clinics_mock = server.mock_async(|when, then| {
        when.method(GET)
            .path("/clinics")
            .query_param("latitude", "14.6")
            .query_param("radius", "5000");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({ "data": [clinic_a()] }));
    }).await;
    let services_mock = server.mock_async(|when, then| {
        when.method(GET).path("/services");
        then.status(200).json_body(serde_json::json!({
            "data": [{"id": "svc1", "name": "Check-up"}, {"id": "svc2", "name": "Dental"}]
        }));
    }).await;

    let api = HttpClinicApi::new(&server.base_url())?;
    let geolocation = FixedGeolocation::at(Location::new(14.60, 121.00));
    let mut screen = narrow_screen();

    assert!(screen.load_services(&api).await);
    assert_eq!(
        screen.locate(&geolocation, &api).await,
        Some(FetchDisposition::Applied(1))
    );
    clinics_mock.assert_async().await;
    services_mock.assert_async().await;
    assert_eq!(screen.search().available_services().len(), 2);

    screen.set_service_filter(["svc1"].into_iter().collect());
    let names: Vec<_> = screen
        .search()
        .filtered_results()
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, vec!["ClinicA"]);

    screen.set_service_filter(["svc2"].into_iter().collect());
    assert!(screen.search().filtered_results().is_empty());
    assert_eq!(screen.search().status(), SearchStatus::Empty);
    assert!(!screen.search().has_error());

    // 過濾只在本地端進行，不會再打 API
    clinics_mock.assert_hits_async(1).await;
    Ok(())
}

#[tokio::test]
async fn test_failed_refetch_keeps_last_good_results() -> Result<()> {
    let server = MockServer::start_async().await;
    let ok_mock = server.mock_async(|when, then| {
        when.method(GET).path("/clinics").query_param("radius", "5000");
        then.status(200)
            .json_body(serde_json::json!({ "data": [clinic_a()] }));
    }).await;
    let failing_mock = server.mock_async(|when, then| {
        when.method(GET).path("/clinics").query_param("radius", "10000");
        then.status(500);
    }).await;

    let api = HttpClinicApi::new(&server.base_url())?;
    let mut screen = narrow_screen();
    screen.search_at(&api, Location::new(14.60, 121.00)).await;
    let before = screen.search().raw_results().to_vec();

    // 拖動滑桿不會發請求，按下套用才會
    assert_eq!(screen.set_radius(10.0), 10.0);
    ok_mock.assert_hits_async(1).await;
    assert_eq!(screen.apply_radius(&api).await, Some(FetchDisposition::Failed));
    failing_mock.assert_async().await;

    assert_eq!(screen.search().raw_results(), before.as_slice());
    assert_eq!(screen.search().status(), SearchStatus::Ready(1));
    assert_eq!(
        screen.search().notice().map(|n| n.kind),
        Some(NoticeKind::Network)
    );

    screen.search_mut().dismiss_notice();
    assert!(!screen.search().has_error());
    Ok(())
}

#[tokio::test]
async fn test_superseded_request_is_dropped() -> Result<()> {
    let server = MockServer::start_async().await;
    server.mock_async(|when, then| {
        when.method(GET).path("/clinics").query_param("latitude", "1.5");
        then.status(200).json_body(serde_json::json!({ "data": [] }));
    }).await;
    server.mock_async(|when, then| {
        when.method(GET).path("/clinics").query_param("latitude", "2.5");
        then.status(200)
            .json_body(serde_json::json!({ "data": [clinic_a()] }));
    }).await;

    let api = HttpClinicApi::new(&server.base_url())?;
    let mut screen = narrow_screen();

    let first = screen.search_mut().set_location(Location::new(1.5, 121.0));
    let second = screen.search_mut().set_location(Location::new(2.5, 121.0));

    // 新請求先回來，舊請求晚到
    let newer = GeoSearchOrchestrator::execute(&api, &second).await;
    let older = GeoSearchOrchestrator::execute(&api, &first).await;
    assert_eq!(screen.finish_fetch(newer), FetchDisposition::Applied(1));
    assert_eq!(screen.finish_fetch(older), FetchDisposition::Stale);

    assert_eq!(screen.search().filtered_results().len(), 1);
    assert_eq!(screen.search().location(), Some(Location::new(2.5, 121.0)));
    Ok(())
}

#[tokio::test]
async fn test_marker_click_routes_and_collapses_panel() -> Result<()> {
    let server = MockServer::start_async().await;
    server.mock_async(|when, then| {
        when.method(GET).path("/clinics");
        then.status(200)
            .json_body(serde_json::json!({ "data": [clinic_a()] }));
    }).await;

    let api = HttpClinicApi::new(&server.base_url())?;
    let mut screen = narrow_screen();
    screen.search_at(&api, Location::new(14.60, 121.00)).await;

    let list = screen.list_binding();
    let map = screen.map_binding();
    map.on_marker_hover_change(Some(ClinicId::new("clinic-a")));
    assert_eq!(list.highlighted_id(), Some(ClinicId::new("clinic-a")));
    assert_eq!(map.highlighted_id(), list.highlighted_id());

    assert!(screen.on_marker_click(&ClinicId::new("clinic-a")));
    assert_eq!(screen.panel().state(), PanelState::Collapsed);
    if let Some(panel) = screen.panel_mut() {
        panel.tick(1_000.0);
    }

    match screen.compose() {
        Composition::Stacked { map, overlay, .. } => {
            assert_eq!(
                map.route_destination.map(|c| c.name),
                Some("ClinicA".to_string())
            );
            assert!(overlay.content_inert);
        }
        other => panic!("expected stacked layout, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_composition_serializes_for_the_host() -> Result<()> {
    let mut screen = DiscoveryScreen::new(&LocatorConfig::default(), Viewport::new(1280.0, 800.0, 0.0));
    let filter: ServiceFilterSet = ["svc2", "svc1", "svc2"].into_iter().collect();
    screen.set_service_filter(filter);

    let json = serde_json::to_value(screen.compose())?;
    assert_eq!(json["mode"], "side_by_side");
    assert_eq!(json["sidebar"]["filter"], serde_json::json!(["svc1", "svc2"]));
    assert_eq!(json["sidebar"]["status"], "awaiting_location");
    Ok(())
}
