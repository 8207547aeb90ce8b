use skysweep_engine::camera::{CameraRequest, Viewport};
use skysweep_engine::config::OverlayCfg;
use skysweep_engine::events::MapEvent;
use skysweep_engine::geo::{GeoBounds, LatLon};
use skysweep_engine::layers::LayerKey;
use skysweep_engine::overpass::OverpassResponse;
use skysweep_engine::roads::RoadFetchError;
use skysweep_engine::session::MapSession;
use skysweep_engine::subgrid::SubgridPhase;

const CLICK: (f64, f64) = (40.153654, -105.109248);
const ROADS_JSON: &str = r#"{
    "elements": [
        {
            "type": "way",
            "id": 4242,
            "tags": {"highway": "residential", "name": "Quail Rd"},
            "geometry": [
                {"lat": 40.181, "lon": -105.09},
                {"lat": 40.182, "lon": -105.088},
                {"lat": 40.1835, "lon": -105.0865}
            ]
        }
    ]
}"#;

fn viewport() -> Viewport {
    Viewport::new(GeoBounds::from_edges(40.0, -105.2, 40.3, -104.9), 12.0)
}

fn new_session(seed: u64) -> MapSession {
    MapSession::new(OverlayCfg::default(), seed, viewport())
}

fn settle_ms(session: &MapSession) -> u64 {
    let scan = &session.config().scan;
    scan.cell_count() as u64 * scan.reveal_delay_ms
        + u64::from(scan.flash_repeats) * scan.flash_interval_ms
}

/// Drive a session to the point where a subcell is selected.
fn scan_to_subcell(session: &mut MapSession) {
    session.toggle_grid();
    session.click(CLICK.0, CLICK.1);
    session.start_subgrid_scan(0);
    let settle = settle_ms(session);
    session.tick(settle);
    assert_eq!(session.subgrid_phase(), SubgridPhase::SubcellSelected);
}

fn event_names(session: &mut MapSession) -> Vec<String> {
    session
        .drain_events()
        .iter()
        .map(|record| record.event.name().to_string())
        .collect()
}

#[test]
fn toggle_draws_grid_and_emits() {
    let mut session = new_session(1);
    assert!(!session.is_grid_visible());

    session.toggle_grid();
    assert!(session.is_grid_visible());
    assert!(session.state().grid_visible);
    assert!(session.layers().len(LayerKey::GridLines) > 0);
    // Zoom 12 is above the label threshold, so labels come along.
    assert!(session.layers().len(LayerKey::GridLabels) > 0);

    let records = session.drain_events();
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].event,
        MapEvent::GridToggled { visible: true }
    );
}

#[test]
fn labels_respect_zoom_threshold() {
    let mut session = MapSession::new(
        OverlayCfg::default(),
        1,
        Viewport::new(GeoBounds::from_edges(40.0, -105.2, 40.3, -104.9), 8.0),
    );
    session.toggle_grid();
    assert!(session.layers().len(LayerKey::GridLines) > 0);
    assert_eq!(session.layers().len(LayerKey::GridLabels), 0);
}

#[test]
fn toggle_twice_restores_prior_state_without_leaks() {
    let mut session = new_session(1);
    session.toggle_grid();
    let lines_before = session.layers().len(LayerKey::GridLines);

    session.toggle_grid();
    assert!(!session.is_grid_visible());
    assert!(session.layers().is_empty(), "hidden grid leaked layers");
    assert!(session.state().selected_cell_bounds.is_none());

    session.toggle_grid();
    assert!(session.is_grid_visible());
    assert_eq!(session.layers().len(LayerKey::GridLines), lines_before);

    let names = event_names(&mut session);
    assert_eq!(names, ["gridToggled", "gridToggled", "gridToggled"]);
}

#[test]
fn zero_area_viewport_draws_nothing() {
    let mut session = MapSession::new(
        OverlayCfg::default(),
        1,
        Viewport::new(GeoBounds::from_edges(40.0, -105.0, 40.0, -105.0), 12.0),
    );
    session.toggle_grid();
    assert!(session.is_grid_visible());
    assert_eq!(session.layers().len(LayerKey::GridLines), 0);
}

#[test]
fn click_selects_cell_and_emits_bounds() {
    let mut session = new_session(1);
    session.toggle_grid();
    session.click(CLICK.0, CLICK.1);

    let bounds = session.state().selected_cell_bounds.expect("selection");
    assert!(bounds.contains(LatLon::new(CLICK.0, CLICK.1)));
    assert_eq!(session.layers().len(LayerKey::GridHighlight), 1);
    assert_eq!(session.subgrid_phase(), SubgridPhase::ParentSelected);

    let records = session.drain_events();
    assert!(records.iter().any(|record| matches!(
        record.event,
        MapEvent::GridCellSelected { bounds: b } if b == bounds
    )));
}

#[test]
fn clicks_are_ignored_while_hidden() {
    let mut session = new_session(1);
    session.click(CLICK.0, CLICK.1);
    assert!(session.state().selected_cell_bounds.is_none());
    assert!(session.drain_events().is_empty());
}

#[test]
fn double_click_requests_fly_to() {
    let mut session = new_session(1);
    session.toggle_grid();
    session.double_click(CLICK.0, CLICK.1);
    let requests = session.take_camera_requests();
    assert_eq!(requests.len(), 1);
    match &requests[0] {
        CameraRequest::FlyTo { center, zoom, duration_ms } => {
            let cell_bounds = skysweep_engine::grid::cell_for_lat_lon(
                CLICK.0,
                CLICK.1,
                session.config().grid.step_deg,
            )
            .unwrap()
            .bounds;
            assert_eq!(*center, cell_bounds.center());
            assert!((*zoom - session.config().camera.cell_focus_zoom).abs() < f64::EPSILON);
            assert_eq!(*duration_ms, session.config().camera.fly_duration_ms);
        }
        other => panic!("unexpected camera request: {other:?}"),
    }
    // Double click changes no selection state.
    assert!(session.state().selected_cell_bounds.is_none());
}

#[test]
fn keyboard_toggle_respects_text_input_focus() {
    let mut session = new_session(1);
    assert!(!session.handle_key('g', true));
    assert!(!session.is_grid_visible());

    assert!(session.handle_key('g', false));
    assert!(session.is_grid_visible());

    assert!(!session.handle_key('x', false));
    assert!(session.is_grid_visible());
}

#[test]
fn viewport_change_redraws_and_keeps_highlight() {
    let mut session = new_session(1);
    session.toggle_grid();
    session.click(CLICK.0, CLICK.1);
    let bounds = session.state().selected_cell_bounds.expect("selection");

    session.set_viewport(Viewport::new(
        GeoBounds::from_edges(40.05, -105.25, 40.35, -104.95),
        12.0,
    ));
    assert!(session.layers().len(LayerKey::GridLines) > 0);
    assert_eq!(session.layers().len(LayerKey::GridHighlight), 1);
    assert_eq!(session.state().selected_cell_bounds, Some(bounds));
}

#[test]
fn road_mapping_happy_path_with_origin() {
    let mut session = new_session(1);
    scan_to_subcell(&mut session);
    session.drain_events();
    session.take_camera_requests();

    let origin = LatLon::new(40.0, -105.27);
    let request = session
        .begin_road_mapping(Some(origin))
        .expect("subcell selected");
    assert_eq!(request.token, 1);
    assert!(request.query.contains("highway"));
    assert!(request.query.contains("[timeout:25]"));

    let response = OverpassResponse::from_json(ROADS_JSON).expect("parse");
    session.apply_road_response(request.token, Ok(response));

    assert!(session.state().road_mapping_completed);
    let collection = session.state().road_geojson.as_ref().expect("stored data");
    assert_eq!(collection.len(), 1);
    assert_eq!(session.layers().len(LayerKey::Roads), 1);
    // Reference line plus its distance label.
    assert_eq!(session.layers().len(LayerKey::ReferenceLine), 2);

    let names = event_names(&mut session);
    assert_eq!(names, ["roadMappingStarted", "roadMappingCompleted"]);

    let requests = session.take_camera_requests();
    assert!(requests.iter().any(|request| matches!(
        request,
        CameraRequest::FitBounds { bounds, .. } if bounds.contains(origin)
    )));
}

#[test]
fn road_mapping_without_origin_draws_no_reference_line() {
    let mut session = new_session(1);
    scan_to_subcell(&mut session);
    let request = session.begin_road_mapping(None).expect("subcell selected");
    let response = OverpassResponse::from_json(ROADS_JSON).expect("parse");
    session.apply_road_response(request.token, Ok(response));
    assert_eq!(session.layers().len(LayerKey::ReferenceLine), 0);
    assert!(session.state().road_mapping_completed);
}

#[test]
fn empty_result_completes_without_success() {
    let mut session = new_session(1);
    scan_to_subcell(&mut session);
    session.drain_events();

    let request = session.begin_road_mapping(None).expect("subcell selected");
    session.apply_road_response(request.token, Ok(OverpassResponse::default()));

    assert!(!session.state().road_mapping_completed);
    assert!(session.state().road_geojson.is_none());
    assert_eq!(session.layers().len(LayerKey::Roads), 0);

    let records = session.drain_events();
    assert!(records.iter().any(|record| matches!(
        &record.event,
        MapEvent::RoadMappingCompleted { success: false, message: Some(_), data: None }
    )));
}

#[test]
fn fetch_failure_emits_failed_event() {
    let mut session = new_session(1);
    scan_to_subcell(&mut session);
    session.drain_events();

    let request = session.begin_road_mapping(None).expect("subcell selected");
    session.apply_road_response(request.token, Err(RoadFetchError::Timeout));

    let records = session.drain_events();
    assert!(records.iter().any(|record| matches!(
        &record.event,
        MapEvent::RoadMappingFailed { error } if error.contains("timed out")
    )));
    assert!(!session.state().road_mapping_completed);
}

#[test]
fn stale_response_is_dropped_entirely() {
    let mut session = new_session(1);
    scan_to_subcell(&mut session);
    session.drain_events();

    let first = session.begin_road_mapping(None).expect("subcell selected");
    let second = session.begin_road_mapping(None).expect("subcell selected");
    assert!(second.token > first.token);

    // The stale response must not render or emit anything.
    let response = OverpassResponse::from_json(ROADS_JSON).expect("parse");
    session.apply_road_response(first.token, Ok(response.clone()));
    assert_eq!(session.layers().len(LayerKey::Roads), 0);
    let names = event_names(&mut session);
    assert_eq!(names, ["roadMappingStarted", "roadMappingStarted"]);

    // The latest token still applies normally.
    session.apply_road_response(second.token, Ok(response));
    assert_eq!(session.layers().len(LayerKey::Roads), 1);
    assert!(session.state().road_mapping_completed);
}

#[test]
fn road_mapping_without_subcell_is_a_no_op() {
    let mut session = new_session(1);
    session.toggle_grid();
    session.click(CLICK.0, CLICK.1);
    session.drain_events();

    assert!(session.begin_road_mapping(None).is_none());
    assert!(session.drain_events().is_empty());
}

#[test]
fn new_parent_selection_invalidates_subcell_and_roads() {
    let mut session = new_session(1);
    scan_to_subcell(&mut session);
    let request = session.begin_road_mapping(None).expect("subcell selected");
    let response = OverpassResponse::from_json(ROADS_JSON).expect("parse");
    session.apply_road_response(request.token, Ok(response));
    assert!(session.state().road_mapping_completed);
    session.drain_events();

    // Click a different primary cell.
    session.click(40.05, -105.15);
    assert!(session.state().selected_subcell.is_none());
    assert!(session.state().road_geojson.is_none());
    assert!(!session.state().road_mapping_completed);
    assert!(!session.state().scan_completed);
    assert_eq!(session.layers().len(LayerKey::Roads), 0);
    assert_eq!(session.layers().len(LayerKey::Subgrid), 0);
    assert_eq!(session.subgrid_phase(), SubgridPhase::ParentSelected);

    // The invalidation happened before any further subgrid selection event.
    let names = event_names(&mut session);
    assert_eq!(names, ["gridCellSelected"]);
}

#[test]
fn in_flight_fetch_is_cancelled_by_new_parent() {
    let mut session = new_session(1);
    scan_to_subcell(&mut session);
    let request = session.begin_road_mapping(None).expect("subcell selected");
    session.click(40.05, -105.15);
    session.drain_events();

    // The response arrives after the selection moved on; nothing may render.
    let response = OverpassResponse::from_json(ROADS_JSON).expect("parse");
    session.apply_road_response(request.token, Ok(response));
    assert_eq!(session.layers().len(LayerKey::Roads), 0);
    assert!(session.state().road_geojson.is_none());
    assert!(session.drain_events().is_empty());
}

#[test]
fn hiding_grid_tears_everything_down() {
    let mut session = new_session(1);
    scan_to_subcell(&mut session);
    let request = session.begin_road_mapping(None).expect("subcell selected");
    let response = OverpassResponse::from_json(ROADS_JSON).expect("parse");
    session.apply_road_response(request.token, Ok(response));
    session.drain_events();

    session.toggle_grid();
    assert!(!session.is_grid_visible());
    assert_eq!(session.subgrid_phase(), SubgridPhase::Idle);
    assert!(session.layers().is_empty());
    assert_eq!(session.state(), &skysweep_engine::state::SelectionState::default());

    let records = session.drain_events();
    assert!(records.iter().any(|record| matches!(
        record.event,
        MapEvent::GridToggled { visible: false }
    )));
}

#[test]
fn hiding_mid_scan_reports_unsuccessful_completion() {
    let mut session = new_session(1);
    session.toggle_grid();
    session.click(CLICK.0, CLICK.1);
    session.start_subgrid_scan(0);
    session.tick(300);
    assert_eq!(session.subgrid_phase(), SubgridPhase::Scanning);
    session.drain_events();

    session.toggle_grid();
    let records = session.drain_events();
    assert!(records.iter().any(|record| matches!(
        record.event,
        MapEvent::ScanCompleted { success: false }
    )));
    assert_eq!(session.subgrid_phase(), SubgridPhase::Idle);
}
