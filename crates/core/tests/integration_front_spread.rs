//! End-to-end spread scenarios driven through the session surface.
//!
//! These tests run the full pipeline: parameter resolution, domain setup,
//! layer registration, ignition, event-driven propagation, and periodic
//! output capture.

use firefront_core::{
    CalendarMoment, DomainSetup, FireError, GridOrder, LayerShape, MemorySink, MeshGeometry,
    ParamValue, Session, SimState, Vec2, ARRIVAL_TIME_LAYER, WIND_U_LAYER, WIND_V_LAYER,
};

const MAP_SIZE: f64 = 1000.0;

fn square_setup() -> DomainSetup {
    DomainSetup {
        id: 1,
        moment: CalendarMoment::new(2024, 1, 1, 0.0),
        latitude: -33.8,
        longitude: 151.2,
        mesh: MeshGeometry::regular(
            Vec2::new(0.0, 0.0),
            Vec2::new(MAP_SIZE, MAP_SIZE),
            100,
            100,
        ),
        dt: 1.0,
    }
}

fn whole_domain_shape(time_span: f64) -> LayerShape {
    LayerShape {
        origin: Vec2::new(0.0, 0.0),
        extent: Vec2::new(MAP_SIZE, MAP_SIZE),
        time_origin: 0.0,
        time_span,
        nx: 1,
        ny: 1,
        nz: 1,
        nt: 1,
    }
}

/// Uniform spread from a point ignition grows a circle at the model rate
/// and emits one snapshot per output interval, including both endpoints.
#[test]
fn test_uniform_spread_circle_growth_and_output_cadence() {
    let sink = MemorySink::new();
    let mut session = Session::with_sink(Box::new(sink.clone()));
    session.set_parameter("outputsUpdate", ParamValue::Real(10.0));
    session.set_parameter("initialFrontDepth", ParamValue::Real(10.0));
    session.setup_domain(&square_setup()).unwrap();

    let center = Vec2::new(500.0, 500.0);
    session.ignite_point(center, None).unwrap();
    let status = session.advance_to(100.0).unwrap();

    assert_eq!(status.state, SimState::Ready);
    assert_eq!(status.time, 100.0);

    // Interval 10 over [0, 100] inclusive: 11 snapshots
    assert_eq!(status.outputs_emitted, 11);
    let snapshots = sink.snapshots();
    assert_eq!(snapshots.len(), 11);
    assert_eq!(snapshots[0].time, 0.0);
    assert_eq!(snapshots[10].time, 100.0);

    // Uniform model: 0.5 m/s for 100 s from a 10 m circle
    let expected_radius = 10.0 + 0.5 * 100.0;
    let loops = session.domain().unwrap().front().loops();
    assert_eq!(loops.len(), 1, "single expanding loop expected");
    for (position, _) in &loops[0] {
        let radius = (position - center).norm();
        assert!(
            (radius - expected_radius).abs() < 2.0,
            "marker at radius {radius:.2}, expected ~{expected_radius:.1}"
        );
    }

    // Growth keeps marker spacing bounded, so the loop must have subdivided
    let circumference = 2.0 * std::f64::consts::PI * expected_radius;
    let min_markers = (circumference / 10.0).floor() as usize;
    assert!(
        loops[0].len() >= min_markers,
        "only {} markers on a {circumference:.0} m perimeter",
        loops[0].len()
    );
}

/// The burned-arrival layer records first arrival under the moving front
/// and leaves untouched cells at the unburned sentinel.
#[test]
fn test_arrival_time_layer_stamped_by_spread() {
    let mut session = Session::new();
    session.set_parameter("initialFrontDepth", ParamValue::Real(10.0));
    session.setup_domain(&square_setup()).unwrap();
    session.ignite_point(Vec2::new(500.0, 500.0), None).unwrap();
    session.advance_to(100.0).unwrap();

    let (values, [nx, ny, _nz]) = session
        .sample_layer_grid(ARRIVAL_TIME_LAYER, None)
        .unwrap();
    assert_eq!(nx, 100);
    assert_eq!(ny, 100);

    let burned: Vec<f64> = values.iter().copied().filter(|v| *v >= 0.0).collect();
    assert!(
        burned.len() > 50,
        "front sweep should stamp the annulus it crossed, got {} cells",
        burned.len()
    );
    for arrival in &burned {
        assert!(*arrival <= 100.0, "arrival {arrival} after simulation end");
    }
    // Domain corner is far outside the burned disc
    assert_eq!(values[0], -1.0);
}

/// Wind-driven spread reaches farther downwind than upwind.
#[test]
fn test_wind_driven_spread_is_asymmetric() {
    let mut session = Session::new();
    session.set_parameter("propagationModel", ParamValue::Text("windDriven".to_owned()));
    session.setup_domain(&square_setup()).unwrap();
    session
        .register_scalar_layer(
            WIND_U_LAYER,
            whole_domain_shape(300.0),
            GridOrder::XFastest,
            vec![4.0],
        )
        .unwrap();
    session
        .register_scalar_layer(
            WIND_V_LAYER,
            whole_domain_shape(300.0),
            GridOrder::XFastest,
            vec![0.0],
        )
        .unwrap();

    let center = Vec2::new(500.0, 500.0);
    session.ignite_point(center, None).unwrap();
    session.advance_to(200.0).unwrap();

    let loops = session.domain().unwrap().front().loops();
    let max_east = loops[0]
        .iter()
        .map(|(p, _)| p.x - center.x)
        .fold(f64::NEG_INFINITY, f64::max);
    let max_west = loops[0]
        .iter()
        .map(|(p, _)| center.x - p.x)
        .fold(f64::NEG_INFINITY, f64::max);
    assert!(
        max_east > max_west + 20.0,
        "head fire east {max_east:.1} m should outrun flank west {max_west:.1} m"
    );
}

/// The same grid registered in either authored axis order samples
/// identically once normalized at ingestion.
#[test]
fn test_grid_order_normalized_at_registration() {
    let mut session = Session::new();
    session.setup_domain(&square_setup()).unwrap();

    let shape = LayerShape {
        origin: Vec2::new(0.0, 0.0),
        extent: Vec2::new(MAP_SIZE, MAP_SIZE),
        time_origin: 0.0,
        time_span: 0.0,
        nx: 2,
        ny: 3,
        nz: 1,
        nt: 1,
    };
    // v(x, y) = 10x + y on a 2x3 grid
    let x_fastest = vec![0.0, 10.0, 1.0, 11.0, 2.0, 12.0];
    let y_fastest = vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0];

    session
        .register_scalar_layer("alpha", shape.clone(), GridOrder::XFastest, x_fastest.clone())
        .unwrap();
    session
        .register_scalar_layer("beta", shape, GridOrder::YFastest, y_fastest)
        .unwrap();

    let (alpha, dims_a) = session.sample_layer_grid("alpha", Some(0.0)).unwrap();
    let (beta, dims_b) = session.sample_layer_grid("beta", Some(0.0)).unwrap();
    assert_eq!(dims_a, [2, 3, 1]);
    assert_eq!(dims_b, [2, 3, 1]);
    assert_eq!(alpha, x_fastest, "export is canonical x-fastest");
    assert_eq!(alpha, beta);
}

/// Registration validates declared shape against the supplied buffer.
#[test]
fn test_layer_dimension_mismatch_rejected() {
    let mut session = Session::new();
    session.setup_domain(&square_setup()).unwrap();

    let shape = LayerShape {
        origin: Vec2::new(0.0, 0.0),
        extent: Vec2::new(MAP_SIZE, MAP_SIZE),
        time_origin: 0.0,
        time_span: 0.0,
        nx: 2,
        ny: 3,
        nz: 1,
        nt: 1,
    };
    let result = session.register_scalar_layer("bad", shape, GridOrder::XFastest, vec![0.0; 5]);
    assert!(matches!(
        result,
        Err(FireError::DimensionMismatch {
            declared: 6,
            actual: 5,
            ..
        })
    ));
}

/// A zero-sized grid is rejected at registration instead of blowing up on
/// the first sample: an empty buffer trivially matches a zero cell count,
/// so the shape itself has to be checked.
#[test]
fn test_zero_sized_layer_rejected_at_registration() {
    let mut session = Session::new();
    session.setup_domain(&square_setup()).unwrap();

    let shape = LayerShape {
        origin: Vec2::new(0.0, 0.0),
        extent: Vec2::new(MAP_SIZE, MAP_SIZE),
        time_origin: 0.0,
        time_span: 0.0,
        nx: 0,
        ny: 0,
        nz: 1,
        nt: 1,
    };
    let result = session.register_scalar_layer("degenerate", shape, GridOrder::XFastest, vec![]);
    assert!(matches!(result, Err(FireError::ZeroSizedLayer { .. })));
    // The rejected layer never made it into the store
    assert!(matches!(
        session.sample_layer_grid("degenerate", None),
        Err(FireError::UnknownLayer(_))
    ));
}

/// Sampling a layer nobody registered reports the name.
#[test]
fn test_unknown_layer_reported_by_name() {
    let mut session = Session::new();
    session.setup_domain(&square_setup()).unwrap();
    let result = session.sample_layer_grid("no_such_layer", None);
    assert!(matches!(
        result,
        Err(FireError::UnknownLayer(name)) if name == "no_such_layer"
    ));
}
