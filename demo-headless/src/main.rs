use clap::Parser;
use firefront_core::{
    CalendarMoment, DomainSetup, FireError, GridOrder, LayerShape, MemorySink, MeshGeometry,
    ParamValue, Session, Vec2, ARRIVAL_TIME_LAYER, WIND_U_LAYER, WIND_V_LAYER,
};

/// Headless wildfire-spread run with configurable parameters
#[derive(Parser, Debug)]
#[command(name = "firefront-demo")]
#[command(about = "Marker-front fire spread demo", long_about = None)]
struct Args {
    /// Simulation duration in seconds
    #[arg(short, long, default_value_t = 300.0)]
    duration: f64,

    /// Wind speed in m/s (blowing along +x)
    #[arg(short, long, default_value_t = 4.0)]
    wind_speed: f64,

    /// Spread model (uniform, windDriven, Rothermel)
    #[arg(short, long, default_value = "windDriven")]
    model: String,

    /// Maximum inter-marker spacing in meters
    #[arg(short, long, default_value_t = 10.0)]
    resolution: f64,

    /// Square domain side length in meters
    #[arg(long, default_value_t = 2000.0)]
    map_size: f64,

    /// Seconds between front snapshots
    #[arg(short, long, default_value_t = 30.0)]
    outputs_update: f64,
}

fn run(args: &Args) -> Result<(), FireError> {
    let sink = MemorySink::new();
    let mut session = Session::with_sink(Box::new(sink.clone()));
    session.set_parameter("propagationModel", ParamValue::Text(args.model.clone()));
    session.set_parameter("perimeterResolution", ParamValue::Real(args.resolution));
    session.set_parameter("outputsUpdate", ParamValue::Real(args.outputs_update));
    session.set_parameter("initialFrontDepth", ParamValue::Real(20.0));
    session.set_parameter("minSpeed", ParamValue::Real(0.01));

    let setup = DomainSetup {
        id: 1,
        moment: CalendarMoment::new(2026, 1, 15, 12.0 * 3600.0),
        latitude: -33.8,
        longitude: 151.2,
        mesh: MeshGeometry::regular(
            Vec2::new(0.0, 0.0),
            Vec2::new(args.map_size, args.map_size),
            200,
            200,
        ),
        dt: 1.0,
    };
    session.setup_domain(&setup)?;
    println!(
        "Created {:.0}x{:.0}m domain, model '{}'",
        args.map_size, args.map_size, args.model
    );

    // Uniform wind over the whole domain and run window
    let t0 = session.current_time().unwrap_or(0.0);
    let wind_shape = LayerShape {
        origin: Vec2::new(0.0, 0.0),
        extent: Vec2::new(args.map_size, args.map_size),
        time_origin: t0,
        time_span: args.duration,
        nx: 1,
        ny: 1,
        nz: 1,
        nt: 1,
    };
    session.register_scalar_layer(
        WIND_U_LAYER,
        wind_shape.clone(),
        GridOrder::XFastest,
        vec![args.wind_speed],
    )?;
    session.register_scalar_layer(WIND_V_LAYER, wind_shape, GridOrder::XFastest, vec![0.0])?;

    let center = Vec2::new(args.map_size / 2.0, args.map_size / 2.0);
    println!(
        "Wind: {:.1} m/s along +x, ignition at ({:.0}, {:.0})",
        args.wind_speed, center.x, center.y
    );
    session.ignite_point(center, None)?;

    let status = session.advance_to(t0 + args.duration)?;
    println!(
        "\nFinished at t={:.0}s: state {:?}, {} markers in {} loop(s), {} snapshots emitted",
        status.time, status.state, status.marker_count, status.loop_count, status.outputs_emitted
    );

    for snapshot in sink.snapshots() {
        let markers: usize = snapshot.loops.iter().map(Vec::len).sum();
        println!("  t={:>6.0}s  {} markers", snapshot.time - t0, markers);
    }

    let (values, [nx, ny, _]) = session.sample_layer_grid(ARRIVAL_TIME_LAYER, None)?;
    let burned = values.iter().filter(|v| **v >= 0.0).count();
    println!(
        "Burned {} of {} cells ({:.1}%)",
        burned,
        nx * ny,
        100.0 * burned as f64 / (nx * ny) as f64
    );
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    println!("=== Fire Front Demo ===\n");
    if let Err(err) = run(&args) {
        eprintln!("simulation failed: {err}");
        std::process::exit(1);
    }
}
