//! Fire Front Simulation Core Library
//!
//! A discrete-event wildfire spread engine built around a Lagrangian marker
//! front. One session owns a spatial domain (mesh geometry, fire front,
//! raster layer store), a time-ordered event queue, and a simulator that
//! drains due events, advances the perimeter, and emits periodic output
//! snapshots.
//!
//! ## Engine structure
//!
//! - Environmental data (wind, fuel, moisture, slope) enters as named raster
//!   layers sampled by position and time
//! - The fire perimeter is a set of closed marker loops held in an
//!   index-addressed arena
//! - Local spread rate is computed by a pluggable `SpreadModel`
//! - The simulation itself writes derived flux layers (burned arrival time)

// Core types and utilities
pub mod core_types;
pub mod error;

// Engine components, leaf-first
pub mod layers;
pub mod front;
pub mod domain;
pub mod schedule;
pub mod simulator;
pub mod session;

// Re-export core types
pub use core_types::{CalendarMoment, ReferenceTime, Vec2};
pub use error::{FireError, Result};

// Re-export engine types
pub use domain::{
    spread_model_by_name, DomainSetup, FuelProperties, MeshGeometry, RothermelSpread,
    SpatialDomain, SpreadModel, SpreadSample, UniformSpread, WindDrivenSpread,
    ARRIVAL_TIME_LAYER, FUEL_LAYER, MOISTURE_LAYER, SLOPE_LAYER, WIND_U_LAYER, WIND_V_LAYER,
};
pub use front::{BurnedMarker, FireFront, FrontConfig, MarkerMove};
pub use layers::{GridOrder, LayerKind, LayerShape, LayerStore, RasterLayer};
pub use schedule::{EventPayload, EventQueue, ScheduledEvent};
pub use session::{ParamValue, ParameterSet, Session, SessionConfig};
pub use simulator::{
    FrontSnapshot, MarkerState, MemorySink, NullSink, OutputSink, SimState, SimStatus, Simulator,
};
