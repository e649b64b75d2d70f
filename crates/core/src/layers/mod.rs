//! Raster layer subsystem: typed, named gridded datasets sampled by position
//! and time.
//!
//! Three layer kinds share one shape contract. Scalar layers hold continuous
//! fields (wind components, moisture), index layers hold integer-coded fields
//! (fuel type), and flux layers are written by the simulation itself (burned
//! arrival time). Axis order is normalized once at registration; every query
//! reads canonical storage.

pub mod raster;
pub mod store;

pub use raster::{GridOrder, LayerKind, LayerShape, RasterLayer};
pub use store::LayerStore;
