//! Engine error types.
//!
//! Configuration and shape errors (`DimensionMismatch`, `UnknownLayer`,
//! `SessionNotConfigured`) surface immediately and leave all state unchanged.
//! `FrontExtinguished` is a physical outcome: it latches the simulator into a
//! terminal state and is surfaced once; later advance requests fail fast.

use thiserror::Error;

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, FireError>;

/// All errors the engine core can surface to a caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FireError {
    /// Declared raster dimensions disagree with the backing buffer length.
    #[error("layer '{name}': declared dimensions hold {declared} cells but buffer has {actual}")]
    DimensionMismatch {
        name: String,
        declared: usize,
        actual: usize,
    },

    /// A layer was declared with a zero-sized grid dimension.
    #[error("layer '{name}': grid dimensions must all be at least 1")]
    ZeroSizedLayer { name: String },

    /// A sample or export was requested for a name never registered.
    #[error("no layer registered under '{0}'")]
    UnknownLayer(String),

    /// The fire perimeter fully collapsed. Terminal for the run.
    #[error("fire front fully collapsed, no active markers remain")]
    FrontExtinguished,

    /// Query time outside a layer's declared span with clamping disabled.
    #[error("layer '{name}': query time {time} outside declared span [{t0}, {t1}]")]
    InvalidTimeRange {
        name: String,
        time: f64,
        t0: f64,
        t1: f64,
    },

    /// An operation was attempted before domain setup, or against a terminal
    /// simulator.
    #[error("session not configured: {0}")]
    SessionNotConfigured(&'static str),

    /// The setup calendar moment does not exist.
    #[error("invalid calendar moment {year:04}-{month:02}-{day:02}")]
    InvalidCalendar { year: i32, month: u32, day: u32 },
}
