//! Core types shared across the engine: vector alias and time arithmetic.

pub mod time;
pub mod vec2;

pub use time::{CalendarMoment, ReferenceTime};
pub use vec2::Vec2;
