//! Vector type alias for 2D positions and directions.

use nalgebra::Vector2;

/// 2D vector type for marker positions, front normals, and wind components.
///
/// This is a simple alias for `nalgebra::Vector2<f64>`, used throughout
/// the engine for perimeter geometry and layer sampling coordinates.
pub type Vec2 = Vector2<f64>;
