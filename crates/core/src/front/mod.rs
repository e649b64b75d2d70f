//! Lagrangian fire front: closed marker loops in an index-addressed arena.
//!
//! The perimeter is one or more closed loops of markers, each marker carrying
//! position, velocity, and arrival time. Loops are linked through explicit
//! `next`/`prev` arena indices rather than pointer cycles, which keeps
//! ownership flat and makes snapshots cheap to walk.
//!
//! Fronts are authored clockwise, matching the ignition conventions of the
//! feeding adapter; the outward normal of a clockwise loop is the tangent
//! rotated by +90 degrees.

pub mod arena;

pub use arena::{FrontLoop, Marker};

use crate::core_types::Vec2;
use crate::error::{FireError, Result};
use arena::MarkerArena;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Geometric regularization thresholds for the front.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrontConfig {
    /// Maximum inter-marker spacing before a midpoint marker is inserted (m)
    pub perimeter_resolution: f64,
    /// Fraction of the resolution below which adjacent markers merge
    pub merge_fraction: f64,
    /// Loops with fewer live markers than this are retired
    pub min_loop_markers: usize,
}

impl Default for FrontConfig {
    fn default() -> Self {
        Self {
            perimeter_resolution: 10.0,
            merge_fraction: 0.3,
            min_loop_markers: 3,
        }
    }
}

/// Requested displacement for one marker: a spread rate along its outward
/// normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerMove {
    pub id: usize,
    /// Spread rate (m/s), applied along the marker's outward normal
    pub rate: f64,
}

/// Record of a marker whose arrival time crossed into the current step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BurnedMarker {
    pub position: Vec2,
    pub time: f64,
}

/// The fire perimeter of one spatial domain.
#[derive(Debug, Default)]
pub struct FireFront {
    arena: MarkerArena,
    config: FrontConfig,
    ignited: bool,
}

impl FireFront {
    pub fn new(config: FrontConfig) -> Self {
        Self {
            arena: MarkerArena::default(),
            config,
            ignited: false,
        }
    }

    /// Whether any ignition has ever happened on this front.
    pub fn is_ignited(&self) -> bool {
        self.ignited
    }

    pub fn marker_count(&self) -> usize {
        self.arena.live_count()
    }

    pub fn loop_count(&self) -> usize {
        self.arena.loop_count()
    }

    /// Construct a clockwise circular ignition front.
    ///
    /// The marker count is chosen from the perimeter resolution, with a floor
    /// that keeps the loop well above the retirement threshold.
    pub fn ignite_circle(&mut self, center: Vec2, radius: f64, t0: f64) {
        let circumference = 2.0 * std::f64::consts::PI * radius;
        let n = ((circumference / self.config.perimeter_resolution).ceil() as usize).max(8);

        let mut positions = Vec::with_capacity(n);
        for k in 0..n {
            // Negative angle increment walks the circle clockwise
            let theta = -2.0 * std::f64::consts::PI * (k as f64) / (n as f64);
            positions.push(center + radius * Vec2::new(theta.cos(), theta.sin()));
        }
        self.ignite_polygon(&positions, t0);
    }

    /// Construct an ignition front from clockwise-ordered vertices.
    pub fn ignite_polygon(&mut self, vertices: &[Vec2], t0: f64) {
        if vertices.len() < self.config.min_loop_markers {
            return;
        }
        self.arena.add_loop(vertices, t0);
        self.ignited = true;
        debug!(
            markers = vertices.len(),
            loops = self.arena.loop_count(),
            t0,
            "ignition front created"
        );
    }

    /// Live marker ids and positions, in arena order.
    pub fn live_markers(&self) -> Vec<(usize, Vec2)> {
        self.arena
            .iter_live()
            .map(|(id, m)| (id, m.position))
            .collect()
    }

    /// Outward normal at a live marker, from its neighbors' positions.
    pub fn outward_normal(&self, id: usize) -> Vec2 {
        self.arena.outward_normal(id)
    }

    /// Move every listed marker along its outward normal, then regularize.
    ///
    /// Markers receive `rate * dt` of displacement and an arrival-time stamp
    /// of `now`; arrival times never decrease. Regularization inserts
    /// midpoint markers where spacing exceeds the perimeter resolution,
    /// merges markers that collapsed together, excises pinched sub-loops,
    /// splices separate loops that have grown into contact, and retires
    /// loops that fell under the marker minimum.
    ///
    /// Returns the markers newly burned in this step. A front left with no
    /// live loops is an error: there is no valid silent empty state.
    pub fn advance(&mut self, moves: &[MarkerMove], dt: f64, now: f64) -> Result<Vec<BurnedMarker>> {
        let mut burned = Vec::with_capacity(moves.len());

        for mv in moves {
            let normal = self.arena.outward_normal(mv.id);
            if let Some(marker) = self.arena.get_mut(mv.id) {
                marker.velocity = normal * mv.rate;
                marker.position += marker.velocity * dt;
                marker.arrival_time = marker.arrival_time.max(now);
                burned.push(BurnedMarker {
                    position: marker.position,
                    time: now,
                });
            }
        }

        self.regularize(now);

        if self.arena.loop_count() == 0 {
            return Err(FireError::FrontExtinguished);
        }
        Ok(burned)
    }

    /// Loop-by-loop marker states for output snapshots.
    pub fn loops(&self) -> Vec<Vec<(Vec2, f64)>> {
        self.arena
            .loop_members()
            .into_iter()
            .map(|members| {
                members
                    .into_iter()
                    .filter_map(|id| self.arena.get(id).map(|m| (m.position, m.arrival_time)))
                    .collect()
            })
            .collect()
    }

    fn regularize(&mut self, now: f64) {
        let resolution = self.config.perimeter_resolution;
        let merge_dist = resolution * self.config.merge_fraction;

        self.arena.insert_midpoints(resolution, now);
        self.arena.merge_close_neighbors(merge_dist);
        self.arena.excise_pinches(merge_dist);
        self.arena.merge_touching_loops(merge_dist);
        let retired = self.arena.retire_small_loops(self.config.min_loop_markers);
        if retired > 0 {
            debug!(retired, remaining = self.arena.loop_count(), "loops retired");
        }
    }
}
