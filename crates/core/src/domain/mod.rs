//! Spatial domain: mesh geometry, fire front, raster layers, and the local
//! spread-rate computation that ties them together.
//!
//! The domain owns exactly one front and one layer store; both live and die
//! with it. A `step` samples the environment at every live marker (fanned out
//! with rayon), advances the front, and stamps newly burned cells into the
//! burned-arrival flux layer the domain registers for itself at creation.

pub mod spread;

pub use spread::{
    spread_model_by_name, FuelProperties, RothermelSpread, SpreadModel, SpreadSample,
    UniformSpread, WindDrivenSpread,
};

use crate::core_types::{CalendarMoment, ReferenceTime, Vec2};
use crate::error::{FireError, Result};
use crate::front::{BurnedMarker, FireFront, FrontConfig, MarkerMove};
use crate::layers::{LayerShape, LayerStore, RasterLayer};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Flux layer the domain writes first-arrival times into.
pub const ARRIVAL_TIME_LAYER: &str = "arrival_time";
/// Conventional environmental layer names, matching the feeding datasets.
pub const WIND_U_LAYER: &str = "windU";
pub const WIND_V_LAYER: &str = "windV";
pub const FUEL_LAYER: &str = "fuel";
pub const MOISTURE_LAYER: &str = "moisture";
pub const SLOPE_LAYER: &str = "slope";

/// Sentinel stored in unburned arrival-time cells.
const UNBURNED: f64 = -1.0;

/// Moisture assumed when no moisture layer is registered (fraction).
const DEFAULT_MOISTURE: f64 = 0.08;

/// 3-D mesh geometry: horizontal node coordinates plus vertical levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshGeometry {
    /// Node x coordinates, ascending (m)
    pub x: Vec<f64>,
    /// Node y coordinates, ascending (m)
    pub y: Vec<f64>,
    /// Vertical level heights (m)
    pub levels: Vec<f64>,
}

impl MeshGeometry {
    /// Regular mesh over a rectangle with `nx` by `ny` cells.
    pub fn regular(sw: Vec2, extent: Vec2, nx: usize, ny: usize) -> Self {
        let x = (0..=nx)
            .map(|i| sw.x + extent.x * (i as f64) / (nx as f64))
            .collect();
        let y = (0..=ny)
            .map(|j| sw.y + extent.y * (j as f64) / (ny as f64))
            .collect();
        Self {
            x,
            y,
            levels: vec![0.0],
        }
    }

    /// South-west corner of the mesh.
    pub fn sw(&self) -> Vec2 {
        Vec2::new(
            self.x.first().copied().unwrap_or(0.0),
            self.y.first().copied().unwrap_or(0.0),
        )
    }

    /// Horizontal footprint of the mesh.
    pub fn extent(&self) -> Vec2 {
        let sw = self.sw();
        Vec2::new(
            self.x.last().copied().unwrap_or(0.0) - sw.x,
            self.y.last().copied().unwrap_or(0.0) - sw.y,
        )
    }

    /// Horizontal cell counts.
    pub fn cells(&self) -> (usize, usize) {
        (
            self.x.len().saturating_sub(1).max(1),
            self.y.len().saturating_sub(1).max(1),
        )
    }
}

/// Everything the caller supplies to (re)create a domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainSetup {
    pub id: u32,
    /// Calendar moment of the simulation start; fixes the reference time
    pub moment: CalendarMoment,
    pub latitude: f64,
    pub longitude: f64,
    pub mesh: MeshGeometry,
    /// Preferred front-propagation step length (s)
    pub dt: f64,
}

/// One session's spatial state.
pub struct SpatialDomain {
    id: u32,
    latitude: f64,
    longitude: f64,
    mesh: MeshGeometry,
    reference: ReferenceTime,
    /// Elapsed seconds of the setup moment, reference-relative
    start_time: f64,
    front: FireFront,
    layers: LayerStore,
    model: Box<dyn SpreadModel>,
    /// Floor applied to every computed spread rate (m/s)
    min_speed: f64,
    /// Fail instead of clamping when a query time leaves a layer's span
    strict_time_range: bool,
}

impl SpatialDomain {
    pub fn new(
        setup: &DomainSetup,
        front_config: FrontConfig,
        model: Box<dyn SpreadModel>,
        min_speed: f64,
        strict_time_range: bool,
    ) -> Result<Self> {
        let reference = ReferenceTime::new(setup.moment.year);
        let start_time =
            reference
                .elapsed_seconds(&setup.moment)
                .ok_or(FireError::InvalidCalendar {
                    year: setup.moment.year,
                    month: setup.moment.month,
                    day: setup.moment.day,
                })?;

        let mut layers = LayerStore::new();
        let (nx, ny) = setup.mesh.cells();
        layers.register(RasterLayer::flux(
            ARRIVAL_TIME_LAYER,
            LayerShape {
                origin: setup.mesh.sw(),
                extent: setup.mesh.extent(),
                time_origin: start_time,
                time_span: 0.0,
                nx,
                ny,
                nz: 1,
                nt: 1,
            },
            UNBURNED,
        )?);

        info!(
            id = setup.id,
            start_time,
            model = model.name(),
            nx,
            ny,
            "spatial domain created"
        );

        Ok(Self {
            id: setup.id,
            latitude: setup.latitude,
            longitude: setup.longitude,
            mesh: setup.mesh.clone(),
            reference,
            start_time,
            front: FireFront::new(front_config),
            layers,
            model,
            min_speed,
            strict_time_range,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn mesh(&self) -> &MeshGeometry {
        &self.mesh
    }

    pub fn reference(&self) -> ReferenceTime {
        self.reference
    }

    /// Reference-relative elapsed seconds of the setup moment.
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn front(&self) -> &FireFront {
        &self.front
    }

    pub fn front_mut(&mut self) -> &mut FireFront {
        &mut self.front
    }

    pub fn layers(&self) -> &LayerStore {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut LayerStore {
        &mut self.layers
    }

    /// Pure time arithmetic against this domain's reference origin.
    pub fn elapsed_seconds_since(&self, moment: &CalendarMoment) -> Result<f64> {
        self.reference
            .elapsed_seconds(moment)
            .ok_or(FireError::InvalidCalendar {
                year: moment.year,
                month: moment.month,
                day: moment.day,
            })
    }

    /// Seed a circular ignition front.
    pub fn ignite_point(&mut self, center: Vec2, radius: f64, t0: f64) {
        self.front.ignite_circle(center, radius, t0);
    }

    /// Seed an ignition front from clockwise-ordered vertices.
    pub fn ignite_polygon(&mut self, vertices: &[Vec2], t0: f64) {
        self.front.ignite_polygon(vertices, t0);
    }

    /// Nearest-cell sample, with a default for layers nobody registered.
    fn sample_or(&self, name: &str, point: Vec2, time: f64, default: f64) -> Result<f64> {
        match self.layers.sample(name, point, time, self.strict_time_range) {
            Ok(v) => Ok(v),
            Err(FireError::UnknownLayer(_)) => Ok(default),
            Err(e) => Err(e),
        }
    }

    /// Combine layer samples into a spread rate along `normal` at `point`.
    pub fn compute_spread_rate(&self, point: Vec2, normal: Vec2, time: f64) -> Result<f64> {
        let sample = SpreadSample {
            wind: Vec2::new(
                self.sample_or(WIND_U_LAYER, point, time, 0.0)?,
                self.sample_or(WIND_V_LAYER, point, time, 0.0)?,
            ),
            normal,
            fuel: self.sample_or(FUEL_LAYER, point, time, 0.0)? as i32,
            moisture: self.sample_or(MOISTURE_LAYER, point, time, DEFAULT_MOISTURE)?,
            slope: self.sample_or(SLOPE_LAYER, point, time, 0.0)?,
        };
        Ok(self.model.rate(&sample).max(self.min_speed))
    }

    /// One front-propagation step ending at simulation time `now`.
    ///
    /// Samples the spread-rate field for every live marker, advances the
    /// front, and records first arrivals in the burned-arrival flux layer.
    pub fn step(&mut self, dt: f64, now: f64) -> Result<Vec<BurnedMarker>> {
        let markers = self.front.live_markers();
        let moves = markers
            .par_iter()
            .map(|&(id, position)| {
                let normal = self.front.outward_normal(id);
                let rate = self.compute_spread_rate(position, normal, now)?;
                Ok(MarkerMove { id, rate })
            })
            .collect::<Result<Vec<MarkerMove>>>()?;

        let burned = self.front.advance(&moves, dt, now)?;
        self.stamp_arrivals(&burned)?;
        Ok(burned)
    }

    /// First-arrival bookkeeping: a cell's arrival time is written once.
    fn stamp_arrivals(&mut self, burned: &[BurnedMarker]) -> Result<()> {
        let layer = self.layers.get_mut(ARRIVAL_TIME_LAYER)?;
        for b in burned {
            let (ix, iy) = layer.shape().cell_at(b.position);
            if layer.value_at(ix, iy, 0, 0) <= UNBURNED {
                layer.write_cell(ix, iy, 0, b.time);
            }
        }
        Ok(())
    }
}
