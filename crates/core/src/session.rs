//! Session: the unit of lifecycle the adapter talks to.
//!
//! A session holds at most one spatial domain, event queue, and simulator,
//! plus the typed parameter set the adapter reads and writes. Re-running
//! domain setup builds the replacement state completely before committing it,
//! so no partially replaced pair is ever observable, and operations attempted
//! before setup fail with `SessionNotConfigured`.
//!
//! Parameters use the feeding adapter's key names (`outputsUpdate`,
//! `perimeterResolution`, ...); the engine resolves them into an explicit
//! [`SessionConfig`] at setup instead of consulting a process-global store.

use crate::core_types::Vec2;
use crate::domain::{spread_model_by_name, DomainSetup, SpatialDomain};
use crate::error::{FireError, Result};
use crate::front::FrontConfig;
use crate::layers::{GridOrder, LayerShape, RasterLayer};
use crate::schedule::{EventPayload, EventQueue};
use crate::simulator::{NullSink, OutputSink, SimState, SimStatus, Simulator};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::info;

/// One typed parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Int(i64),
    Real(f64),
    Text(String),
}

/// Typed key-value store backing the adapter's get/set parameter calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    values: FxHashMap<String, ParamValue>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: ParamValue) {
        self.values.insert(name.into(), value);
    }

    pub fn set_int(&mut self, name: impl Into<String>, value: i64) {
        self.set(name, ParamValue::Int(value));
    }

    pub fn set_real(&mut self, name: impl Into<String>, value: f64) {
        self.set(name, ParamValue::Real(value));
    }

    pub fn set_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.set(name, ParamValue::Text(value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    /// Numeric value of a parameter, accepting either numeric kind.
    pub fn real_or(&self, name: &str, default: f64) -> f64 {
        match self.values.get(name) {
            Some(ParamValue::Real(v)) => *v,
            Some(ParamValue::Int(v)) => *v as f64,
            _ => default,
        }
    }

    pub fn int_or(&self, name: &str, default: i64) -> i64 {
        match self.values.get(name) {
            Some(ParamValue::Int(v)) => *v,
            Some(ParamValue::Real(v)) => *v as i64,
            _ => default,
        }
    }

    pub fn text_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        match self.values.get(name) {
            Some(ParamValue::Text(v)) => v.as_str(),
            _ => default,
        }
    }
}

/// Engine configuration resolved from the parameter set at domain setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Seconds between periodic output events; 0 disables them
    pub outputs_update: f64,
    /// Maximum inter-marker spacing on the front (m)
    pub perimeter_resolution: f64,
    /// Floor on computed spread rates (m/s)
    pub min_speed: f64,
    /// Radius of a point-ignition front (m)
    pub initial_front_depth: f64,
    /// Spread model name, resolved through the model factory
    pub propagation_model: String,
    /// Fail rather than clamp on out-of-span layer query times
    pub strict_time_range: bool,
    /// Optional configured end of run (s, reference-relative)
    pub end_time: Option<f64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            outputs_update: 0.0,
            perimeter_resolution: 10.0,
            min_speed: 0.0,
            initial_front_depth: 10.0,
            propagation_model: "uniform".to_owned(),
            strict_time_range: false,
            end_time: None,
        }
    }
}

impl SessionConfig {
    /// Read the adapter-visible parameter keys, falling back to defaults.
    pub fn from_parameters(params: &ParameterSet) -> Self {
        let defaults = Self::default();
        let end_time = params.real_or("endTime", -1.0);
        Self {
            outputs_update: params.real_or("outputsUpdate", defaults.outputs_update),
            perimeter_resolution: params
                .real_or("perimeterResolution", defaults.perimeter_resolution),
            min_speed: params.real_or("minSpeed", defaults.min_speed),
            initial_front_depth: params.real_or("initialFrontDepth", defaults.initial_front_depth),
            propagation_model: params
                .text_or("propagationModel", &defaults.propagation_model)
                .to_owned(),
            strict_time_range: params.int_or("strictTimeRange", 0) != 0,
            end_time: (end_time > 0.0).then_some(end_time),
        }
    }
}

/// The execution context the adapter owns: domain + queue + simulator +
/// parameters, with one shared lifecycle.
pub struct Session {
    params: ParameterSet,
    config: SessionConfig,
    sink: Box<dyn OutputSink>,
    domain: Option<SpatialDomain>,
    queue: Option<EventQueue>,
    simulator: Option<Simulator>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_sink(Box::new(NullSink))
    }

    /// Create a session emitting snapshots into the given sink.
    pub fn with_sink(sink: Box<dyn OutputSink>) -> Self {
        Self {
            params: ParameterSet::new(),
            config: SessionConfig::default(),
            sink,
            domain: None,
            queue: None,
            simulator: None,
        }
    }

    pub fn set_parameter(&mut self, name: impl Into<String>, value: ParamValue) {
        self.params.set(name, value);
    }

    pub fn get_parameter(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// (Re)create the whole simulation state in one atomic step.
    ///
    /// The replacement domain, queue, and simulator are fully constructed
    /// before anything existing is torn down; on error the previous state is
    /// untouched.
    pub fn setup_domain(&mut self, setup: &DomainSetup) -> Result<()> {
        let config = SessionConfig::from_parameters(&self.params);
        let front_config = FrontConfig {
            perimeter_resolution: config.perimeter_resolution,
            ..FrontConfig::default()
        };
        let model = spread_model_by_name(&config.propagation_model);

        let domain = SpatialDomain::new(
            setup,
            front_config,
            model,
            config.min_speed,
            config.strict_time_range,
        )?;
        let start = domain.start_time();

        let mut queue = EventQueue::new();
        if config.outputs_update > 0.0 {
            // First output event fires at the start time itself
            queue.insert(start, EventPayload::EmitOutput);
        }
        let step_dt = if setup.dt > 0.0 { setup.dt } else { 1.0 };
        let simulator = Simulator::new(start, step_dt, config.outputs_update, config.end_time);

        let replaced = self.domain.is_some();
        self.domain = Some(domain);
        self.queue = Some(queue);
        self.simulator = Some(simulator);
        self.config = config;
        info!(replaced, id = setup.id, "session domain configured");
        Ok(())
    }

    pub fn domain(&self) -> Option<&SpatialDomain> {
        self.domain.as_ref()
    }

    fn domain_mut(&mut self) -> Result<&mut SpatialDomain> {
        self.domain
            .as_mut()
            .ok_or(FireError::SessionNotConfigured("domain setup has not run"))
    }

    /// Register a scalar layer, replacing any previous layer of that name.
    pub fn register_scalar_layer(
        &mut self,
        name: &str,
        shape: LayerShape,
        order: GridOrder,
        data: Vec<f64>,
    ) -> Result<()> {
        let layer = RasterLayer::scalar(name, shape, order, data)?;
        self.domain_mut()?.layers_mut().register(layer);
        Ok(())
    }

    /// Register an index (categorical) layer.
    pub fn register_index_layer(
        &mut self,
        name: &str,
        shape: LayerShape,
        order: GridOrder,
        data: Vec<i32>,
    ) -> Result<()> {
        let layer = RasterLayer::index(name, shape, order, data)?;
        self.domain_mut()?.layers_mut().register(layer);
        Ok(())
    }

    /// Register an empty flux layer for the simulation to write into.
    pub fn register_flux_layer(&mut self, name: &str, shape: LayerShape, fill: f64) -> Result<()> {
        let layer = RasterLayer::flux(name, shape, fill)?;
        self.domain_mut()?.layers_mut().register(layer);
        Ok(())
    }

    /// Full grid of a named layer, defaulting to the current simulation time.
    pub fn sample_layer_grid(
        &self,
        name: &str,
        time: Option<f64>,
    ) -> Result<(Vec<f64>, [usize; 3])> {
        let domain = self
            .domain
            .as_ref()
            .ok_or(FireError::SessionNotConfigured("domain setup has not run"))?;
        let time = time.unwrap_or_else(|| self.current_time().unwrap_or(domain.start_time()));
        domain
            .layers()
            .export_grid(name, time, self.config.strict_time_range)
    }

    /// Ignite a circular front of the configured initial depth.
    ///
    /// Seeds the recurring front-propagation event; without an ignition the
    /// simulator only serves output events.
    pub fn ignite_point(&mut self, center: Vec2, t0: Option<f64>) -> Result<()> {
        let t0 = t0
            .or_else(|| self.current_time())
            .ok_or(FireError::SessionNotConfigured("domain setup has not run"))?;
        let radius = self.config.initial_front_depth;
        self.domain_mut()?.ignite_point(center, radius, t0);
        self.seed_front_step(t0)
    }

    /// Ignite from clockwise-ordered perimeter vertices.
    pub fn ignite_front(&mut self, vertices: &[Vec2], t0: Option<f64>) -> Result<()> {
        let t0 = t0
            .or_else(|| self.current_time())
            .ok_or(FireError::SessionNotConfigured("domain setup has not run"))?;
        self.domain_mut()?.ignite_polygon(vertices, t0);
        self.seed_front_step(t0)
    }

    /// One propagation chain serves every loop, so a second ignition must
    /// not start another one: each extra chain would re-step the whole
    /// domain every tick, the duplicates with a zero gap.
    fn seed_front_step(&mut self, t0: f64) -> Result<()> {
        let step_dt = self
            .simulator
            .as_ref()
            .map_or(1.0, Simulator::step_dt);
        let queue = self
            .queue
            .as_mut()
            .ok_or(FireError::SessionNotConfigured("domain setup has not run"))?;
        if !queue.contains(EventPayload::FrontStep) {
            queue.insert(t0 + step_dt, EventPayload::FrontStep);
        }
        Ok(())
    }

    /// Advance the simulation to an absolute time.
    pub fn advance_to(&mut self, target: f64) -> Result<SimStatus> {
        let domain = self
            .domain
            .as_mut()
            .ok_or(FireError::SessionNotConfigured("domain setup has not run"))?;
        let queue = self
            .queue
            .as_mut()
            .ok_or(FireError::SessionNotConfigured("domain setup has not run"))?;
        let simulator = self
            .simulator
            .as_mut()
            .ok_or(FireError::SessionNotConfigured("domain setup has not run"))?;
        simulator.advance_to(target, domain, queue, self.sink.as_mut())
    }

    /// Advance by `n` propagation-step periods.
    pub fn step(&mut self, n: u32) -> Result<SimStatus> {
        let target = {
            let simulator = self
                .simulator
                .as_ref()
                .ok_or(FireError::SessionNotConfigured("domain setup has not run"))?;
            simulator.current_time() + f64::from(n) * simulator.step_dt()
        };
        self.advance_to(target)
    }

    /// Current lifecycle and counters; `Idle` before the first setup.
    pub fn status(&self) -> SimStatus {
        match (&self.domain, &self.queue, &self.simulator) {
            (Some(domain), Some(queue), Some(simulator)) => simulator.status(domain, queue),
            _ => SimStatus {
                state: SimState::Idle,
                time: 0.0,
                pending_events: 0,
                marker_count: 0,
                loop_count: 0,
                outputs_emitted: 0,
            },
        }
    }

    /// Current simulation time, if a domain is configured.
    pub fn current_time(&self) -> Option<f64> {
        self.simulator.as_ref().map(Simulator::current_time)
    }
}
