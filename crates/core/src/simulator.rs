//! Simulator: the state machine that drains due events and applies them to
//! the spatial domain.
//!
//! One simulator serves one session. It is constructed `Ready` alongside a
//! freshly configured domain, runs to completion inside each advance call,
//! and latches into a terminal state when the front collapses or a configured
//! end time is reached. Configuration and shape errors raised while draining
//! abort the call and drop back to `Ready` so the caller can fix the setup
//! and retry; nothing is retried automatically.

use crate::domain::SpatialDomain;
use crate::error::{FireError, Result};
use crate::schedule::{EventPayload, EventQueue};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, trace};

/// Lifecycle of one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SimState {
    /// No domain configured yet
    Idle,
    /// Domain configured, queue seeded, waiting for an advance request
    Ready,
    /// Actively draining due events
    Running,
    /// Front collapsed; terminal
    Extinguished,
    /// Configured end time reached; terminal
    Completed,
}

impl SimState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SimState::Extinguished | SimState::Completed)
    }
}

/// Point-in-time view of a simulation, returned by every advance call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimStatus {
    pub state: SimState,
    /// Current simulation time (s, reference-relative)
    pub time: f64,
    pub pending_events: usize,
    pub marker_count: usize,
    pub loop_count: usize,
    pub outputs_emitted: u64,
}

/// One marker's state inside an output snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarkerState {
    pub x: f64,
    pub y: f64,
    pub arrival_time: f64,
}

/// Front geometry handed to the output sink at each periodic output event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrontSnapshot {
    /// Simulation time the snapshot was taken at
    pub time: f64,
    /// Marker loops, each in front order
    pub loops: Vec<Vec<MarkerState>>,
}

impl FrontSnapshot {
    pub fn capture(domain: &SpatialDomain, time: f64) -> Self {
        let loops = domain
            .front()
            .loops()
            .into_iter()
            .map(|markers| {
                markers
                    .into_iter()
                    .map(|(position, arrival_time)| MarkerState {
                        x: position.x,
                        y: position.y,
                        arrival_time,
                    })
                    .collect()
            })
            .collect();
        Self { time, loops }
    }
}

/// External collaborator that turns snapshot requests into a representation.
/// The engine consumes no return value from it.
pub trait OutputSink {
    fn emit(&mut self, snapshot: &FrontSnapshot);
}

/// Sink that drops every snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn emit(&mut self, _snapshot: &FrontSnapshot) {}
}

/// Sink that retains snapshots for later inspection, shared by handle.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    snapshots: Arc<Mutex<Vec<FrontSnapshot>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.snapshots.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn snapshots(&self) -> Vec<FrontSnapshot> {
        self.snapshots.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl OutputSink for MemorySink {
    fn emit(&mut self, snapshot: &FrontSnapshot) {
        if let Ok(mut s) = self.snapshots.lock() {
            s.push(snapshot.clone());
        }
    }
}

/// Drives one session's simulation by draining its event queue.
pub struct Simulator {
    state: SimState,
    current_time: f64,
    /// Time of the previous front-propagation step; the next step's `dt` is
    /// the gap from here to its event time
    last_step_time: f64,
    /// Period of the recurring front-propagation event (s)
    step_dt: f64,
    /// Period of the recurring output event (s); 0 disables periodic output
    outputs_update: f64,
    /// Optional configured end of run
    end_time: Option<f64>,
    outputs_emitted: u64,
}

impl Simulator {
    pub fn new(start_time: f64, step_dt: f64, outputs_update: f64, end_time: Option<f64>) -> Self {
        Self {
            state: SimState::Ready,
            current_time: start_time,
            last_step_time: start_time,
            step_dt,
            outputs_update,
            end_time,
            outputs_emitted: 0,
        }
    }

    pub fn state(&self) -> SimState {
        self.state
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn step_dt(&self) -> f64 {
        self.step_dt
    }

    pub fn status(&self, domain: &SpatialDomain, queue: &EventQueue) -> SimStatus {
        SimStatus {
            state: self.state,
            time: self.current_time,
            pending_events: queue.len(),
            marker_count: domain.front().marker_count(),
            loop_count: domain.front().loop_count(),
            outputs_emitted: self.outputs_emitted,
        }
    }

    /// Drain every event due at or before `target`, then settle at `target`.
    ///
    /// Blocks until the target is reached, the front collapses, or an error
    /// surfaces. Terminal simulators fail fast.
    pub fn advance_to(
        &mut self,
        target: f64,
        domain: &mut SpatialDomain,
        queue: &mut EventQueue,
        sink: &mut dyn OutputSink,
    ) -> Result<SimStatus> {
        if self.state.is_terminal() {
            return Err(FireError::SessionNotConfigured(
                "simulation reached a terminal state; re-run domain setup to continue",
            ));
        }
        self.state = SimState::Running;
        debug!(target, from = self.current_time, "advancing simulation");

        while let Some(event) = queue.pop_next_due(target) {
            trace!(time = event.time, payload = ?event.payload, "dispatching event");
            match event.payload {
                EventPayload::FrontStep => {
                    if domain.front().is_ignited() {
                        let dt = event.time - self.last_step_time;
                        if let Err(e) = domain.step(dt, event.time) {
                            // Keep the step scheduled so a fixed-up session
                            // can retry from the same point
                            queue.insert(event.time, EventPayload::FrontStep);
                            return Err(self.fail(e));
                        }
                        self.last_step_time = event.time;
                        // Recurring step: schedule the next occurrence
                        queue.insert(event.time + self.step_dt, EventPayload::FrontStep);
                    }
                }
                EventPayload::EmitOutput => {
                    let snapshot = FrontSnapshot::capture(domain, event.time);
                    sink.emit(&snapshot);
                    self.outputs_emitted += 1;
                    if self.outputs_update > 0.0 {
                        queue.insert(event.time + self.outputs_update, EventPayload::EmitOutput);
                    }
                }
                EventPayload::RefreshLayers => {
                    // Hook for external data refresh; nothing to do yet
                    trace!(time = event.time, "layer refresh event ignored");
                }
            }
            self.current_time = event.time;
        }

        self.current_time = target;
        self.state = match self.end_time {
            Some(end) if target >= end => {
                info!(target, "configured end time reached");
                SimState::Completed
            }
            _ => SimState::Ready,
        };
        Ok(self.status(domain, queue))
    }

    /// Advance by `n` propagation-step periods from the current time.
    pub fn step(
        &mut self,
        n: u32,
        domain: &mut SpatialDomain,
        queue: &mut EventQueue,
        sink: &mut dyn OutputSink,
    ) -> Result<SimStatus> {
        let target = self.current_time + f64::from(n) * self.step_dt;
        self.advance_to(target, domain, queue, sink)
    }

    /// Record a failure, choosing between terminal and retryable outcome.
    fn fail(&mut self, error: FireError) -> FireError {
        if error == FireError::FrontExtinguished {
            info!("front extinguished, simulation terminal");
            self.state = SimState::Extinguished;
        } else {
            // Configuration errors are retryable after the caller fixes them
            debug!(%error, "advance aborted, simulator back to ready");
            self.state = SimState::Ready;
        }
        error
    }
}
