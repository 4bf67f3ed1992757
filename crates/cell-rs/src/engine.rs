//! Interface to the external cable-equation engine.
//!
//! The engine owns numerical integration, channel kinetics and the run loop.
//! Cells only describe themselves through these primitives.

use ballstick_core::{Length, Location, Pt3d, Result, SimulationParams, Time, TimeSeries, Voltage};
use serde::Serialize;
use std::fmt::Debug;

/// Spike detector threshold used when none is given (mV)
pub const DEFAULT_SPIKE_THRESHOLD: Voltage = 10.0;

/// Handle to a recording trace owned by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TraceId(pub usize);

/// Primitives a cable-equation engine must provide
pub trait CableEngine {
    /// Engine-side section handle
    type Handle: Copy + Debug;

    // Sections and geometry
    fn create_section(&mut self, name: &str) -> Result<Self::Handle>;
    fn pt3dadd(&mut self, section: Self::Handle, point: Pt3d) -> Result<()>;
    fn set_length(&mut self, section: Self::Handle, length: Length) -> Result<()>;
    fn set_diam(&mut self, section: Self::Handle, diam: Length) -> Result<()>;
    fn set_nseg(&mut self, section: Self::Handle, nseg: usize) -> Result<()>;
    fn connect(
        &mut self,
        child: Self::Handle,
        child_x: Location,
        parent: Self::Handle,
        parent_x: Location,
    ) -> Result<()>;

    // Mechanisms and parameters
    fn has_mechanism(&self, name: &str) -> bool;
    fn insert(&mut self, section: Self::Handle, mechanism: &str) -> Result<()>;
    fn set_section_param(&mut self, section: Self::Handle, name: &str, value: f64) -> Result<()>;
    fn set_segment_param(
        &mut self,
        section: Self::Handle,
        x: Location,
        name: &str,
        value: f64,
    ) -> Result<()>;

    // Recording
    /// Record the times at which the voltage at `x` crosses `threshold` upward
    fn spike_detector(
        &mut self,
        section: Self::Handle,
        x: Location,
        threshold: Option<Voltage>,
    ) -> Result<TraceId>;
    /// Record the voltage at `x` every time step
    fn record_voltage(&mut self, section: Self::Handle, x: Location) -> Result<TraceId>;
    fn trace(&self, id: TraceId) -> Option<&TimeSeries>;

    // Run loop
    /// Reset state to `params.v_init` at t = 0 and take the initial samples
    fn finitialize(&mut self, params: &SimulationParams) -> Result<()>;
    /// Integrate up to time `t`
    fn fadvance(&mut self, t: Time) -> Result<()>;
}
