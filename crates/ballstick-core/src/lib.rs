//! # BallStick Core
//!
//! Shared types and utilities for compartmental cell models.
//!
//! ## Contents
//!
//! | Item | Purpose |
//! |------|---------|
//! | [`CableError`] | Workspace-wide error type |
//! | [`Pt3d`] | 3D geometry point with diameter |
//! | [`TimeSeries`] | Append-only recording trace |
//! | [`SimulationParams`] | Run-loop settings handed to the engine |
//!
//! Units follow the cable-equation convention: um for geometry, mV for
//! potentials, ms for time, ohm-cm for axial resistance, uF/cm^2 for
//! capacitance.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Common errors
#[derive(Debug, Error)]
pub enum CableError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Section not found: {0}")]
    SectionNotFound(String),

    #[error("Topology error: {0}")]
    Topology(String),

    #[error("Mechanism not found: {0}")]
    MechanismNotFound(String),

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CableError>;

/// Time point (ms)
pub type Time = f64;

/// Voltage (mV)
pub type Voltage = f64;

/// Length (um)
pub type Length = f64;

/// Normalized position along a section, 0 at the proximal end, 1 at the distal end
pub type Location = f64;

/// A 3D geometry point carrying the local diameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pt3d {
    /// Position (um)
    pub position: Point3<f64>,
    /// Diameter at this point (um)
    pub diam: Length,
}

impl Pt3d {
    pub fn new(x: f64, y: f64, z: f64, diam: Length) -> Self {
        Self {
            position: Point3::new(x, y, z),
            diam,
        }
    }

    /// Euclidean distance to another point (um)
    pub fn distance(&self, other: &Pt3d) -> Length {
        nalgebra::distance(&self.position, &other.position)
    }
}

/// Cumulative arc length at each point of a polyline, starting at 0
pub fn arc_lengths(points: &[Pt3d]) -> Vec<Length> {
    let mut acc = 0.0;
    let mut out = Vec::with_capacity(points.len());
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            acc += points[i - 1].distance(p);
        }
        out.push(acc);
    }
    out
}

/// Recorded time series. Samples are only ever appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Time points
    pub time: Vec<Time>,
    /// Values at each time point
    pub values: Vec<f64>,
    /// Variable name
    pub name: String,
    /// Units
    pub units: Option<String>,
}

impl TimeSeries {
    pub fn new(name: &str) -> Self {
        Self {
            time: Vec::new(),
            values: Vec::new(),
            name: name.to_string(),
            units: None,
        }
    }

    pub fn with_units(name: &str, units: &str) -> Self {
        Self {
            units: Some(units.to_string()),
            ..Self::new(name)
        }
    }

    pub fn push(&mut self, t: Time, v: f64) {
        self.time.push(t);
        self.values.push(v);
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Most recent sample
    pub fn last(&self) -> Option<(Time, f64)> {
        Some((*self.time.last()?, *self.values.last()?))
    }

    /// Drop all samples, keeping name and units. Used when a run is re-initialized.
    pub fn clear(&mut self) {
        self.time.clear();
        self.values.clear();
    }
}

/// Simulation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    /// Time step (ms)
    pub dt: Time,
    /// Stop time (ms)
    pub tstop: Time,
    /// Temperature (celsius)
    pub celsius: f64,
    /// Initial membrane potential (mV)
    pub v_init: Voltage,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            dt: 0.025,
            tstop: 100.0,
            celsius: 37.0,
            v_init: -65.0,
        }
    }
}
