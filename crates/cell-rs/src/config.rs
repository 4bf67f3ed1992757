//! Construction parameters.

use ballstick_core::{CableError, Length, Location, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Where the axon initial segment attaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AisMode {
    /// Distal end of the soma
    Soma,
    /// Along `dend[0]`, at `acd_connect_x`
    Dend,
}

impl AisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Soma => "soma",
            Self::Dend => "dend",
        }
    }
}

impl FromStr for AisMode {
    type Err = CableError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "soma" => Ok(Self::Soma),
            "dend" => Ok(Self::Dend),
            other => Err(CableError::InvalidConfig(format!(
                "ais_mode should be 'soma' or 'dend', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for AisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geometry of the ball-and-stick cell. Defaults give the standard model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MorphologyParams {
    /// Soma cylinder length and diameter (um)
    pub soma_length: Length,
    pub soma_diam: Length,
    pub soma_nseg: usize,
    /// Main apical trunk, tapering from `apic_diam0` to `apic_diam1`
    pub apic_length: Length,
    pub apic_diam0: Length,
    pub apic_diam1: Length,
    /// Each of the two tuft branches
    pub tuft_length: Length,
    pub tuft_diam: Length,
    pub tuft_nseg: usize,
    /// Basal dendrites
    pub dend0_length: Length,
    pub dend1_length: Length,
    pub dend_diam: Length,
    /// Distance of each basal origin from the soma centre along x
    pub dend_offset: Length,
    /// Both AIS halves
    pub ais_diam: Length,
    pub ais_nseg: usize,
    pub axon_length: Length,
    pub axon_diam: Length,
}

impl Default for MorphologyParams {
    fn default() -> Self {
        Self {
            soma_length: 20.0,
            soma_diam: 20.0,
            soma_nseg: 5,
            apic_length: 400.0,
            apic_diam0: 2.5,
            apic_diam1: 0.5,
            tuft_length: 150.0,
            tuft_diam: 2.0,
            tuft_nseg: 5,
            dend0_length: 200.0,
            dend1_length: 200.0,
            dend_diam: 1.8,
            dend_offset: 6.0,
            ais_diam: 1.5,
            ais_nseg: 21,
            axon_length: 500.0,
            axon_diam: 1.0,
        }
    }
}

/// Cell construction options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellConfig {
    /// `soma` or `dend`. Kept as text and checked when the cell is built.
    pub ais_mode: String,
    /// Attachment point on `dend[0]`, used in `dend` mode only
    pub acd_connect_x: Location,
    /// Total AIS length, split evenly between `ais_prox` and `ais_dist` (um)
    pub ais_length: Length,
    pub morphology: MorphologyParams,
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            ais_mode: AisMode::Soma.to_string(),
            acd_connect_x: 0.1,
            ais_length: 60.0,
            morphology: MorphologyParams::default(),
        }
    }
}

impl CellConfig {
    pub fn with_ais_mode(mut self, mode: &str) -> Self {
        self.ais_mode = mode.to_string();
        self
    }

    pub fn with_acd_connect_x(mut self, x: Location) -> Self {
        self.acd_connect_x = x;
        self
    }

    pub fn with_ais_length(mut self, length: Length) -> Self {
        self.ais_length = length;
        self
    }

    /// Parse and validate `ais_mode`
    pub fn ais_mode(&self) -> Result<AisMode> {
        self.ais_mode.parse()
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}
