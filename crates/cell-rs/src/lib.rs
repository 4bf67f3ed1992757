//! # BALLSTICK-CELL
//!
//! Ball-and-stick neuron with a configurable axon initial segment, described
//! in Rust and handed to an external cable-equation engine.
//!
//! ## Cell
//!
//! ```text
//!                apic[1]   apic[2]
//!                     \     /
//!                     apic[0]
//!                        |
//!     dend[0] ------- [ soma ] ------- dend[1]
//!        :               |
//!        :           ais_prox - ais_dist - axon
//!        :.......... (ais_mode = "dend": ais_prox hangs off dend[0])
//! ```
//!
//! ## Components
//!
//! 1. **Topology**: arena-indexed section tree ([`Morphology`])
//! 2. **Gradients**: linear range-parameter assignment ([`range_assignment`])
//! 3. **Biophysics**: passive and na/kv channel densities per section
//! 4. **Recordings**: spike times and voltage traces ([`RecordingPlan`])
//! 5. **Engine binding**: [`CableEngine`] trait, with [`InMemoryEngine`] as a
//!    stand-in, driven by an explicit [`SimulationContext`]
//!
//! ## Example
//!
//! ```
//! use ballstick_cell::{BallAndStick, CableEngine, CellConfig, InMemoryEngine, SimulationContext};
//! use ballstick_core::SimulationParams;
//!
//! let config = CellConfig::default().with_ais_mode("dend");
//! let cell = BallAndStick::build(7, &config).unwrap();
//! assert_eq!(cell.wholetree().len(), 9);
//!
//! let mut engine = InMemoryEngine::new();
//! let binding = cell.instantiate(&mut engine).unwrap();
//!
//! let mut sim = SimulationContext::new(SimulationParams { tstop: 1.0, ..Default::default() });
//! sim.run(&mut engine).unwrap();
//! assert_eq!(engine.trace(binding.soma_v).unwrap().len(), 41);
//! ```

pub mod ballstick;
pub mod cell;
pub mod config;
pub mod engine;
pub mod gradient;
pub mod mechanisms;
pub mod memory;
pub mod morphology;
pub mod recording;
pub mod section;
pub mod simulation;

pub use ballstick::{odd_nseg, BallAndStick};
pub use cell::{Cell, CellSections};
pub use config::{AisMode, CellConfig, MorphologyParams};
pub use engine::{CableEngine, TraceId, DEFAULT_SPIKE_THRESHOLD};
pub use gradient::{linear_gradient, range_assignment, RangeTarget};
pub use mechanisms::InsertedMechanism;
pub use memory::{EngineCall, InMemoryEngine, MemSection};
pub use morphology::Morphology;
pub use recording::{CellBinding, Probe, ProbeKind, RecordingPlan};
pub use section::{Connection, Geometry, Section, SectionId, DEFAULT_DIAM, DEFAULT_LENGTH};
pub use simulation::{RunState, SimulationContext};
