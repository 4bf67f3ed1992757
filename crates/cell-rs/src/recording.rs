//! Recording plan and its binding to engine traces.

use crate::engine::TraceId;
use crate::section::SectionId;
use ballstick_core::{Location, Voltage};
use serde::Serialize;
use std::collections::HashMap;

/// What a probe observes
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ProbeKind {
    /// Continuous membrane voltage
    Voltage,
    /// Upward threshold crossings. `None` leaves the threshold to the engine.
    SpikeTimes { threshold: Option<Voltage> },
}

/// A point of observation on a section
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Probe {
    pub label: String,
    pub section: SectionId,
    pub x: Location,
    pub kind: ProbeKind,
}

impl Probe {
    pub fn voltage(label: &str, section: SectionId, x: Location) -> Self {
        Self {
            label: label.to_string(),
            section,
            x,
            kind: ProbeKind::Voltage,
        }
    }

    pub fn spikes(label: &str, section: SectionId, x: Location) -> Self {
        Self {
            label: label.to_string(),
            section,
            x,
            kind: ProbeKind::SpikeTimes { threshold: None },
        }
    }
}

/// Everything a ball-and-stick cell records
#[derive(Debug, Clone, Serialize)]
pub struct RecordingPlan {
    /// Spike times at the soma midpoint
    pub spike_times: Probe,
    /// Somatic voltage
    pub soma_v: Probe,
    /// Distal AIS voltage
    pub ais_v: Probe,
    /// One voltage probe per segment of the basal dendrite carrying the axon in `dend` mode
    pub dend0_vs: Vec<Probe>,
    /// One voltage probe per segment of the other basal dendrite
    pub dend1_vs: Vec<Probe>,
}

impl RecordingPlan {
    /// All probes, spike detector first
    pub fn probes(&self) -> impl Iterator<Item = &Probe> {
        [&self.spike_times, &self.soma_v, &self.ais_v]
            .into_iter()
            .chain(self.dend0_vs.iter())
            .chain(self.dend1_vs.iter())
    }

    pub fn probe_count(&self) -> usize {
        3 + self.dend0_vs.len() + self.dend1_vs.len()
    }
}

/// A cell realized inside an engine: section handles and trace ids
#[derive(Debug, Clone)]
pub struct CellBinding<H> {
    pub(crate) handles: HashMap<SectionId, H>,
    pub spike_times: TraceId,
    pub soma_v: TraceId,
    pub ais_v: TraceId,
    pub dend0_vs: Vec<TraceId>,
    pub dend1_vs: Vec<TraceId>,
}

impl<H: Copy> CellBinding<H> {
    /// Engine handle of a section
    pub fn handle(&self, id: SectionId) -> Option<H> {
        self.handles.get(&id).copied()
    }

    /// Every trace id, in the same order as [`RecordingPlan::probes`]
    pub fn traces(&self) -> Vec<TraceId> {
        let mut ids = vec![self.spike_times, self.soma_v, self.ais_v];
        ids.extend(&self.dend0_vs);
        ids.extend(&self.dend1_vs);
        ids
    }
}
