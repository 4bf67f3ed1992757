//! A built cell and its replay onto an engine.

use crate::config::{AisMode, CellConfig};
use crate::engine::CableEngine;
use crate::morphology::Morphology;
use crate::recording::{CellBinding, Probe, ProbeKind, RecordingPlan};
use crate::section::{Geometry, Section, SectionId};
use ballstick_core::{CableError, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

/// Named sections of a ball-and-stick cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellSections {
    pub soma: SectionId,
    /// Apical trunk followed by the two tuft branches
    pub apic: [SectionId; 3],
    pub dend: [SectionId; 2],
    pub ais_prox: SectionId,
    pub ais_dist: SectionId,
    pub axon: SectionId,
}

/// A constructed cell. Topology and biophysics are fixed once built.
#[derive(Debug, Clone, Serialize)]
pub struct Cell {
    name: &'static str,
    gid: u64,
    ais_mode: AisMode,
    config: CellConfig,
    morphology: Morphology,
    sections: CellSections,
    /// Wholetree from the soma
    all: Vec<SectionId>,
    recordings: RecordingPlan,
    num_segments: usize,
}

impl Cell {
    pub(crate) fn new(
        name: &'static str,
        gid: u64,
        ais_mode: AisMode,
        config: CellConfig,
        morphology: Morphology,
        sections: CellSections,
        recordings: RecordingPlan,
    ) -> Self {
        let all = morphology.wholetree(sections.soma);
        let num_segments = morphology.total_segments(&all);
        Self {
            name,
            gid,
            ais_mode,
            config,
            morphology,
            sections,
            all,
            recordings,
            num_segments,
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn gid(&self) -> u64 {
        self.gid
    }

    pub fn ais_mode(&self) -> AisMode {
        self.ais_mode
    }

    pub fn config(&self) -> &CellConfig {
        &self.config
    }

    pub fn morphology(&self) -> &Morphology {
        &self.morphology
    }

    pub fn sections(&self) -> &CellSections {
        &self.sections
    }

    /// Every section reachable from the soma, in traversal order
    pub fn wholetree(&self) -> &[SectionId] {
        &self.all
    }

    /// Sections in traversal order
    pub fn iter(&self) -> impl Iterator<Item = &Section> {
        self.all.iter().map(|&id| &self.morphology[id])
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.morphology.find(name).ok().map(|id| &self.morphology[id])
    }

    pub fn soma(&self) -> &Section {
        &self.morphology[self.sections.soma]
    }

    pub fn ais_prox(&self) -> &Section {
        &self.morphology[self.sections.ais_prox]
    }

    pub fn ais_dist(&self) -> &Section {
        &self.morphology[self.sections.ais_dist]
    }

    pub fn axon(&self) -> &Section {
        &self.morphology[self.sections.axon]
    }

    pub fn apic(&self, i: usize) -> Option<&Section> {
        self.sections.apic.get(i).map(|&id| &self.morphology[id])
    }

    pub fn dend(&self, i: usize) -> Option<&Section> {
        self.sections.dend.get(i).map(|&id| &self.morphology[id])
    }

    /// Name of a section's parent and the attachment point on it
    pub fn parent_of(&self, name: &str) -> Option<(&str, f64)> {
        let id = self.morphology.find(name).ok()?;
        let (parent, x) = self.morphology.parent(id)?;
        Some((self.morphology[parent].name.as_str(), x))
    }

    /// Total segment count over the whole tree
    pub fn num_segments(&self) -> usize {
        self.num_segments
    }

    pub fn recordings(&self) -> &RecordingPlan {
        &self.recordings
    }

    /// Replay the cell onto an engine.
    ///
    /// Sections are created in construction order, then connected, then
    /// given their biophysics in wholetree order, then the recording plan is
    /// attached.
    pub fn instantiate<E: CableEngine>(&self, engine: &mut E) -> Result<CellBinding<E::Handle>> {
        let mut handles = HashMap::with_capacity(self.morphology.len());

        for (id, section) in self.morphology.iter() {
            let h = engine.create_section(&section.name)?;
            match &section.geometry {
                Geometry::Points(points) => {
                    for point in points {
                        engine.pt3dadd(h, *point)?;
                    }
                }
                Geometry::Cylinder { length, diam } => {
                    engine.set_length(h, *length)?;
                    engine.set_diam(h, *diam)?;
                }
            }
            engine.set_nseg(h, section.nseg())?;
            handles.insert(id, h);
        }

        for (id, section) in self.morphology.iter() {
            if let Some(conn) = section.parent {
                engine.connect(handles[&id], conn.child_x, handles[&conn.parent], conn.parent_x)?;
            }
        }

        for &id in &self.all {
            let section = &self.morphology[id];
            let h = handles[&id];
            engine.set_section_param(h, "Ra", section.ra)?;
            engine.set_section_param(h, "cm", section.cm)?;
            for mechanism in &section.mechanisms {
                if !engine.has_mechanism(&mechanism.name) {
                    return Err(CableError::MechanismNotFound(format!(
                        "{} (needed by {})",
                        mechanism.name, section.name
                    )));
                }
                engine.insert(h, &mechanism.name)?;
            }
            let positions = section.segment_positions();
            for (name, values) in section.params() {
                let uniform = values.iter().all(|&v| v == values[0]);
                if uniform && !values.is_empty() {
                    engine.set_section_param(h, name, values[0])?;
                } else {
                    for (&x, &value) in positions.iter().zip(values.iter()) {
                        engine.set_segment_param(h, x, name, value)?;
                    }
                }
            }
            debug!(section = %section.name, nseg = section.nseg(), "section instantiated");
        }

        let mut attach = |probe: &Probe| -> Result<_> {
            let h = handles[&probe.section];
            match probe.kind {
                ProbeKind::Voltage => engine.record_voltage(h, probe.x),
                ProbeKind::SpikeTimes { threshold } => engine.spike_detector(h, probe.x, threshold),
            }
        };
        let rec = &self.recordings;
        let spike_times = attach(&rec.spike_times)?;
        let soma_v = attach(&rec.soma_v)?;
        let ais_v = attach(&rec.ais_v)?;
        let dend0_vs = rec.dend0_vs.iter().map(&mut attach).collect::<Result<Vec<_>>>()?;
        let dend1_vs = rec.dend1_vs.iter().map(&mut attach).collect::<Result<Vec<_>>>()?;

        info!(cell = %self, sections = self.all.len(), traces = rec.probe_count(), "cell instantiated");
        Ok(CellBinding {
            handles,
            spike_times,
            soma_v,
            ais_v,
            dend0_vs,
            dend1_vs,
        })
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.name, self.gid)
    }
}
