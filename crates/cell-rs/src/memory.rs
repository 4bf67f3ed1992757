//! In-memory engine.
//!
//! Stores what it is told and logs every call, which makes it a test double
//! for [`CableEngine`] and a dry-run target for the CLI. Its run loop does no
//! integration: each segment keeps the voltage it was initialised or
//! explicitly set to.

use crate::engine::{CableEngine, TraceId, DEFAULT_SPIKE_THRESHOLD};
use crate::section::{DEFAULT_DIAM, DEFAULT_LENGTH};
use ballstick_core::{
    CableError, Length, Location, Pt3d, Result, SimulationParams, Time, TimeSeries, Voltage,
};
use std::collections::{BTreeMap, BTreeSet};

/// Handle into [`InMemoryEngine`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemSection(pub usize);

/// One call received by the engine, with sections referred to by name
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    CreateSection(String),
    Pt3dAdd { section: String, point: Pt3d },
    SetLength { section: String, length: Length },
    SetDiam { section: String, diam: Length },
    SetNseg { section: String, nseg: usize },
    Connect { child: String, child_x: Location, parent: String, parent_x: Location },
    Insert { section: String, mechanism: String },
    SetSectionParam { section: String, name: String, value: f64 },
    SetSegmentParam { section: String, x: Location, name: String, value: f64 },
    SpikeDetector { section: String, x: Location, threshold: Voltage },
    RecordVoltage { section: String, x: Location },
}

#[derive(Debug, Clone)]
struct MemSectionState {
    name: String,
    points: Vec<Pt3d>,
    length: Length,
    diam: Length,
    nseg: usize,
    parent: Option<(usize, Location)>,
    mechanisms: Vec<String>,
    params: BTreeMap<String, Vec<f64>>,
    v: Vec<Voltage>,
}

impl MemSectionState {
    fn index(&self, x: Location) -> usize {
        let idx = (x.clamp(0.0, 1.0) * self.nseg as f64).floor() as usize;
        idx.min(self.nseg.saturating_sub(1))
    }
}

#[derive(Debug, Clone)]
enum ProbeKind {
    Voltage,
    Spike { threshold: Voltage, above: bool },
}

#[derive(Debug, Clone)]
struct Probe {
    section: usize,
    x: Location,
    trace: TraceId,
    kind: ProbeKind,
}

/// Engine that keeps everything in memory
#[derive(Debug, Clone)]
pub struct InMemoryEngine {
    sections: Vec<MemSectionState>,
    registry: BTreeSet<String>,
    probes: Vec<Probe>,
    traces: Vec<TimeSeries>,
    calls: Vec<EngineCall>,
    v_init: Voltage,
    t: Time,
}

impl InMemoryEngine {
    /// Engine with the mechanisms `extracellular`, `pas`, `na` and `kv` registered
    pub fn new() -> Self {
        Self::with_mechanisms(["extracellular", "pas", "na", "kv"])
    }

    pub fn with_mechanisms<I, S>(mechanisms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sections: Vec::new(),
            registry: mechanisms.into_iter().map(Into::into).collect(),
            probes: Vec::new(),
            traces: Vec::new(),
            calls: Vec::new(),
            v_init: -65.0,
            t: 0.0,
        }
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> &[EngineCall] {
        &self.calls
    }

    /// Section names in creation order
    pub fn section_names(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn find(&self, name: &str) -> Option<MemSection> {
        self.sections.iter().position(|s| s.name == name).map(MemSection)
    }

    /// Parent name and attachment fraction
    pub fn parent_of(&self, name: &str) -> Option<(&str, Location)> {
        let section = &self.sections[self.find(name)?.0];
        let (parent, x) = section.parent?;
        Some((self.sections[parent].name.as_str(), x))
    }

    pub fn nseg(&self, name: &str) -> Option<usize> {
        Some(self.sections[self.find(name)?.0].nseg)
    }

    /// Length as the engine sees it: from 3D points if any, scalar otherwise
    pub fn length(&self, name: &str) -> Option<Length> {
        let section = &self.sections[self.find(name)?.0];
        if section.points.len() > 1 {
            Some(ballstick_core::arc_lengths(&section.points).last().copied().unwrap_or(0.0))
        } else {
            Some(section.length)
        }
    }

    /// Scalar diameter, as created or last set
    pub fn diam(&self, name: &str) -> Option<Length> {
        Some(self.sections[self.find(name)?.0].diam)
    }

    pub fn mechanisms(&self, name: &str) -> Option<&[String]> {
        Some(self.sections[self.find(name)?.0].mechanisms.as_slice())
    }

    /// Value of a parameter at the segment containing `x`
    pub fn param(&self, name: &str, param: &str, x: Location) -> Option<f64> {
        let section = &self.sections[self.find(name)?.0];
        section.params.get(param)?.get(section.index(x)).copied()
    }

    /// Force the voltage of the segment containing `x`
    pub fn set_voltage(&mut self, section: MemSection, x: Location, v: Voltage) -> Result<()> {
        let state = self.state_mut(section)?;
        let idx = state.index(x);
        if let Some(slot) = state.v.get_mut(idx) {
            *slot = v;
        }
        Ok(())
    }

    pub fn t(&self) -> Time {
        self.t
    }

    fn state(&self, section: MemSection) -> Result<&MemSectionState> {
        self.sections
            .get(section.0)
            .ok_or_else(|| CableError::SectionNotFound(format!("engine section #{}", section.0)))
    }

    fn state_mut(&mut self, section: MemSection) -> Result<&mut MemSectionState> {
        self.sections
            .get_mut(section.0)
            .ok_or_else(|| CableError::SectionNotFound(format!("engine section #{}", section.0)))
    }

    fn name(&self, section: MemSection) -> Result<String> {
        Ok(self.state(section)?.name.clone())
    }

    fn voltage_at(&self, section: usize, x: Location) -> Voltage {
        let state = &self.sections[section];
        state.v.get(state.index(x)).copied().unwrap_or(self.v_init)
    }

    fn add_probe(&mut self, section: MemSection, x: Location, label: String, kind: ProbeKind) -> TraceId {
        let trace = TraceId(self.traces.len());
        let units = match kind {
            ProbeKind::Voltage => "mV",
            ProbeKind::Spike { .. } => "ms",
        };
        self.traces.push(TimeSeries::with_units(&label, units));
        self.probes.push(Probe {
            section: section.0,
            x,
            trace,
            kind,
        });
        trace
    }

    fn sample(&mut self) {
        let t = self.t;
        for i in 0..self.probes.len() {
            let v = self.voltage_at(self.probes[i].section, self.probes[i].x);
            let trace = self.probes[i].trace.0;
            match &mut self.probes[i].kind {
                ProbeKind::Voltage => self.traces[trace].push(t, v),
                ProbeKind::Spike { threshold, above } => {
                    let now_above = v >= *threshold;
                    if now_above && !*above {
                        self.traces[trace].push(t, t);
                    }
                    *above = now_above;
                }
            }
        }
    }
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CableEngine for InMemoryEngine {
    type Handle = MemSection;

    fn create_section(&mut self, name: &str) -> Result<MemSection> {
        self.sections.push(MemSectionState {
            name: name.to_string(),
            points: Vec::new(),
            length: DEFAULT_LENGTH,
            diam: DEFAULT_DIAM,
            nseg: 1,
            parent: None,
            mechanisms: Vec::new(),
            params: BTreeMap::new(),
            v: vec![self.v_init],
        });
        self.calls.push(EngineCall::CreateSection(name.to_string()));
        Ok(MemSection(self.sections.len() - 1))
    }

    fn pt3dadd(&mut self, section: MemSection, point: Pt3d) -> Result<()> {
        self.state_mut(section)?.points.push(point);
        let section = self.name(section)?;
        self.calls.push(EngineCall::Pt3dAdd { section, point });
        Ok(())
    }

    fn set_length(&mut self, section: MemSection, length: Length) -> Result<()> {
        let state = self.state_mut(section)?;
        state.points.clear();
        state.length = length;
        let section = self.name(section)?;
        self.calls.push(EngineCall::SetLength { section, length });
        Ok(())
    }

    fn set_diam(&mut self, section: MemSection, diam: Length) -> Result<()> {
        self.state_mut(section)?.diam = diam;
        let section = self.name(section)?;
        self.calls.push(EngineCall::SetDiam { section, diam });
        Ok(())
    }

    fn set_nseg(&mut self, section: MemSection, nseg: usize) -> Result<()> {
        let v_init = self.v_init;
        let state = self.state_mut(section)?;
        state.nseg = nseg;
        state.v = vec![v_init; nseg];
        for values in state.params.values_mut() {
            let first = values.first().copied().unwrap_or(0.0);
            *values = vec![first; nseg];
        }
        let section = self.name(section)?;
        self.calls.push(EngineCall::SetNseg { section, nseg });
        Ok(())
    }

    fn connect(
        &mut self,
        child: MemSection,
        child_x: Location,
        parent: MemSection,
        parent_x: Location,
    ) -> Result<()> {
        let parent_name = self.name(parent)?;
        self.state_mut(child)?.parent = Some((parent.0, parent_x));
        let child_name = self.name(child)?;
        self.calls.push(EngineCall::Connect {
            child: child_name,
            child_x,
            parent: parent_name,
            parent_x,
        });
        Ok(())
    }

    fn has_mechanism(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    fn insert(&mut self, section: MemSection, mechanism: &str) -> Result<()> {
        if !self.has_mechanism(mechanism) {
            return Err(CableError::MechanismNotFound(mechanism.to_string()));
        }
        let state = self.state_mut(section)?;
        if !state.mechanisms.iter().any(|m| m == mechanism) {
            state.mechanisms.push(mechanism.to_string());
        }
        let section = self.name(section)?;
        self.calls.push(EngineCall::Insert {
            section,
            mechanism: mechanism.to_string(),
        });
        Ok(())
    }

    fn set_section_param(&mut self, section: MemSection, name: &str, value: f64) -> Result<()> {
        let state = self.state_mut(section)?;
        let nseg = state.nseg;
        state.params.insert(name.to_string(), vec![value; nseg]);
        let section = self.name(section)?;
        self.calls.push(EngineCall::SetSectionParam {
            section,
            name: name.to_string(),
            value,
        });
        Ok(())
    }

    fn set_segment_param(
        &mut self,
        section: MemSection,
        x: Location,
        name: &str,
        value: f64,
    ) -> Result<()> {
        let state = self.state_mut(section)?;
        let nseg = state.nseg;
        let idx = state.index(x);
        let values = state
            .params
            .entry(name.to_string())
            .or_insert_with(|| vec![0.0; nseg]);
        if let Some(slot) = values.get_mut(idx) {
            *slot = value;
        }
        let section = self.name(section)?;
        self.calls.push(EngineCall::SetSegmentParam {
            section,
            x,
            name: name.to_string(),
            value,
        });
        Ok(())
    }

    fn spike_detector(
        &mut self,
        section: MemSection,
        x: Location,
        threshold: Option<Voltage>,
    ) -> Result<TraceId> {
        let name = self.name(section)?;
        let threshold = threshold.unwrap_or(DEFAULT_SPIKE_THRESHOLD);
        let id = self.add_probe(
            section,
            x,
            format!("{}({}).spikes", name, x),
            ProbeKind::Spike {
                threshold,
                above: false,
            },
        );
        self.calls.push(EngineCall::SpikeDetector {
            section: name,
            x,
            threshold,
        });
        Ok(id)
    }

    fn record_voltage(&mut self, section: MemSection, x: Location) -> Result<TraceId> {
        let name = self.name(section)?;
        let id = self.add_probe(section, x, format!("{}({}).v", name, x), ProbeKind::Voltage);
        self.calls.push(EngineCall::RecordVoltage { section: name, x });
        Ok(id)
    }

    fn trace(&self, id: TraceId) -> Option<&TimeSeries> {
        self.traces.get(id.0)
    }

    fn finitialize(&mut self, params: &SimulationParams) -> Result<()> {
        self.v_init = params.v_init;
        self.t = 0.0;
        for state in &mut self.sections {
            state.v = vec![params.v_init; state.nseg];
        }
        for trace in &mut self.traces {
            trace.clear();
        }
        for probe in &mut self.probes {
            if let ProbeKind::Spike { threshold, above } = &mut probe.kind {
                *above = params.v_init >= *threshold;
            }
        }
        self.sample();
        Ok(())
    }

    fn fadvance(&mut self, t: Time) -> Result<()> {
        if t < self.t {
            return Err(CableError::Simulation(format!(
                "cannot step back from t = {} to t = {}",
                self.t, t
            )));
        }
        self.t = t;
        self.sample();
        Ok(())
    }
}
