//! Ball-and-stick cell: soma, tapered apical trunk with a two-branch tuft,
//! two basal dendrites, and a two-part AIS followed by the axon.

use crate::cell::{Cell, CellSections};
use crate::config::{AisMode, CellConfig, MorphologyParams};
use crate::gradient::range_assignment;
use crate::mechanisms;
use crate::morphology::Morphology;
use crate::recording::{Probe, RecordingPlan};
use crate::section::SectionId;
use ballstick_core::{Length, Pt3d, Result};
use tracing::info;

/// Axial resistance (ohm-cm)
pub const RA: f64 = 100.0;
/// Membrane capacitance (uF/cm^2)
pub const CM: f64 = 1.0;
/// Leak conductance (S/cm^2), Rm = 15 kohm-cm^2
pub const G_PAS: f64 = 1.0 / 15e3;
/// Leak reversal (mV)
pub const E_PAS: f64 = -70.0;
pub const ENA: f64 = 50.0;
pub const EK: f64 = -80.0;

/// Fixed channel densities (pS/um^2): section, gbar_na, gbar_kv
const UNIFORM_DENSITIES: [(&str, f64, f64); 6] = [
    ("soma", 400.0, 100.0),
    ("ais_prox", 100.0, 100.0),
    ("ais_dist", 8000.0, 2000.0),
    ("axon", 300.0, 60.0),
    ("apic[1]", 20.0, 20.0),
    ("apic[2]", 20.0, 20.0),
];

/// Sections whose na/kv densities fall linearly from `start` to `stop`
const GRADED_SECTIONS: [&str; 3] = ["apic[0]", "dend[0]", "dend[1]"];
const GRADIENT_START: f64 = 100.0;
const GRADIENT_STOP: f64 = 20.0;

/// `1 + 2 * floor(length / spacing)`: an odd segment count, about one per `spacing` um
pub fn odd_nseg(length: Length, spacing: Length) -> usize {
    // the cast saturates (NaN -> 0), so only the arithmetic can overflow
    let half = (length / spacing).floor().max(0.0) as usize;
    half.saturating_mul(2).saturating_add(1)
}

/// Builder for ball-and-stick cells
pub struct BallAndStick;

impl BallAndStick {
    pub const NAME: &'static str = "BallAndStick";

    /// Build a cell with the default configuration
    pub fn new(gid: u64) -> Result<Cell> {
        Self::build(gid, &CellConfig::default())
    }

    /// Build a cell. Fails with `InvalidConfig` before anything is created
    /// if `ais_mode` is not `soma` or `dend`.
    pub fn build(gid: u64, config: &CellConfig) -> Result<Cell> {
        let ais_mode = config.ais_mode()?;

        let mut morphology = Morphology::new();
        let sections = setup_morphology(&mut morphology, ais_mode, config)?;
        morphology.validate()?;
        setup_biophysics(&mut morphology, &sections)?;
        let recordings = setup_recordings(&morphology, &sections);

        let cell = Cell::new(
            Self::NAME,
            gid,
            ais_mode,
            config.clone(),
            morphology,
            sections,
            recordings,
        );
        info!(
            cell = %cell,
            ais_mode = %ais_mode,
            sections = cell.wholetree().len(),
            num_segments = cell.num_segments(),
            "cell built"
        );
        Ok(cell)
    }
}

fn setup_morphology(
    m: &mut Morphology,
    ais_mode: AisMode,
    config: &CellConfig,
) -> Result<CellSections> {
    let p: &MorphologyParams = &config.morphology;

    let soma = m.create("soma")?;
    let apic0 = m.create("apic[0]")?;
    m.connect(apic0, 0.0, soma, 0.5)?;
    // Tuft branches are siblings on the trunk's distal end
    let apic1 = m.create("apic[1]")?;
    let apic2 = m.create("apic[2]")?;
    m.connect(apic1, 0.0, apic0, 1.0)?;
    m.connect(apic2, 0.0, apic0, 1.0)?;
    let dend0 = m.create("dend[0]")?;
    let dend1 = m.create("dend[1]")?;
    m.connect(dend0, 0.0, soma, 1.0)?;
    m.connect(dend1, 0.0, soma, 1.0)?;

    let half = p.soma_length / 2.0;
    m[soma].pt3dadd(Pt3d::new(-half, 0.0, 0.0, p.soma_diam));
    m[soma].pt3dadd(Pt3d::new(half, 0.0, 0.0, p.soma_diam));
    m[soma].set_nseg(p.soma_nseg);

    m[apic0].pt3dadd(Pt3d::new(0.0, 0.0, 0.0, p.apic_diam0));
    m[apic0].pt3dadd(Pt3d::new(0.0, p.apic_length, 0.0, p.apic_diam1));
    let n = odd_nseg(m[apic0].length(), 40.0);
    m[apic0].set_nseg(n);

    for tuft in [apic1, apic2] {
        m[tuft].set_length(p.tuft_length);
        m[tuft].set_diam(p.tuft_diam);
        m[tuft].set_nseg(p.tuft_nseg);
    }

    m[dend0].pt3dadd(Pt3d::new(-p.dend_offset, 0.0, 0.0, p.dend_diam));
    m[dend0].pt3dadd(Pt3d::new(-p.dend_offset - p.dend0_length, 0.0, 0.0, p.dend_diam));
    let n = odd_nseg(m[dend0].length(), 2.0);
    m[dend0].set_nseg(n);
    m[dend1].pt3dadd(Pt3d::new(p.dend_offset, 0.0, 0.0, p.dend_diam));
    m[dend1].pt3dadd(Pt3d::new(p.dend_offset + p.dend1_length, 0.0, 0.0, p.dend_diam));
    // Discretized from dend[0]'s length, not its own
    let n = odd_nseg(m[dend0].length(), 40.0);
    m[dend1].set_nseg(n);

    let ais_prox = m.create("ais_prox")?;
    let ais_dist = m.create("ais_dist")?;
    m.connect(ais_dist, 0.0, ais_prox, 1.0)?;
    for ais in [ais_prox, ais_dist] {
        m[ais].set_length(config.ais_length / 2.0);
        m[ais].set_diam(p.ais_diam);
        m[ais].set_nseg(p.ais_nseg);
    }

    let axon = m.create("axon")?;
    m.connect(axon, 0.0, ais_dist, 1.0)?;
    m[axon].set_diam(p.axon_diam);
    m[axon].set_length(p.axon_length);
    let n = odd_nseg(m[axon].length(), 40.0);
    m[axon].set_nseg(n);

    match ais_mode {
        AisMode::Soma => m.connect(ais_prox, 0.0, soma, 1.0)?,
        AisMode::Dend => m.connect(ais_prox, 0.0, dend0, config.acd_connect_x)?,
    }

    Ok(CellSections {
        soma,
        apic: [apic0, apic1, apic2],
        dend: [dend0, dend1],
        ais_prox,
        ais_dist,
        axon,
    })
}

fn setup_biophysics(m: &mut Morphology, sections: &CellSections) -> Result<()> {
    let all = m.wholetree(sections.soma);

    for &id in &all {
        let sec = &mut m[id];
        sec.ra = RA;
        sec.cm = CM;
        sec.insert(mechanisms::extracellular());
        sec.insert(mechanisms::pas());
        sec.set_param("g_pas", G_PAS);
        sec.set_param("e_pas", E_PAS);
        sec.insert(mechanisms::na());
        sec.insert(mechanisms::kv());
    }

    for (name, gbar_na, gbar_kv) in UNIFORM_DENSITIES {
        let id = m.find(name)?;
        m[id].set_param("gbar_na", gbar_na);
        m[id].set_param("gbar_kv", gbar_kv);
    }

    for name in GRADED_SECTIONS {
        let id = m.find(name)?;
        range_assignment(&mut m[id], "gbar_na", GRADIENT_START, GRADIENT_STOP);
        range_assignment(&mut m[id], "gbar_kv", GRADIENT_START, GRADIENT_STOP);
    }

    for &id in &all {
        m[id].set_param("ena", ENA);
        m[id].set_param("ek", EK);
    }
    Ok(())
}

fn setup_recordings(m: &Morphology, sections: &CellSections) -> RecordingPlan {
    let per_segment = |id: SectionId, prefix: &str| -> Vec<Probe> {
        m[id]
            .segment_positions()
            .iter()
            .enumerate()
            .map(|(i, &x)| Probe::voltage(&format!("{}[{}]", prefix, i), id, x))
            .collect()
    };

    RecordingPlan {
        spike_times: Probe::spikes("spike_times", sections.soma, 0.5),
        soma_v: Probe::voltage("soma_v", sections.soma, 0.5),
        ais_v: Probe::voltage("ais_v", sections.ais_dist, 0.5),
        dend0_vs: per_segment(sections.dend[0], "dend0_v"),
        dend1_vs: per_segment(sections.dend[1], "dend1_v"),
    }
}
