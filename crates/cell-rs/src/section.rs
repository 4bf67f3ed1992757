//! Sections: cable pieces with geometry, discretization and range parameters.

use crate::mechanisms::InsertedMechanism;
use ballstick_core::{arc_lengths, Length, Location, Pt3d};
use ndarray::Array1;
use serde::Serialize;
use std::collections::BTreeMap;

/// Length given to a newly created section (um)
pub const DEFAULT_LENGTH: Length = 100.0;
/// Diameter given to a newly created section (um)
pub const DEFAULT_DIAM: Length = 1.0;

/// Index of a section inside its [`Morphology`](crate::Morphology) arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SectionId(pub usize);

/// Section geometry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Geometry {
    /// Plain cylinder
    Cylinder { length: Length, diam: Length },
    /// Polyline of 3D points, each carrying its own diameter
    Points(Vec<Pt3d>),
}

/// Edge to the parent section. The child end is conventionally 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Connection {
    pub parent: SectionId,
    /// Attachment point on the parent (0-1)
    pub parent_x: Location,
    /// Attachment point on the child (0-1)
    pub child_x: Location,
}

/// A section (cable segment)
#[derive(Debug, Clone, Serialize)]
pub struct Section {
    /// Section name
    pub name: String,
    /// Geometry
    pub geometry: Geometry,
    /// Number of segments
    nseg: usize,
    /// Axial resistance (ohm-cm)
    pub ra: f64,
    /// Membrane capacitance (uF/cm^2)
    pub cm: f64,
    /// Inserted mechanisms
    pub mechanisms: Vec<InsertedMechanism>,
    /// Parent section and location
    pub parent: Option<Connection>,
    /// Children sections, in connection order
    pub children: Vec<SectionId>,
    /// Range parameters, one value per segment
    params: BTreeMap<String, Array1<f64>>,
}

impl Section {
    /// Create a new section with default properties
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            geometry: Geometry::Cylinder {
                length: DEFAULT_LENGTH,
                diam: DEFAULT_DIAM,
            },
            nseg: 1,
            ra: 100.0, // ohm-cm
            cm: 1.0,   // uF/cm^2
            mechanisms: Vec::new(),
            parent: None,
            children: Vec::new(),
            params: BTreeMap::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Geometry
    // -------------------------------------------------------------------------

    /// Append a 3D point. The first point replaces any scalar L/diam.
    pub fn pt3dadd(&mut self, point: Pt3d) {
        match &mut self.geometry {
            Geometry::Points(points) => points.push(point),
            Geometry::Cylinder { .. } => self.geometry = Geometry::Points(vec![point]),
        }
    }

    /// Number of 3D points (0 for a scalar cylinder)
    pub fn n3d(&self) -> usize {
        match &self.geometry {
            Geometry::Points(points) => points.len(),
            Geometry::Cylinder { .. } => 0,
        }
    }

    /// Section length (um)
    pub fn length(&self) -> Length {
        match &self.geometry {
            Geometry::Cylinder { length, .. } => *length,
            Geometry::Points(points) => arc_lengths(points).last().copied().unwrap_or(0.0),
        }
    }

    /// Set the length, turning the section into a plain cylinder
    pub fn set_length(&mut self, length: Length) {
        let diam = self.diam_at(0.5);
        self.geometry = Geometry::Cylinder { length, diam };
    }

    /// Set a uniform diameter, turning the section into a plain cylinder
    pub fn set_diam(&mut self, diam: Length) {
        let length = self.length();
        self.geometry = Geometry::Cylinder { length, diam };
    }

    /// Diameter at normalized position `x`, interpolated along arc length
    pub fn diam_at(&self, x: Location) -> Length {
        let points = match &self.geometry {
            Geometry::Cylinder { diam, .. } => return *diam,
            Geometry::Points(points) => points,
        };
        match points.len() {
            0 => 0.0,
            1 => points[0].diam,
            _ => {
                let arcs = arc_lengths(points);
                let total = arcs[arcs.len() - 1];
                if total <= 0.0 {
                    return points[0].diam;
                }
                let target = x.clamp(0.0, 1.0) * total;
                for i in 1..points.len() {
                    if target <= arcs[i] {
                        let span = arcs[i] - arcs[i - 1];
                        let frac = if span > 0.0 { (target - arcs[i - 1]) / span } else { 0.0 };
                        return points[i - 1].diam + frac * (points[i].diam - points[i - 1].diam);
                    }
                }
                points[points.len() - 1].diam
            }
        }
    }

    /// Lateral surface area of one segment (cm^2), using the diameter at its centre
    pub fn segment_area(&self, index: usize) -> f64 {
        let seg_length = self.length() / self.nseg as f64;
        let x = (index as f64 + 0.5) / self.nseg as f64;
        std::f64::consts::PI * self.diam_at(x) * seg_length * 1e-8 // um^2 to cm^2
    }

    /// Total lateral surface area (cm^2)
    pub fn area(&self) -> f64 {
        (0..self.nseg).map(|i| self.segment_area(i)).sum()
    }

    // -------------------------------------------------------------------------
    // Discretization
    // -------------------------------------------------------------------------

    pub fn nseg(&self) -> usize {
        self.nseg
    }

    /// Set number of segments. Range parameters become uniform at their
    /// first-segment value.
    pub fn set_nseg(&mut self, nseg: usize) {
        self.nseg = nseg;
        for values in self.params.values_mut() {
            let first = values.get(0).copied().unwrap_or(0.0);
            *values = Array1::from_elem(nseg, first);
        }
    }

    /// Segment centres: (i + 0.5) / nseg
    pub fn segment_positions(&self) -> Array1<f64> {
        let n = self.nseg as f64;
        Array1::from_iter((0..self.nseg).map(|i| (i as f64 + 0.5) / n))
    }

    /// Index of the segment containing `x`
    pub fn segment_index(&self, x: Location) -> usize {
        let idx = (x.clamp(0.0, 1.0) * self.nseg as f64).floor() as usize;
        idx.min(self.nseg.saturating_sub(1))
    }

    // -------------------------------------------------------------------------
    // Mechanisms and range parameters
    // -------------------------------------------------------------------------

    /// Insert a mechanism. Re-inserting keeps the existing instance and values.
    pub fn insert(&mut self, mechanism: InsertedMechanism) {
        if self.has_mechanism(&mechanism.name) {
            return;
        }
        for (name, value) in &mechanism.parameters {
            if !self.params.contains_key(name) {
                self.set_param(name, *value);
            }
        }
        self.mechanisms.push(mechanism);
    }

    pub fn has_mechanism(&self, name: &str) -> bool {
        self.mechanisms.iter().any(|m| m.name == name)
    }

    /// Set a range parameter uniformly over every segment
    pub fn set_param(&mut self, name: &str, value: f64) {
        self.params
            .insert(name.to_string(), Array1::from_elem(self.nseg, value));
    }

    /// Set a range parameter on the segment with the given index
    pub fn set_param_index(&mut self, name: &str, index: usize, value: f64) {
        let nseg = self.nseg;
        let values = self
            .params
            .entry(name.to_string())
            .or_insert_with(|| Array1::zeros(nseg));
        if let Some(slot) = values.get_mut(index) {
            *slot = value;
        }
    }

    /// Set a range parameter on the segment containing `x`
    pub fn set_param_at(&mut self, name: &str, x: Location, value: f64) {
        let index = self.segment_index(x);
        self.set_param_index(name, index, value);
    }

    /// Per-segment values of a range parameter
    pub fn param(&self, name: &str) -> Option<&Array1<f64>> {
        self.params.get(name)
    }

    /// Value of a range parameter at the segment containing `x`
    pub fn param_at(&self, name: &str, x: Location) -> Option<f64> {
        self.params.get(name)?.get(self.segment_index(x)).copied()
    }

    /// All range parameters, sorted by name
    pub fn params(&self) -> impl Iterator<Item = (&str, &Array1<f64>)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }
}
