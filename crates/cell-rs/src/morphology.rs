//! Arena-indexed section tree.

use crate::section::{Connection, Section, SectionId};
use ballstick_core::{CableError, Location, Result};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::ops::{Index, IndexMut};
use tracing::{debug, warn};

/// Sections of one cell, stored in creation order and linked by parent index
#[derive(Debug, Clone, Default, Serialize)]
pub struct Morphology {
    sections: Vec<Section>,
    #[serde(skip)]
    names: HashMap<String, SectionId>,
}

impl Morphology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a section. Names must be unique within the morphology.
    pub fn create(&mut self, name: &str) -> Result<SectionId> {
        if self.names.contains_key(name) {
            return Err(CableError::Topology(format!("Section {} already exists", name)));
        }
        let id = SectionId(self.sections.len());
        self.sections.push(Section::new(name));
        self.names.insert(name.to_string(), id);
        debug!(section = name, id = id.0, "created section");
        Ok(id)
    }

    /// Look up a section by name
    pub fn find(&self, name: &str) -> Result<SectionId> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| CableError::SectionNotFound(name.to_string()))
    }

    pub fn get(&self, id: SectionId) -> Option<&Section> {
        self.sections.get(id.0)
    }

    pub fn get_mut(&mut self, id: SectionId) -> Option<&mut Section> {
        self.sections.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Sections in creation order
    pub fn iter(&self) -> impl Iterator<Item = (SectionId, &Section)> {
        self.sections.iter().enumerate().map(|(i, s)| (SectionId(i), s))
    }

    /// Attach `child` at `child_x` to `parent` at `parent_x`.
    ///
    /// A child that already has a parent is moved. Connecting a section to
    /// itself or to one of its descendants is rejected.
    pub fn connect(
        &mut self,
        child: SectionId,
        child_x: Location,
        parent: SectionId,
        parent_x: Location,
    ) -> Result<()> {
        self.check(child)?;
        self.check(parent)?;
        if child == parent || self.is_ancestor(child, parent) {
            return Err(CableError::Topology(format!(
                "Connecting {} to {} would create a loop",
                self[child].name, self[parent].name
            )));
        }

        if let Some(old) = self[child].parent {
            warn!(
                child = %self[child].name,
                old_parent = %self[old.parent].name,
                new_parent = %self[parent].name,
                "section already connected, moving it"
            );
            self[old.parent].children.retain(|&c| c != child);
        }

        self[child].parent = Some(Connection {
            parent,
            parent_x,
            child_x,
        });
        self[parent].children.push(child);
        debug!(
            child = %self[child].name,
            parent = %self[parent].name,
            parent_x,
            "connected section"
        );
        Ok(())
    }

    /// Parent of a section with its attachment fraction on the parent
    pub fn parent(&self, id: SectionId) -> Option<(SectionId, Location)> {
        self.get(id)?.parent.map(|c| (c.parent, c.parent_x))
    }

    pub fn children(&self, id: SectionId) -> &[SectionId] {
        self.get(id).map(|s| s.children.as_slice()).unwrap_or(&[])
    }

    /// True if `ancestor` lies on the path from `id` up to its root
    pub fn is_ancestor(&self, ancestor: SectionId, id: SectionId) -> bool {
        let mut current = self.parent(id).map(|(p, _)| p);
        let mut steps = 0;
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.sections.len() {
                return false;
            }
            current = self.parent(p).map(|(pp, _)| pp);
        }
        false
    }

    /// Root of the tree containing `id`
    pub fn root_of(&self, id: SectionId) -> SectionId {
        let mut current = id;
        while let Some((p, _)) = self.parent(current) {
            current = p;
        }
        current
    }

    /// Sections without a parent, in creation order
    pub fn roots(&self) -> Vec<SectionId> {
        self.iter()
            .filter(|(_, s)| s.parent.is_none())
            .map(|(id, _)| id)
            .collect()
    }

    /// Every section of the tree containing `id`: depth-first preorder from
    /// its root, children visited in connection order.
    pub fn wholetree(&self, id: SectionId) -> Vec<SectionId> {
        let mut order = Vec::new();
        if self.get(id).is_none() {
            return order;
        }
        let mut stack = vec![self.root_of(id)];
        while let Some(current) = stack.pop() {
            order.push(current);
            stack.extend(self.children(current).iter().rev());
        }
        order
    }

    /// Sum of nseg over the given sections
    pub fn total_segments(&self, ids: &[SectionId]) -> usize {
        ids.iter().filter_map(|&id| self.get(id)).map(|s| s.nseg()).sum()
    }

    /// Check the tree invariants: a single root, unique names, every
    /// section reachable from the root.
    pub fn validate(&self) -> Result<()> {
        let roots = self.roots();
        if roots.len() != 1 {
            let names: Vec<&str> = roots.iter().map(|&r| self[r].name.as_str()).collect();
            return Err(CableError::Topology(format!(
                "Expected exactly one root, found {}: {:?}",
                roots.len(),
                names
            )));
        }

        let mut seen = HashSet::new();
        for (_, section) in self.iter() {
            if !seen.insert(section.name.as_str()) {
                return Err(CableError::Topology(format!(
                    "Duplicate section name {}",
                    section.name
                )));
            }
        }

        let reachable = self.wholetree(roots[0]);
        if reachable.len() != self.sections.len() {
            return Err(CableError::Topology(format!(
                "{} of {} sections reachable from {}",
                reachable.len(),
                self.sections.len(),
                self[roots[0]].name
            )));
        }
        Ok(())
    }

    fn check(&self, id: SectionId) -> Result<()> {
        if id.0 < self.sections.len() {
            Ok(())
        } else {
            Err(CableError::SectionNotFound(format!("#{}", id.0)))
        }
    }
}

impl Index<SectionId> for Morphology {
    type Output = Section;

    fn index(&self, id: SectionId) -> &Section {
        &self.sections[id.0]
    }
}

impl IndexMut<SectionId> for Morphology {
    fn index_mut(&mut self, id: SectionId) -> &mut Section {
        &mut self.sections[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(m: &Morphology, ids: &[SectionId]) -> Vec<String> {
        ids.iter().map(|&id| m[id].name.clone()).collect()
    }

    #[test]
    fn test_create_and_find() {
        let mut m = Morphology::new();
        let soma = m.create("soma").unwrap();
        m.create("axon").unwrap();

        assert_eq!(m.len(), 2);
        assert_eq!(m.find("soma").unwrap(), soma);
        assert!(matches!(m.find("dend"), Err(CableError::SectionNotFound(_))));
        assert!(matches!(m.create("soma"), Err(CableError::Topology(_))));
    }

    #[test]
    fn test_connect_sections() {
        let mut m = Morphology::new();
        let soma = m.create("soma").unwrap();
        let dend = m.create("dend").unwrap();

        m.connect(dend, 0.0, soma, 1.0).unwrap();

        assert_eq!(m.parent(dend), Some((soma, 1.0)));
        assert_eq!(m.children(soma), &[dend]);
        assert_eq!(m.root_of(dend), soma);
    }

    #[test]
    fn test_reconnect_moves_child() {
        let mut m = Morphology::new();
        let soma = m.create("soma").unwrap();
        let dend = m.create("dend").unwrap();
        let ais = m.create("ais").unwrap();

        m.connect(dend, 0.0, soma, 1.0).unwrap();
        m.connect(ais, 0.0, soma, 1.0).unwrap();
        m.connect(ais, 0.0, dend, 0.1).unwrap();

        assert_eq!(m.parent(ais), Some((dend, 0.1)));
        assert_eq!(m.children(soma), &[dend]);
        assert_eq!(m.children(dend), &[ais]);
    }

    #[test]
    fn test_reject_cycles() {
        let mut m = Morphology::new();
        let a = m.create("a").unwrap();
        let b = m.create("b").unwrap();
        let c = m.create("c").unwrap();
        m.connect(b, 0.0, a, 1.0).unwrap();
        m.connect(c, 0.0, b, 1.0).unwrap();

        assert!(matches!(m.connect(a, 0.0, c, 1.0), Err(CableError::Topology(_))));
        assert!(matches!(m.connect(a, 0.0, a, 0.5), Err(CableError::Topology(_))));
        assert!(m.is_ancestor(a, c));
        assert!(!m.is_ancestor(c, a));
    }

    #[test]
    fn test_wholetree_preorder() {
        let mut m = Morphology::new();
        let soma = m.create("soma").unwrap();
        let apic = m.create("apic").unwrap();
        let tuft = m.create("tuft").unwrap();
        let dend = m.create("dend").unwrap();
        m.connect(apic, 0.0, soma, 0.5).unwrap();
        m.connect(tuft, 0.0, apic, 1.0).unwrap();
        m.connect(dend, 0.0, soma, 1.0).unwrap();

        let order = m.wholetree(tuft);
        assert_eq!(names(&m, &order), vec!["soma", "apic", "tuft", "dend"]);
    }

    #[test]
    fn test_validate() {
        let mut m = Morphology::new();
        let soma = m.create("soma").unwrap();
        let axon = m.create("axon").unwrap();
        assert!(m.validate().is_err());

        m.connect(axon, 0.0, soma, 1.0).unwrap();
        m.validate().unwrap();
    }

    #[test]
    fn test_total_segments() {
        let mut m = Morphology::new();
        let soma = m.create("soma").unwrap();
        let axon = m.create("axon").unwrap();
        m[soma].set_nseg(5);
        m[axon].set_nseg(25);
        assert_eq!(m.total_segments(&[soma, axon]), 30);
    }
}
