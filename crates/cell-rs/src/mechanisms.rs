//! Membrane mechanisms.
//!
//! Only the interface of each mechanism lives here: its name and the range
//! parameters it contributes, keyed by their suffixed names (`g_pas`,
//! `gbar_na`, ...). Kinetics belong to the engine.

use serde::Serialize;
use std::collections::BTreeMap;

/// An inserted mechanism instance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsertedMechanism {
    pub name: String,
    /// Default values of the range parameters this mechanism introduces
    pub parameters: BTreeMap<String, f64>,
}

impl InsertedMechanism {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parameters: BTreeMap::new(),
        }
    }

    /// Add a range parameter, suffixed with the mechanism name
    pub fn with_param(mut self, param: &str, value: f64) -> Self {
        self.parameters.insert(range_name(param, &self.name), value);
        self
    }

    /// Add an unsuffixed parameter (ion reversal potentials)
    pub fn with_ion_param(mut self, name: &str, value: f64) -> Self {
        self.parameters.insert(name.to_string(), value);
        self
    }
}

/// `gbar` + `na` -> `gbar_na`
pub fn range_name(param: &str, suffix: &str) -> String {
    format!("{}_{}", param, suffix)
}

/// Extracellular layer, exposes membrane current for recording
pub fn extracellular() -> InsertedMechanism {
    InsertedMechanism::new("extracellular")
}

/// Passive (leak) channel
pub fn pas() -> InsertedMechanism {
    InsertedMechanism::new("pas")
        .with_param("g", 0.001) // S/cm^2
        .with_param("e", -70.0) // mV
}

/// Sodium channel (na.mod)
pub fn na() -> InsertedMechanism {
    InsertedMechanism::new("na")
        .with_param("gbar", 1000.0) // pS/um^2
        .with_ion_param("ena", 50.0) // mV
}

/// Delayed-rectifier potassium channel (kv.mod)
pub fn kv() -> InsertedMechanism {
    InsertedMechanism::new("kv")
        .with_param("gbar", 5.0) // pS/um^2
        .with_ion_param("ek", -77.0) // mV
}
