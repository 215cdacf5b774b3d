//! Read-only parameter overrides for tuning sweeps.
//!
//! The matching-range engine evaluates thousands of what-if parameter
//! vectors. Instead of mutating the schematic and restoring it afterwards,
//! an overlay carries the overridden primary values and is consulted at
//! stamp time, so the schematic stays immutable under concurrent reads and
//! restoration cannot be missed on an error path.

use rfcalc_core::{Component, ComponentKind};
use std::collections::HashMap;

/// Per-component overrides of the tunable (primary) parameter, SI units.
#[derive(Debug, Clone, Default)]
pub struct ParamOverlay {
    values: HashMap<String, f64>,
}

impl ParamOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the primary parameter of `component_id`.
    pub fn set(&mut self, component_id: impl Into<String>, value: f64) {
        self.values.insert(component_id.into(), value);
    }

    pub fn get(&self, component_id: &str) -> Option<f64> {
        self.values.get(component_id).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The component's kind with any override applied.
    pub fn kind_of(&self, component: &Component) -> ComponentKind {
        match self.values.get(&component.id) {
            Some(&v) => component.kind.with_primary_value(v),
            None => component.kind.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfcalc_core::Component;

    #[test]
    fn test_overlay_does_not_touch_component() {
        let component = Component::new(
            "R_1",
            ComponentKind::Resistor { resistance: 50.0 },
            0.0,
            0.0,
        );
        let mut overlay = ParamOverlay::new();
        overlay.set("R_1", 75.0);

        assert_eq!(overlay.kind_of(&component).primary_value(), Some(75.0));
        // The component itself is untouched
        assert_eq!(component.kind.primary_value(), Some(50.0));
    }

    #[test]
    fn test_overlay_misses_fall_through() {
        let component = Component::new(
            "C_1",
            ComponentKind::Capacitor { capacitance: 1e-12 },
            0.0,
            0.0,
        );
        let overlay = ParamOverlay::new();
        assert_eq!(overlay.kind_of(&component).primary_value(), Some(1e-12));
        assert!(overlay.is_empty());
    }
}
