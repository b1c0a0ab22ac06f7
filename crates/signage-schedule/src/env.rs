//! Runtime inputs the resolver filters candidates against.

use std::collections::HashMap;

/// Everything about the device's current situation the resolver needs
/// that isn't in the schedule document itself.
#[derive(Debug, Clone, Default)]
pub struct ResolveEnv {
    pub location: Option<(f64, f64)>,
    pub display_properties: HashMap<String, String>,
    pub measurements: HashMap<String, f64>,
}

impl ResolveEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_location(mut self, lat: f64, lon: f64) -> Self {
        self.location = Some((lat, lon));
        self
    }
}
