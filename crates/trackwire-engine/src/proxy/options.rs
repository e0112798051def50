//! Proxy factory configuration

use serde::Deserialize;

/// Default prefix for synthesized class names
pub const DEFAULT_TYPE_NAME_PREFIX: &str = "TrackingProxyOf_";

/// Options controlling proxy synthesis
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProxyOptions {
    /// Prefix prepended to the source class name
    pub type_name_prefix: String,
    /// Verify every emitted body before registering it
    pub verify_bodies: bool,
}

impl Default for ProxyOptions {
    fn default() -> Self {
        Self {
            type_name_prefix: DEFAULT_TYPE_NAME_PREFIX.to_string(),
            verify_bodies: true,
        }
    }
}

impl ProxyOptions {
    /// Parse options from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Name of the wrapper class for `source`
    pub fn type_name(&self, source: &str) -> String {
        format!("{}{}", self.type_name_prefix, source)
    }
}
