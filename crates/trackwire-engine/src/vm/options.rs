//! Runtime configuration

use serde::Deserialize;

use super::stack::DEFAULT_MAX_STACK_SIZE;

/// Default limit on nested calls
pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;

/// Runtime configuration options
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeOptions {
    /// Maximum number of nested calls per interpreter
    pub max_call_depth: usize,
    /// Maximum number of stack slots per interpreter
    pub max_stack_size: usize,
    /// Verify bytecode bodies when they are defined
    pub verify_functions: bool,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_stack_size: DEFAULT_MAX_STACK_SIZE,
            verify_functions: true,
        }
    }
}

impl RuntimeOptions {
    /// Parse options from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
