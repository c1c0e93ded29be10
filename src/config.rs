//! Engine configuration
use crate::errors::ReconcilerError;
use crate::props::ComparePolicy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Context used by `reconcile_main`.
    pub default_context: String,
    pub id_prefix: String,
    /// How many surface ids the engine may issue before failing.
    pub id_limit: u64,
    pub compare_policy: ComparePolicy,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        ReconcilerConfig {
            default_context: "main".to_string(),
            id_prefix: "fw_id_".to_string(),
            id_limit: u64::MAX,
            compare_policy: ComparePolicy::Structural,
        }
    }
}

impl ReconcilerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ReconcilerError> {
        Ok(serde_json::from_str(json)?)
    }
}
