use serde::{Deserialize, Serialize};

use edms_types::AccessRight;

/// Configuration for the access pipeline.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Right assumed for classes a participant has no explicit grant for.
    pub default_access_right: AccessRight,
    /// When `true`, every request is allowed without running any stage.
    /// Intended for single-user local demos.
    pub permissive: bool,
}

impl GateConfig {
    pub fn permissive() -> Self {
        Self {
            permissive: true,
            ..Default::default()
        }
    }
}
