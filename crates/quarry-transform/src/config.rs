// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Externally supplied configuration for one transformation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Suppress non-fatal diagnostics.
    pub silent: bool,
    /// The module whose exports are the well-known ECS operations.
    pub package: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            silent: false,
            package: "@rbxts/jecs".to_string(),
        }
    }
}
