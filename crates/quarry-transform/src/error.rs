// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Fatal configuration errors.
//!
//! Everything recoverable (unsupported owner shapes, non-static
//! components, unrecognized loops) is resolved locally by abandoning
//! one rewrite and, where warranted, emitting a diagnostic. Only a
//! setup problem the engine cannot work around aborts a run.

use thiserror::Error;

/// The configured library module, or one of its required well-known
/// exports, cannot be located.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("unable to resolve package '{0}'")]
    PackageNotFound(String),

    #[error("unable to find {name} type information in '{package}'")]
    MissingExport { package: String, name: String },

    #[error("unable to find {type_name}.{member} type information in '{package}'")]
    MissingMember {
        package: String,
        type_name: String,
        member: String,
    },
}
