// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Quarry's rewrite engine.
//!
//! A source-to-source optimizer for programs using an embedded ECS
//! library's reactive query facility. Call sites whose query
//! construction is provably static are hoisted into cached query
//! objects (planned once per scope instead of once per evaluation),
//! and destructuring loops that consume queries are inlined into
//! direct archetype/row iteration.
//!
//! The engine is single-threaded and synchronous: one
//! [`Transformer`] per compilation unit, fed one file at a time.
//! Parsing and binding/type resolution are external; the engine
//! consults them through [`quarry_oracle::Oracle`]. Recoverable
//! conditions (non-static components, unsupported owner shapes,
//! unrecognized loops) abandon a single rewrite and never abort the
//! unit; only a [`ConfigError`] is fatal.

pub mod config;
pub mod diagnostics;
pub mod error;

mod classify;
mod descriptor;
mod inline;
mod rewrite;
mod scope;
mod walk;
mod wellknown;

pub use config::Config;
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::ConfigError;
pub use walk::Transformer;

use quarry_ast::SourceFile;
use quarry_oracle::Oracle;

/// Result of transforming one file.
#[derive(Debug)]
pub struct TransformResult {
    pub file: SourceFile,
    pub diagnostics: Vec<Diagnostic>,
}

/// Transform a single-file unit in one call.
///
/// Multi-file units should construct a [`Transformer`] and feed files
/// through it so well-known symbol resolution happens once.
pub fn transform_file(
    file: SourceFile,
    oracle: &dyn Oracle,
    config: &Config,
) -> Result<TransformResult, ConfigError> {
    let mut transformer = Transformer::new(oracle, config);
    let file = transformer.transform_file(file)?;
    Ok(TransformResult {
        file,
        diagnostics: transformer.take_diagnostics(),
    })
}
