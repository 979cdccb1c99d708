// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Resolution of the ECS library's well-known exported operations.
//!
//! Resolved at most once per compilation unit and memoized by the
//! transformer; repeated entry from other files of the unit reuses the
//! first resolution.

use quarry_oracle::{Oracle, SymbolId};

use crate::config::Config;
use crate::error::ConfigError;

/// Symbols the engine recognizes by declaration-site comparison.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WellKnown {
    pub query_type: SymbolId,
    pub cached_query_type: SymbolId,
    pub query_method: SymbolId,
    pub with_method: SymbolId,
    pub without_method: SymbolId,
    pub cached_method: SymbolId,
}

pub(crate) fn resolve(oracle: &dyn Oracle, config: &Config) -> Result<WellKnown, ConfigError> {
    let package = &config.package;
    let exports = oracle
        .exports_of(package)
        .ok_or_else(|| ConfigError::PackageNotFound(package.clone()))?;

    let find = |name: &str| {
        exports
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| *s)
            .ok_or_else(|| ConfigError::MissingExport {
                package: package.clone(),
                name: name.to_string(),
            })
    };
    let query_type = find("Query")?;
    let cached_query_type = find("CachedQuery")?;
    let world_type = find("World")?;

    let member = |ty: SymbolId, type_name: &str, name: &str| {
        oracle
            .declared_type_property(ty, name)
            .ok_or_else(|| ConfigError::MissingMember {
                package: package.clone(),
                type_name: type_name.to_string(),
                member: name.to_string(),
            })
    };

    Ok(WellKnown {
        query_type,
        cached_query_type,
        query_method: member(world_type, "World", "query")?,
        with_method: member(query_type, "Query", "with")?,
        without_method: member(query_type, "Query", "without")?,
        cached_method: member(query_type, "Query", "cached")?,
    })
}
