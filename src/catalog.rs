//! Built-in Open States resource catalog.

use crate::config::{parse_config, resolve, FullConfig, ResolvedModel};
use crate::error::ConfigError;

const OPENSTATES_JSON: &str = include_str!("../catalog/openstates.json");

/// Jurisdictions, bills, people, organizations and votes over the opencivicdata tables.
pub fn openstates() -> Result<FullConfig, ConfigError> {
    parse_config(OPENSTATES_JSON)
}

pub fn openstates_model() -> Result<ResolvedModel, ConfigError> {
    resolve(&openstates()?)
}
