//! Resolver configuration
//!
//! The two policy knobs that are not fixed by the entitlement model itself:
//! how an empty role allow-list is read, and which tier an unmapped service
//! requires.

use mcpist_shared::PlanTier;
use serde::{Deserialize, Serialize};
use std::env;

/// Interpretation of a role whose service allow-list is empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyAllowListMode {
    /// Empty list allows no services
    #[default]
    Deny,
    /// Empty list places no restriction on services
    Unrestricted,
}

impl std::str::FromStr for EmptyAllowListMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "deny" => Ok(Self::Deny),
            "unrestricted" => Ok(Self::Unrestricted),
            _ => Err(format!("Invalid empty allow-list mode: {}", s)),
        }
    }
}

/// Tier required by services and tools with no configured requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedPlanPolicy {
    /// Unmapped ids require `free`
    #[default]
    FailOpen,
    /// Unmapped services require `max`
    FailClosed,
}

impl UnmappedPlanPolicy {
    /// Requirement assumed for a service missing from the requirement table
    pub fn service_default(&self) -> PlanTier {
        match self {
            Self::FailOpen => PlanTier::Free,
            Self::FailClosed => PlanTier::Max,
        }
    }
}

impl std::str::FromStr for UnmappedPlanPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fail_open" | "open" => Ok(Self::FailOpen),
            "fail_closed" | "closed" => Ok(Self::FailClosed),
            _ => Err(format!("Invalid unmapped plan policy: {}", s)),
        }
    }
}

/// Resolver configuration loaded from environment variables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResolverConfig {
    pub empty_allow_list: EmptyAllowListMode,
    pub unmapped_plan: UnmappedPlanPolicy,
}

impl ResolverConfig {
    /// Load configuration from environment variables
    ///
    /// - `MCPIST_EMPTY_ALLOWLIST`: `deny` (default) or `unrestricted`
    /// - `MCPIST_UNMAPPED_PLAN`: `fail_open` (default) or `fail_closed`
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            empty_allow_list: parse_var("MCPIST_EMPTY_ALLOWLIST")?,
            unmapped_plan: parse_var("MCPIST_UNMAPPED_PLAN")?,
        })
    }
}

/// Parse a variable, falling back to the default only when it is unset
fn parse_var<T: std::str::FromStr + Default>(name: &'static str) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value.parse().map_err(|_| ConfigError::Invalid(name, value)),
        Err(env::VarError::NotPresent) => Ok(T::default()),
        Err(env::VarError::NotUnicode(raw)) => Err(ConfigError::Invalid(
            name,
            raw.to_string_lossy().into_owned(),
        )),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

impl From<ConfigError> for crate::error::EntitlementError {
    fn from(err: ConfigError) -> Self {
        crate::error::EntitlementError::Config(err.to_string())
    }
}
