//! MCPist entitlement resolution
//!
//! Decides which services and tools an organization's users may invoke.
//! Two axes gate every call: the organization's subscription tier (plan
//! axis) and the user's roles and the profiles applied to them (grant
//! axis). A tool is usable only when both allow it.

pub mod catalog;
pub mod config;
pub mod error;
pub mod plan_change;
pub mod requests;
pub mod resolver;
pub mod sample;
pub mod store;

pub use catalog::{Catalog, PlanRequirements};
pub use config::{ConfigError, EmptyAllowListMode, ResolverConfig, UnmappedPlanPolicy};
pub use error::{EntitlementError, EntitlementResult};
pub use plan_change::{
    preview_plan_change, LockedRoleService, LockedToolGrant, PlanChangeDirection,
    PlanChangeImpact,
};
pub use requests::{RequestStatus, UsageRequest};
pub use resolver::{
    effective_permissions, is_plan_sufficient, EntitlementResolver, GrantDecision,
    ServicePartition,
};
pub use store::{InMemoryStore, Snapshot, SnapshotSource};
