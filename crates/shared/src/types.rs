//! Common types used across MCPist

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// ID Wrappers
// =============================================================================

/// Catalog and directory ids are opaque strings ("github", "list-repos", "2").
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Service ID wrapper (e.g. "github")
    ServiceId
);
string_id!(
    /// Tool ID wrapper, unique within its service (e.g. "list-repos")
    ToolId
);
string_id!(
    /// Role ID wrapper
    RoleId
);
string_id!(
    /// Profile ID wrapper
    ProfileId
);
string_id!(
    /// User ID wrapper
    UserId
);
string_id!(
    /// Coarse capability grant carried by a role (e.g. "tools.manage")
    PermissionId
);

// =============================================================================
// Permissions
// =============================================================================

/// Every permission id a role may carry
pub const KNOWN_PERMISSIONS: [&str; 7] = [
    "tools.manage",
    "tools.connect",
    "tools.use",
    "tools.view",
    "users.manage",
    "roles.manage",
    "logs.view",
];

impl PermissionId {
    /// Check whether this id is one of [`KNOWN_PERMISSIONS`]
    pub fn is_known(&self) -> bool {
        KNOWN_PERMISSIONS.contains(&self.as_str())
    }
}

// =============================================================================
// Plans
// =============================================================================

/// Subscription plan tier
///
/// Ordering is defined by [`PlanTier::rank`], never by the string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Pro,
    Max,
}

impl Default for PlanTier {
    fn default() -> Self {
        Self::Free
    }
}

impl PlanTier {
    /// All tiers, lowest first
    pub const ALL: [PlanTier; 3] = [PlanTier::Free, PlanTier::Pro, PlanTier::Max];

    /// Numeric rank of this tier (higher = more features)
    /// Free: 0, Pro: 1, Max: 2
    pub fn rank(&self) -> u8 {
        match self {
            Self::Free => 0,
            Self::Pro => 1,
            Self::Max => 2,
        }
    }

    /// Check if this tier satisfies a minimum requirement
    pub fn satisfies(&self, required: PlanTier) -> bool {
        self.rank() >= required.rank()
    }

    /// Human-readable plan name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Pro => "Pro",
            Self::Max => "Max",
        }
    }

    /// Maximum users allowed in an organization on this tier
    /// Free (3) → Pro (20) → Max (Unlimited)
    pub fn user_limit(&self) -> u32 {
        match self {
            Self::Free => 3,
            Self::Pro => 20,
            Self::Max => u32::MAX,
        }
    }

    pub fn definition(&self) -> PlanDefinition {
        PlanDefinition {
            tier: *self,
            name: self.display_name().to_string(),
            user_limit: self.user_limit(),
        }
    }
}

impl PartialOrd for PlanTier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PlanTier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl std::fmt::Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Free => write!(f, "free"),
            Self::Pro => write!(f, "pro"),
            Self::Max => write!(f, "max"),
        }
    }
}

impl std::str::FromStr for PlanTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "pro" => Ok(Self::Pro),
            "max" => Ok(Self::Max),
            _ => Err(format!("Invalid plan tier: {}", s)),
        }
    }
}

/// Plan offered to organizations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDefinition {
    pub tier: PlanTier,
    pub name: String,
    pub user_limit: u32,
}

/// Every plan, lowest tier first
pub fn plan_definitions() -> Vec<PlanDefinition> {
    PlanTier::ALL.iter().map(PlanTier::definition).collect()
}

/// Organization subscription state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationPlan {
    pub current_plan: PlanTier,
    pub user_limit: u32,
    pub user_count: u32,
}

impl OrganizationPlan {
    /// Plan on `tier` with the tier's default seat limit
    pub fn new(tier: PlanTier, user_count: u32) -> Self {
        Self {
            current_plan: tier,
            user_limit: tier.user_limit(),
            user_count,
        }
    }

    /// Same organization moved to another tier
    pub fn with_tier(&self, tier: PlanTier) -> Self {
        Self::new(tier, self.user_count)
    }

    /// Number of users above the seat limit (0 when within limit)
    pub fn seats_over_limit(&self) -> u32 {
        self.user_count.saturating_sub(self.user_limit)
    }
}

// =============================================================================
// Catalog Models
// =============================================================================

/// External integration exposed through MCP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
}

/// Input parameter of a tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: String,
}

/// Single callable capability of a service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tool {
    pub id: ToolId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<ToolParameter>,
}

// =============================================================================
// Directory Models
// =============================================================================

/// Services a role's members may connect to
///
/// `All` is the explicit wildcard. An empty `Only` set is interpreted by the
/// resolver configuration (deny by default).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceAllowList {
    All,
    Only(BTreeSet<ServiceId>),
}

impl Default for ServiceAllowList {
    fn default() -> Self {
        Self::Only(BTreeSet::new())
    }
}

impl ServiceAllowList {
    pub fn only<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ServiceId>,
    {
        Self::Only(ids.into_iter().map(Into::into).collect())
    }

    /// True for an `Only` list with no entries
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Only(ids) if ids.is_empty())
    }

    /// Whether the list names this service (wildcard included)
    pub fn lists(&self, service_id: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(ids) => ids.contains(service_id),
        }
    }

    /// Add a service; returns false if it was already allowed
    pub fn allow(&mut self, service_id: ServiceId) -> bool {
        match self {
            Self::All => false,
            Self::Only(ids) => ids.insert(service_id),
        }
    }

    /// Remove a service; returns false if it was not listed
    ///
    /// A wildcard list cannot be narrowed one service at a time.
    pub fn disallow(&mut self, service_id: &str) -> bool {
        match self {
            Self::All => false,
            Self::Only(ids) => ids.remove(service_id),
        }
    }
}

/// Named bundle of coarse permissions and a service allow-list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub permissions: BTreeSet<PermissionId>,
    #[serde(default)]
    pub allowed_services: ServiceAllowList,
}

impl Role {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}

/// Fine-grained tool allow-list applied to a set of roles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: ProfileId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub applied_roles: BTreeSet<RoleId>,
    #[serde(default)]
    pub module_permissions: BTreeMap<ServiceId, BTreeSet<ToolId>>,
}

impl Profile {
    pub fn is_applied_to(&self, role_id: &str) -> bool {
        self.applied_roles.contains(role_id)
    }

    /// Whether this profile lists `tool_id` for `service_id`
    pub fn grants(&self, service_id: &str, tool_id: &str) -> bool {
        self.module_permissions
            .get(service_id)
            .is_some_and(|tools| tools.contains(tool_id))
    }
}

/// Console user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub roles: BTreeSet<RoleId>,
}

impl User {
    pub fn has_role(&self, role_id: &str) -> bool {
        self.roles.contains(role_id)
    }
}

/// Tools a user has switched on for their own MCP sessions
///
/// Narrows what the user's roles and profiles grant; never widens it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserToolPreference {
    pub user_id: UserId,
    #[serde(default)]
    pub enabled_tools: BTreeMap<ServiceId, BTreeSet<ToolId>>,
}

impl UserToolPreference {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            enabled_tools: BTreeMap::new(),
        }
    }

    pub fn is_enabled(&self, service_id: &str, tool_id: &str) -> bool {
        self.enabled_tools
            .get(service_id)
            .is_some_and(|tools| tools.contains(tool_id))
    }

    /// Switch a tool on; returns false if it already was
    pub fn enable(&mut self, service_id: ServiceId, tool_id: ToolId) -> bool {
        self.enabled_tools.entry(service_id).or_default().insert(tool_id)
    }

    /// Switch a tool off; empty service entries are dropped
    pub fn disable(&mut self, service_id: &str, tool_id: &str) -> bool {
        let Some(tools) = self.enabled_tools.get_mut(service_id) else {
            return false;
        };
        let removed = tools.remove(tool_id);
        if tools.is_empty() {
            self.enabled_tools.remove(service_id);
        }
        removed
    }
}

// =============================================================================
// Tests
// =============================================================================
