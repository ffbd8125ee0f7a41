//! Entitlement Resolver
//!
//! Answers the question: "may this user use this tool on this service right now?"
//!
//! Two independent axes must both pass:
//!
//! 1. **Plan**: the organization's tier unlocks the service and the tool
//! 2. **Grant**: one of the user's roles allows the service, and a profile
//!    applied to one of the user's roles lists the tool
//!
//! Every operation is a pure function of the resolver's static requirement
//! tables and the snapshot passed in by the caller. Unknown service and tool
//! ids resolve to the configured default instead of failing.

use mcpist_shared::{
    OrganizationPlan, PermissionId, PlanTier, Profile, Role, Service, ServiceAllowList, Tool, User,
    UserToolPreference,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::{Catalog, PlanRequirements};
use crate::config::{EmptyAllowListMode, ResolverConfig};

/// Check if the `current` tier satisfies the `required` tier
///
/// Rank comparison only: `free < pro < max`.
pub fn is_plan_sufficient(current: PlanTier, required: PlanTier) -> bool {
    current.rank() >= required.rank()
}

/// Union of the permissions carried by the user's roles
///
/// Roles in the snapshot that the user does not hold are ignored, as are
/// role ids on the user that the snapshot does not contain.
pub fn effective_permissions(user: &User, roles: &[Role]) -> BTreeSet<PermissionId> {
    roles
        .iter()
        .filter(|role| user.has_role(role.id.as_str()))
        .flat_map(|role| role.permissions.iter().cloned())
        .collect()
}

/// Outcome of a tool grant check, naming the first gate that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GrantDecision {
    Granted,
    /// Organization plan is below the tool's effective requirement
    PlanLocked {
        required: PlanTier,
        current: PlanTier,
    },
    /// User holds no role present in the snapshot
    NoRoles,
    /// None of the user's roles allows the service
    ServiceNotAllowed,
    /// No profile applied to the user's roles lists the tool
    ToolNotGranted,
}

impl GrantDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, GrantDecision::Granted)
    }
}

impl std::fmt::Display for GrantDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GrantDecision::Granted => write!(f, "granted"),
            GrantDecision::PlanLocked { required, current } => {
                write!(f, "requires the {} plan (current: {})", required, current)
            }
            GrantDecision::NoRoles => write!(f, "user has no roles"),
            GrantDecision::ServiceNotAllowed => write!(f, "service not allowed for user's roles"),
            GrantDecision::ToolNotGranted => write!(f, "tool not granted by any applied profile"),
        }
    }
}

/// Catalog split by plan availability, each side in catalog order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePartition {
    pub available: Vec<Service>,
    pub locked: Vec<Service>,
}

/// Stateless entitlement resolver over static plan requirement tables
#[derive(Debug, Clone, Default)]
pub struct EntitlementResolver {
    requirements: PlanRequirements,
    config: ResolverConfig,
}

impl EntitlementResolver {
    pub fn new(requirements: PlanRequirements, config: ResolverConfig) -> Self {
        Self {
            requirements,
            config,
        }
    }

    pub fn from_catalog(catalog: &Catalog, config: ResolverConfig) -> Self {
        Self::new(catalog.requirements.clone(), config)
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn requirements(&self) -> &PlanRequirements {
        &self.requirements
    }

    // =========================================================================
    // Plan axis
    // =========================================================================

    /// Minimum tier required to use a service at all
    ///
    /// Unmapped services fall back to the configured policy (`free` by default).
    pub fn required_plan_for_service(&self, service_id: &str) -> PlanTier {
        self.requirements
            .service(service_id)
            .unwrap_or_else(|| self.config.unmapped_plan.service_default())
    }

    /// Minimum tier required to use a specific tool
    ///
    /// Never lower than the owning service's requirement.
    pub fn required_plan_for_tool(&self, service_id: &str, tool_id: &str) -> PlanTier {
        let service_plan = self.required_plan_for_service(service_id);
        let tool_plan = self
            .requirements
            .tool(service_id, tool_id)
            .unwrap_or(PlanTier::Free);
        service_plan.max(tool_plan)
    }

    pub fn is_service_usable(&self, org_plan: &OrganizationPlan, service_id: &str) -> bool {
        is_plan_sufficient(
            org_plan.current_plan,
            self.required_plan_for_service(service_id),
        )
    }

    /// Whether the subscription unlocks the tool
    ///
    /// Necessary but not sufficient: says nothing about role or profile grants.
    pub fn is_tool_usable(
        &self,
        org_plan: &OrganizationPlan,
        service_id: &str,
        tool_id: &str,
    ) -> bool {
        is_plan_sufficient(
            org_plan.current_plan,
            self.required_plan_for_tool(service_id, tool_id),
        )
    }

    /// Split the catalog into plan-available and plan-locked services
    ///
    /// No role or profile filtering is applied.
    pub fn list_usable_services_for_org(
        &self,
        org_plan: &OrganizationPlan,
        services: &[Service],
    ) -> ServicePartition {
        let (available, locked): (Vec<Service>, Vec<Service>) = services
            .iter()
            .cloned()
            .partition(|service| self.is_service_usable(org_plan, service.id.as_str()));
        ServicePartition { available, locked }
    }

    /// Catalog grouped into sections by required tier, catalog order kept
    ///
    /// Every tier has an entry, possibly empty.
    pub fn group_services_by_plan(&self, services: &[Service]) -> BTreeMap<PlanTier, Vec<Service>> {
        let mut sections: BTreeMap<PlanTier, Vec<Service>> =
            PlanTier::ALL.iter().map(|tier| (*tier, Vec::new())).collect();
        for service in services {
            sections
                .entry(self.required_plan_for_service(service.id.as_str()))
                .or_default()
                .push(service.clone());
        }
        sections
    }

    /// Number of a service's tools unlocked by the plan
    pub fn unlocked_tool_count(
        &self,
        org_plan: &OrganizationPlan,
        service_id: &str,
        tools: &[Tool],
    ) -> usize {
        tools
            .iter()
            .filter(|tool| self.is_tool_usable(org_plan, service_id, tool.id.as_str()))
            .count()
    }

    // =========================================================================
    // Grant axis
    // =========================================================================

    /// Whether the role's allow-list admits every service
    ///
    /// True for the explicit wildcard, and for an empty list when empty lists
    /// are read as unrestricted.
    pub fn role_reaches_all_services(&self, role: &Role) -> bool {
        match &role.allowed_services {
            ServiceAllowList::All => true,
            ServiceAllowList::Only(ids) => {
                ids.is_empty() && self.config.empty_allow_list == EmptyAllowListMode::Unrestricted
            }
        }
    }

    /// Whether a single role's allow-list admits the service
    pub fn role_allows_service(&self, role: &Role, service_id: &str) -> bool {
        if role.allowed_services.is_empty() {
            return self.config.empty_allow_list == EmptyAllowListMode::Unrestricted;
        }
        role.allowed_services.lists(service_id)
    }

    /// Full decision for a (user, service, tool) triple
    ///
    /// Gates are checked in order: plan, roles, service allow-list, profile
    /// tool grant. The first failing gate is reported.
    pub fn explain_tool_grant(
        &self,
        user: &User,
        roles: &[Role],
        profiles: &[Profile],
        org_plan: &OrganizationPlan,
        service_id: &str,
        tool_id: &str,
    ) -> GrantDecision {
        let required = self.required_plan_for_tool(service_id, tool_id);
        let decision = if !is_plan_sufficient(org_plan.current_plan, required) {
            GrantDecision::PlanLocked {
                required,
                current: org_plan.current_plan,
            }
        } else {
            self.explain_role_grant(user, roles, profiles, service_id, tool_id)
        };

        if !decision.is_granted() {
            tracing::debug!(
                user_id = %user.id,
                service_id,
                tool_id,
                reason = %decision,
                "Tool grant denied"
            );
        }
        decision
    }

    fn explain_role_grant(
        &self,
        user: &User,
        roles: &[Role],
        profiles: &[Profile],
        service_id: &str,
        tool_id: &str,
    ) -> GrantDecision {
        let user_roles: Vec<&Role> = roles
            .iter()
            .filter(|role| user.has_role(role.id.as_str()))
            .collect();
        if user_roles.is_empty() {
            return GrantDecision::NoRoles;
        }

        if !user_roles
            .iter()
            .any(|role| self.role_allows_service(role, service_id))
        {
            return GrantDecision::ServiceNotAllowed;
        }

        let tool_granted = profiles.iter().any(|profile| {
            profile.grants(service_id, tool_id)
                && user_roles
                    .iter()
                    .any(|role| profile.is_applied_to(role.id.as_str()))
        });
        if !tool_granted {
            return GrantDecision::ToolNotGranted;
        }

        GrantDecision::Granted
    }

    /// True iff the plan, service and tool gates all pass
    pub fn effective_tool_grant(
        &self,
        user: &User,
        roles: &[Role],
        profiles: &[Profile],
        org_plan: &OrganizationPlan,
        service_id: &str,
        tool_id: &str,
    ) -> bool {
        self.explain_tool_grant(user, roles, profiles, org_plan, service_id, tool_id)
            .is_granted()
    }

    /// Tools of a service the user is entitled to, in catalog order
    pub fn granted_tools<'a>(
        &self,
        user: &User,
        roles: &[Role],
        profiles: &[Profile],
        org_plan: &OrganizationPlan,
        service_id: &str,
        tools: &'a [Tool],
    ) -> Vec<&'a Tool> {
        tools
            .iter()
            .filter(|tool| {
                self.effective_tool_grant(
                    user,
                    roles,
                    profiles,
                    org_plan,
                    service_id,
                    tool.id.as_str(),
                )
            })
            .collect()
    }

    /// Granted tools the user has also switched on, in catalog order
    ///
    /// Preferences only narrow: a tool enabled in `preference` but not granted
    /// stays out. Without a preference record nothing is enabled.
    #[allow(clippy::too_many_arguments)]
    pub fn enabled_tools<'a>(
        &self,
        user: &User,
        roles: &[Role],
        profiles: &[Profile],
        org_plan: &OrganizationPlan,
        preference: Option<&UserToolPreference>,
        service_id: &str,
        tools: &'a [Tool],
    ) -> Vec<&'a Tool> {
        let Some(preference) = preference else {
            return Vec::new();
        };
        self.granted_tools(user, roles, profiles, org_plan, service_id, tools)
            .into_iter()
            .filter(|tool| preference.is_enabled(service_id, tool.id.as_str()))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::UnmappedPlanPolicy;
    use mcpist_shared::{ProfileId, RoleId, ServiceAllowList, ServiceId, ToolId, UserId};

    fn service(id: &str) -> Service {
        Service {
            id: ServiceId::from(id),
            name: id.to_string(),
            description: String::new(),
            category: String::new(),
        }
    }

    fn tool(id: &str) -> Tool {
        Tool {
            id: ToolId::from(id),
            name: id.replace('-', "_"),
            description: String::new(),
            parameters: Vec::new(),
        }
    }

    fn user(roles: &[&str]) -> User {
        User {
            id: UserId::from("u1"),
            name: "Test User".to_string(),
            email: "user@example.com".to_string(),
            roles: roles.iter().map(|r| RoleId::from(*r)).collect(),
        }
    }

    fn role(id: &str, allowed: ServiceAllowList) -> Role {
        Role {
            id: RoleId::from(id),
            name: format!("role-{}", id),
            description: String::new(),
            permissions: BTreeSet::new(),
            allowed_services: allowed,
        }
    }

    fn profile(id: &str, applied: &[&str], service_id: &str, tools: &[&str]) -> Profile {
        let mut module_permissions = BTreeMap::new();
        module_permissions.insert(
            ServiceId::from(service_id),
            tools.iter().map(|t| ToolId::from(*t)).collect(),
        );
        Profile {
            id: ProfileId::from(id),
            name: format!("profile-{}", id),
            description: String::new(),
            applied_roles: applied.iter().map(|r| RoleId::from(*r)).collect(),
            module_permissions,
        }
    }

    fn resolver() -> EntitlementResolver {
        let reqs = PlanRequirements::new()
            .with_service("github", PlanTier::Free)
            .with_service("slack", PlanTier::Pro)
            .with_service("zaim", PlanTier::Max)
            .with_tool("github", "create-issue", PlanTier::Pro)
            .with_tool("zaim", "get-transactions", PlanTier::Free);
        EntitlementResolver::new(reqs, ResolverConfig::default())
    }

    // =========================================================================
    // Plan axis
    // =========================================================================

    #[test]
    fn test_is_plan_sufficient_table() {
        for current in PlanTier::ALL {
            for required in PlanTier::ALL {
                assert_eq!(
                    is_plan_sufficient(current, required),
                    current.rank() >= required.rank()
                );
            }
        }
        assert!(is_plan_sufficient(PlanTier::Pro, PlanTier::Free));
        assert!(!is_plan_sufficient(PlanTier::Free, PlanTier::Max));
        assert!(is_plan_sufficient(PlanTier::Max, PlanTier::Max));
    }

    #[test]
    fn test_unmapped_service_fails_open_by_default() {
        assert_eq!(resolver().required_plan_for_service("unknown"), PlanTier::Free);
    }

    #[test]
    fn test_unmapped_service_fail_closed_policy() {
        let config = ResolverConfig {
            unmapped_plan: UnmappedPlanPolicy::FailClosed,
            ..ResolverConfig::default()
        };
        let resolver = EntitlementResolver::new(resolver().requirements().clone(), config);
        assert_eq!(resolver.required_plan_for_service("unknown"), PlanTier::Max);
        assert_eq!(resolver.required_plan_for_tool("unknown", "any"), PlanTier::Max);
        // Mapped services are unaffected by the policy
        assert_eq!(resolver.required_plan_for_service("github"), PlanTier::Free);
    }

    #[test]
    fn test_tool_requirement_never_below_service() {
        let resolver = resolver();
        // Tool configured lower than its service is lifted
        assert_eq!(
            resolver.required_plan_for_tool("zaim", "get-transactions"),
            PlanTier::Max
        );
        // Tool configured higher than its service wins
        assert_eq!(
            resolver.required_plan_for_tool("github", "create-issue"),
            PlanTier::Pro
        );
    }

    #[test]
    fn test_unset_tool_requirement_is_service_requirement() {
        let resolver = resolver();
        assert_eq!(resolver.required_plan_for_tool("slack", "send-message"), PlanTier::Pro);
        assert_eq!(resolver.required_plan_for_tool("github", "list-repos"), PlanTier::Free);
    }

    #[test]
    fn test_service_and_tool_usability() {
        let resolver = resolver();
        let free = OrganizationPlan::new(PlanTier::Free, 1);
        let pro = OrganizationPlan::new(PlanTier::Pro, 1);

        assert!(resolver.is_service_usable(&free, "github"));
        assert!(!resolver.is_service_usable(&free, "slack"));
        assert!(resolver.is_service_usable(&pro, "slack"));
        assert!(!resolver.is_service_usable(&pro, "zaim"));

        assert!(resolver.is_tool_usable(&free, "github", "list-repos"));
        assert!(!resolver.is_tool_usable(&free, "github", "create-issue"));
        assert!(resolver.is_tool_usable(&pro, "github", "create-issue"));
    }

    #[test]
    fn test_partition_preserves_order() {
        let resolver = resolver();
        let catalog = vec![service("zaim"), service("github"), service("slack"), service("notion")];
        let partition =
            resolver.list_usable_services_for_org(&OrganizationPlan::new(PlanTier::Free, 1), &catalog);

        let available: Vec<&str> = partition.available.iter().map(|s| s.id.as_str()).collect();
        let locked: Vec<&str> = partition.locked.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(available, vec!["github", "notion"]);
        assert_eq!(locked, vec!["zaim", "slack"]);
    }

    #[test]
    fn test_group_services_by_plan() {
        let resolver = resolver();
        let catalog = vec![service("zaim"), service("github"), service("slack"), service("notion")];
        let sections = resolver.group_services_by_plan(&catalog);

        assert_eq!(sections.len(), 3);
        let free: Vec<&str> = sections[&PlanTier::Free].iter().map(|s| s.id.as_str()).collect();
        assert_eq!(free, vec!["github", "notion"]);
        assert_eq!(sections[&PlanTier::Pro].len(), 1);
        assert_eq!(sections[&PlanTier::Max][0].id.as_str(), "zaim");
    }

    #[test]
    fn test_unlocked_tool_count() {
        let resolver = resolver();
        let tools = vec![tool("list-repos"), tool("create-issue")];
        assert_eq!(
            resolver.unlocked_tool_count(&OrganizationPlan::new(PlanTier::Free, 1), "github", &tools),
            1
        );
        assert_eq!(
            resolver.unlocked_tool_count(&OrganizationPlan::new(PlanTier::Pro, 1), "github", &tools),
            2
        );
    }

    // =========================================================================
    // Grant axis
    // =========================================================================

    #[test]
    fn test_grant_requires_all_three_gates() {
        let resolver = resolver();
        let user = user(&["r"]);
        let roles = vec![role("r", ServiceAllowList::only(["github"]))];
        let profiles = vec![profile("p", &["r"], "github", &["list-repos"])];
        let pro = OrganizationPlan::new(PlanTier::Pro, 1);

        assert!(resolver.effective_tool_grant(&user, &roles, &profiles, &pro, "github", "list-repos"));

        // Profile no longer lists the tool
        let stripped = vec![profile("p", &["r"], "github", &[])];
        assert_eq!(
            resolver.explain_tool_grant(&user, &roles, &stripped, &pro, "github", "list-repos"),
            GrantDecision::ToolNotGranted
        );

        // Role no longer allows the service
        let narrowed = vec![role("r", ServiceAllowList::only(["notion"]))];
        assert_eq!(
            resolver.explain_tool_grant(&user, &narrowed, &profiles, &pro, "github", "list-repos"),
            GrantDecision::ServiceNotAllowed
        );
    }

    #[test]
    fn test_plan_gate_reported_first() {
        let resolver = resolver();
        let user = user(&["r"]);
        let roles = vec![role("r", ServiceAllowList::only(["github"]))];
        let profiles = vec![profile("p", &["r"], "github", &["create-issue"])];
        let free = OrganizationPlan::new(PlanTier::Free, 1);

        assert_eq!(
            resolver.explain_tool_grant(&user, &roles, &profiles, &free, "github", "create-issue"),
            GrantDecision::PlanLocked {
                required: PlanTier::Pro,
                current: PlanTier::Free
            }
        );
        let pro = OrganizationPlan::new(PlanTier::Pro, 1);
        assert!(resolver.effective_tool_grant(&user, &roles, &profiles, &pro, "github", "create-issue"));
    }

    #[test]
    fn test_user_without_roles_denied() {
        let resolver = resolver();
        let roles = vec![role("r", ServiceAllowList::All)];
        let profiles = vec![profile("p", &["r"], "github", &["list-repos"])];
        let max = OrganizationPlan::new(PlanTier::Max, 1);

        assert_eq!(
            resolver.explain_tool_grant(&user(&[]), &roles, &profiles, &max, "github", "list-repos"),
            GrantDecision::NoRoles
        );
        // Role ids the snapshot does not know count as no roles
        assert_eq!(
            resolver.explain_tool_grant(&user(&["ghost"]), &roles, &profiles, &max, "github", "list-repos"),
            GrantDecision::NoRoles
        );
    }

    #[test]
    fn test_profile_must_be_applied_to_users_role() {
        let resolver = resolver();
        let user = user(&["r"]);
        let roles = vec![
            role("r", ServiceAllowList::only(["github"])),
            role("other", ServiceAllowList::only(["github"])),
        ];
        let profiles = vec![profile("p", &["other"], "github", &["list-repos"])];
        let pro = OrganizationPlan::new(PlanTier::Pro, 1);

        assert_eq!(
            resolver.explain_tool_grant(&user, &roles, &profiles, &pro, "github", "list-repos"),
            GrantDecision::ToolNotGranted
        );
    }

    #[test]
    fn test_gates_may_be_satisfied_by_different_roles() {
        let resolver = resolver();
        let user = user(&["a", "b"]);
        let roles = vec![
            role("a", ServiceAllowList::only(["github"])),
            role("b", ServiceAllowList::default()),
        ];
        let profiles = vec![profile("p", &["b"], "github", &["list-repos"])];
        let pro = OrganizationPlan::new(PlanTier::Pro, 1);

        assert!(resolver.effective_tool_grant(&user, &roles, &profiles, &pro, "github", "list-repos"));
    }

    #[test]
    fn test_empty_allow_list_denies_by_default() {
        let resolver = resolver();
        let user = user(&["r"]);
        let roles = vec![role("r", ServiceAllowList::default())];
        let profiles = vec![profile("p", &["r"], "github", &["list-repos"])];
        let pro = OrganizationPlan::new(PlanTier::Pro, 1);

        assert_eq!(
            resolver.explain_tool_grant(&user, &roles, &profiles, &pro, "github", "list-repos"),
            GrantDecision::ServiceNotAllowed
        );
    }

    #[test]
    fn test_empty_allow_list_unrestricted_mode() {
        let config = ResolverConfig {
            empty_allow_list: EmptyAllowListMode::Unrestricted,
            ..ResolverConfig::default()
        };
        let resolver = EntitlementResolver::new(resolver().requirements().clone(), config);
        let user = user(&["r"]);
        let roles = vec![role("r", ServiceAllowList::default())];
        let profiles = vec![profile("p", &["r"], "github", &["list-repos"])];
        let pro = OrganizationPlan::new(PlanTier::Pro, 1);

        assert!(resolver.effective_tool_grant(&user, &roles, &profiles, &pro, "github", "list-repos"));
        // A non-empty list still restricts in this mode
        let narrowed = vec![role("r", ServiceAllowList::only(["notion"]))];
        assert!(!resolver.effective_tool_grant(&user, &narrowed, &profiles, &pro, "github", "list-repos"));
    }

    #[test]
    fn test_wildcard_allow_list() {
        let resolver = resolver();
        let user = user(&["r"]);
        let roles = vec![role("r", ServiceAllowList::All)];
        let profiles = vec![profile("p", &["r"], "slack", &["send-message"])];
        let pro = OrganizationPlan::new(PlanTier::Pro, 1);

        assert!(resolver.effective_tool_grant(&user, &roles, &profiles, &pro, "slack", "send-message"));
    }

    #[test]
    fn test_granted_tools_in_catalog_order() {
        let resolver = resolver();
        let user = user(&["r"]);
        let roles = vec![role("r", ServiceAllowList::only(["github"]))];
        let profiles = vec![profile("p", &["r"], "github", &["create-issue", "list-repos"])];
        let tools = vec![tool("list-repos"), tool("create-issue"), tool("delete-repo")];

        let free = OrganizationPlan::new(PlanTier::Free, 1);
        let granted = resolver.granted_tools(&user, &roles, &profiles, &free, "github", &tools);
        assert_eq!(granted.len(), 1);
        assert_eq!(granted[0].id.as_str(), "list-repos");

        let pro = OrganizationPlan::new(PlanTier::Pro, 1);
        let granted: Vec<&str> = resolver
            .granted_tools(&user, &roles, &profiles, &pro, "github", &tools)
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(granted, vec!["list-repos", "create-issue"]);
    }

    #[test]
    fn test_enabled_tools_narrow_grants() {
        let resolver = resolver();
        let user = user(&["r"]);
        let roles = vec![role("r", ServiceAllowList::only(["github"]))];
        let profiles = vec![profile("p", &["r"], "github", &["list-repos", "create-issue"])];
        let tools = vec![tool("list-repos"), tool("create-issue"), tool("delete-repo")];
        let pro = OrganizationPlan::new(PlanTier::Pro, 1);

        let mut preference = UserToolPreference::new(UserId::from("u1"));
        // delete-repo is switched on but never granted
        preference.enable(ServiceId::from("github"), ToolId::from("create-issue"));
        preference.enable(ServiceId::from("github"), ToolId::from("delete-repo"));

        let enabled: Vec<&str> = resolver
            .enabled_tools(&user, &roles, &profiles, &pro, Some(&preference), "github", &tools)
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(enabled, vec!["create-issue"]);

        // The plan still gates an enabled, granted tool
        let free = OrganizationPlan::new(PlanTier::Free, 1);
        assert!(resolver
            .enabled_tools(&user, &roles, &profiles, &free, Some(&preference), "github", &tools)
            .is_empty());
        assert!(resolver
            .enabled_tools(&user, &roles, &profiles, &pro, None, "github", &tools)
            .is_empty());
    }

    #[test]
    fn test_role_reaches_all_services() {
        let unrestricted = EntitlementResolver::new(
            PlanRequirements::new(),
            ResolverConfig {
                empty_allow_list: EmptyAllowListMode::Unrestricted,
                ..ResolverConfig::default()
            },
        );
        let deny = resolver();

        let empty = role("r", ServiceAllowList::default());
        let wildcard = role("r", ServiceAllowList::All);
        let listed = role("r", ServiceAllowList::only(["github"]));

        assert!(!deny.role_reaches_all_services(&empty));
        assert!(unrestricted.role_reaches_all_services(&empty));
        assert!(deny.role_reaches_all_services(&wildcard));
        assert!(!unrestricted.role_reaches_all_services(&listed));
    }

    #[test]
    fn test_effective_permissions_union() {
        let mut admin = role("admin", ServiceAllowList::All);
        admin.permissions = ["users.manage", "logs.view"]
            .into_iter()
            .map(PermissionId::from)
            .collect();
        let mut dev = role("dev", ServiceAllowList::default());
        dev.permissions = ["tools.use", "logs.view"]
            .into_iter()
            .map(PermissionId::from)
            .collect();
        let mut other = role("other", ServiceAllowList::default());
        other.permissions = [PermissionId::from("roles.manage")].into_iter().collect();
        let roles = vec![admin, dev, other];

        let perms = effective_permissions(&user(&["admin", "dev"]), &roles);
        let perms: Vec<&str> = perms.iter().map(|p| p.as_str()).collect();
        assert_eq!(perms, vec!["logs.view", "tools.use", "users.manage"]);

        assert!(effective_permissions(&user(&[]), &roles).is_empty());
    }

    #[test]
    fn test_decision_display() {
        let locked = GrantDecision::PlanLocked {
            required: PlanTier::Max,
            current: PlanTier::Pro,
        };
        assert_eq!(locked.to_string(), "requires the max plan (current: pro)");
        assert_eq!(GrantDecision::Granted.to_string(), "granted");
    }
}
