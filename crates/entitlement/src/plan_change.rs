//! Plan Change Preview
//!
//! Computes what an organization loses (or regains) when it moves to another
//! tier, before the change is committed. Downgrades never rewrite roles or
//! profiles: locked grants stay recorded and come back on re-upgrade.
//!
//! ## What is reported
//! - Services that become locked by plan
//! - Profile tool grants that become locked
//! - Role service allowances that become locked
//! - Seats above the new tier's user limit

use mcpist_shared::{PlanTier, ProfileId, RoleId, Service, ServiceAllowList, ServiceId, ToolId};
use serde::{Deserialize, Serialize};

use crate::resolver::EntitlementResolver;
use crate::store::Snapshot;

/// Direction of a tier move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanChangeDirection {
    Upgrade,
    Downgrade,
    Unchanged,
}

impl PlanChangeDirection {
    pub fn between(from: PlanTier, to: PlanTier) -> Self {
        match to.rank().cmp(&from.rank()) {
            std::cmp::Ordering::Greater => PlanChangeDirection::Upgrade,
            std::cmp::Ordering::Less => PlanChangeDirection::Downgrade,
            std::cmp::Ordering::Equal => PlanChangeDirection::Unchanged,
        }
    }
}

/// Tool listed by a profile that the target tier no longer unlocks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedToolGrant {
    pub profile_id: ProfileId,
    pub service_id: ServiceId,
    pub tool_id: ToolId,
    pub required: PlanTier,
}

/// Service allowed by a role that the target tier no longer unlocks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedRoleService {
    pub role_id: RoleId,
    pub service_id: ServiceId,
    pub required: PlanTier,
}

/// Impact of moving the organization to another tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanChangeImpact {
    pub from: PlanTier,
    pub to: PlanTier,
    pub direction: PlanChangeDirection,
    /// Catalog order
    pub locked_services: Vec<ServiceId>,
    pub locked_tool_grants: Vec<LockedToolGrant>,
    pub locked_role_services: Vec<LockedRoleService>,
    pub user_limit: u32,
    pub seats_over_limit: u32,
}

impl PlanChangeImpact {
    /// True when nothing currently usable would become locked
    pub fn is_lossless(&self) -> bool {
        self.locked_services.is_empty()
            && self.locked_tool_grants.is_empty()
            && self.locked_role_services.is_empty()
            && self.seats_over_limit == 0
    }
}

/// Preview a move of the snapshot's organization to `target`
///
/// Only grants usable on the current tier and unusable on the target are
/// reported. A role that reaches every service (a wildcard, or an empty list
/// under [`EmptyAllowListMode::Unrestricted`]) reports each catalog service
/// that becomes locked.
///
/// [`EmptyAllowListMode::Unrestricted`]: crate::config::EmptyAllowListMode::Unrestricted
pub fn preview_plan_change(
    resolver: &EntitlementResolver,
    services: &[Service],
    snapshot: &Snapshot,
    target: PlanTier,
) -> PlanChangeImpact {
    let current = &snapshot.org_plan;
    let next = current.with_tier(target);

    let locked_services = services
        .iter()
        .filter(|service| {
            let id = service.id.as_str();
            resolver.is_service_usable(current, id) && !resolver.is_service_usable(&next, id)
        })
        .map(|service| service.id.clone())
        .collect();

    let mut locked_tool_grants = Vec::new();
    for profile in &snapshot.profiles {
        for (service_id, tools) in &profile.module_permissions {
            for tool_id in tools {
                let (service, tool) = (service_id.as_str(), tool_id.as_str());
                if resolver.is_tool_usable(current, service, tool)
                    && !resolver.is_tool_usable(&next, service, tool)
                {
                    locked_tool_grants.push(LockedToolGrant {
                        profile_id: profile.id.clone(),
                        service_id: service_id.clone(),
                        tool_id: tool_id.clone(),
                        required: resolver.required_plan_for_tool(service, tool),
                    });
                }
            }
        }
    }

    let mut locked_role_services = Vec::new();
    for role in &snapshot.roles {
        let service_ids: Vec<&ServiceId> = match &role.allowed_services {
            ServiceAllowList::Only(ids) if !resolver.role_reaches_all_services(role) => {
                ids.iter().collect()
            }
            _ => services.iter().map(|s| &s.id).collect(),
        };
        for service_id in service_ids {
            let service = service_id.as_str();
            if resolver.is_service_usable(current, service)
                && !resolver.is_service_usable(&next, service)
            {
                locked_role_services.push(LockedRoleService {
                    role_id: role.id.clone(),
                    service_id: service_id.clone(),
                    required: resolver.required_plan_for_service(service),
                });
            }
        }
    }

    PlanChangeImpact {
        from: current.current_plan,
        to: target,
        direction: PlanChangeDirection::between(current.current_plan, target),
        locked_services,
        locked_tool_grants,
        locked_role_services,
        user_limit: next.user_limit,
        seats_over_limit: next.seats_over_limit(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample;

    fn fixture() -> (EntitlementResolver, Vec<Service>, Snapshot) {
        let catalog = sample::catalog();
        let resolver = EntitlementResolver::from_catalog(&catalog, Default::default());
        (resolver, catalog.services, sample::snapshot())
    }

    #[test]
    fn test_direction() {
        assert_eq!(
            PlanChangeDirection::between(PlanTier::Free, PlanTier::Max),
            PlanChangeDirection::Upgrade
        );
        assert_eq!(
            PlanChangeDirection::between(PlanTier::Max, PlanTier::Pro),
            PlanChangeDirection::Downgrade
        );
        assert_eq!(
            PlanChangeDirection::between(PlanTier::Pro, PlanTier::Pro),
            PlanChangeDirection::Unchanged
        );
    }

    #[test]
    fn test_upgrade_is_lossless() {
        let (resolver, services, snapshot) = fixture();
        let impact = preview_plan_change(&resolver, &services, &snapshot, PlanTier::Max);
        assert_eq!(impact.direction, PlanChangeDirection::Upgrade);
        assert!(impact.is_lossless());
    }

    #[test]
    fn test_unchanged_is_lossless() {
        let (resolver, services, snapshot) = fixture();
        let impact = preview_plan_change(&resolver, &services, &snapshot, PlanTier::Pro);
        assert_eq!(impact.direction, PlanChangeDirection::Unchanged);
        assert!(impact.is_lossless());
    }

    #[test]
    fn test_downgrade_to_free_reports_losses() {
        let (resolver, services, snapshot) = fixture();
        let impact = preview_plan_change(&resolver, &services, &snapshot, PlanTier::Free);

        assert_eq!(impact.direction, PlanChangeDirection::Downgrade);
        assert!(!impact.is_lossless());

        let services: Vec<&str> = impact.locked_services.iter().map(|s| s.as_str()).collect();
        assert_eq!(services, vec!["slack", "dropbox", "trello", "jira", "asana"]);

        // Full-access profile grants slack/send-message, calendar/delete-event
        // and github/create-issue, all pro-only
        let full_access: Vec<(&str, &str)> = impact
            .locked_tool_grants
            .iter()
            .filter(|g| g.profile_id.as_str() == "3")
            .map(|g| (g.service_id.as_str(), g.tool_id.as_str()))
            .collect();
        assert!(full_access.contains(&("slack", "send-message")));
        assert!(full_access.contains(&("google-calendar", "delete-event")));
        assert!(full_access.contains(&("github", "create-issue")));
        assert!(impact
            .locked_tool_grants
            .iter()
            .all(|g| g.required == PlanTier::Pro));

        // Seed org has 5 users; free allows 3
        assert_eq!(impact.user_limit, 3);
        assert_eq!(impact.seats_over_limit, 2);
    }

    #[test]
    fn test_already_locked_grants_not_reported() {
        let (resolver, services, snapshot) = fixture();
        // Accounting role allows freee/zaim, which already need max on pro
        let impact = preview_plan_change(&resolver, &services, &snapshot, PlanTier::Free);
        assert!(impact
            .locked_role_services
            .iter()
            .all(|r| r.role_id.as_str() != "4"));
    }

    fn role_losses(impact: &PlanChangeImpact, role_id: &str) -> Vec<String> {
        impact
            .locked_role_services
            .iter()
            .filter(|r| r.role_id.as_str() == role_id)
            .map(|r| r.service_id.to_string())
            .collect()
    }

    #[test]
    fn test_wildcard_role_reports_every_locked_service() {
        let (resolver, services, snapshot) = fixture();
        let impact = preview_plan_change(&resolver, &services, &snapshot, PlanTier::Free);
        assert_eq!(
            role_losses(&impact, "1"),
            vec!["slack", "dropbox", "trello", "jira", "asana"]
        );
        // Partner role has an empty list, which reaches nothing by default
        assert!(role_losses(&impact, "5").is_empty());
    }

    #[test]
    fn test_unrestricted_empty_role_reports_locked_services() {
        let catalog = sample::catalog();
        let config = crate::config::ResolverConfig {
            empty_allow_list: crate::config::EmptyAllowListMode::Unrestricted,
            ..Default::default()
        };
        let resolver = EntitlementResolver::from_catalog(&catalog, config);
        let snapshot = sample::snapshot();

        let impact = preview_plan_change(&resolver, &catalog.services, &snapshot, PlanTier::Free);
        assert_eq!(
            role_losses(&impact, "5"),
            vec!["slack", "dropbox", "trello", "jira", "asana"]
        );
        // Listed roles report only what they list
        assert!(role_losses(&impact, "3").is_empty());
        assert!(role_losses(&impact, "2").is_empty());
    }
}
