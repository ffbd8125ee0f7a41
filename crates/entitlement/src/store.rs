//! In-memory entitlement store
//!
//! Owns the mutable assignment relations (user roles, role permissions and
//! service allow-lists, profile role applications and tool grants, the
//! organization plan), per-user tool preferences and the usage request
//! queue. Readers get a cloned
//! [`Snapshot`] and evaluate the resolver against it; writers are serialized
//! through a single lock.

use mcpist_shared::{
    OrganizationPlan, PermissionId, PlanTier, Profile, Role, ServiceAllowList, ServiceId, ToolId,
    User, UserId, UserToolPreference,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::RwLock;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::config::EmptyAllowListMode;
use crate::error::{EntitlementError, EntitlementResult};
use crate::plan_change::{preview_plan_change, PlanChangeImpact};
use crate::requests::{RequestStatus, UsageRequest};
use crate::resolver::{effective_permissions, EntitlementResolver, GrantDecision};

/// Consistent view of the assignment state at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub org_plan: OrganizationPlan,
    pub roles: Vec<Role>,
    pub profiles: Vec<Profile>,
    pub users: Vec<User>,
    #[serde(default)]
    pub preferences: Vec<UserToolPreference>,
}

impl Snapshot {
    pub fn user(&self, user_id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id.as_str() == user_id)
    }

    pub fn role(&self, role_id: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.id.as_str() == role_id)
    }

    pub fn profile(&self, profile_id: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.id.as_str() == profile_id)
    }

    pub fn preference(&self, user_id: &str) -> Option<&UserToolPreference> {
        self.preferences.iter().find(|p| p.user_id.as_str() == user_id)
    }

    /// Grant decision for a user id; unknown users have no roles
    pub fn explain_tool_grant(
        &self,
        resolver: &EntitlementResolver,
        user_id: &str,
        service_id: &str,
        tool_id: &str,
    ) -> GrantDecision {
        let anonymous;
        let user = match self.user(user_id) {
            Some(user) => user,
            None => {
                anonymous = User {
                    id: UserId::from(user_id),
                    name: String::new(),
                    email: String::new(),
                    roles: BTreeSet::new(),
                };
                &anonymous
            }
        };
        resolver.explain_tool_grant(
            user,
            &self.roles,
            &self.profiles,
            &self.org_plan,
            service_id,
            tool_id,
        )
    }

    /// Effective permission set for a user id (empty for unknown users)
    pub fn effective_permissions(&self, user_id: &str) -> BTreeSet<PermissionId> {
        self.user(user_id)
            .map(|user| effective_permissions(user, &self.roles))
            .unwrap_or_default()
    }

    /// Service and tool ids the snapshot names that `catalog` does not know
    ///
    /// Wildcard allow-lists name nothing and are never reported.
    pub fn unresolved_references(&self, catalog: &Catalog) -> Vec<String> {
        let mut unresolved = Vec::new();
        for role in &self.roles {
            if let ServiceAllowList::Only(ids) = &role.allowed_services {
                for service_id in ids {
                    if catalog.service(service_id.as_str()).is_none() {
                        unresolved.push(format!("role {} allows service {}", role.id, service_id));
                    }
                }
            }
        }
        let tool_lists = self
            .profiles
            .iter()
            .map(|p| (format!("profile {}", p.id), &p.module_permissions))
            .chain(
                self.preferences
                    .iter()
                    .map(|p| (format!("preference of user {}", p.user_id), &p.enabled_tools)),
            );
        for (owner, services) in tool_lists {
            for (service_id, tools) in services {
                if catalog.service(service_id.as_str()).is_none() {
                    unresolved.push(format!("{} names service {}", owner, service_id));
                    continue;
                }
                for tool_id in tools {
                    if catalog.tool(service_id.as_str(), tool_id.as_str()).is_none() {
                        unresolved.push(format!("{} names tool {}/{}", owner, service_id, tool_id));
                    }
                }
            }
        }
        unresolved
    }
}

/// Source of consistent snapshots for resolver queries
pub trait SnapshotSource {
    fn snapshot(&self) -> EntitlementResult<Snapshot>;
}

/// Thread-safe in-memory store
pub struct InMemoryStore {
    catalog: Catalog,
    resolver: EntitlementResolver,
    state: RwLock<Snapshot>,
    requests: RwLock<Vec<UsageRequest>>,
}

impl SnapshotSource for InMemoryStore {
    fn snapshot(&self) -> EntitlementResult<Snapshot> {
        let state = self
            .state
            .read()
            .map_err(|_| EntitlementError::StorePoisoned)?;
        Ok(state.clone())
    }
}

impl InMemoryStore {
    pub fn new(catalog: Catalog, resolver: EntitlementResolver, seed: Snapshot) -> Self {
        Self {
            catalog,
            resolver,
            state: RwLock::new(seed),
            requests: RwLock::new(Vec::new()),
        }
    }

    /// Replace the usage request queue (seed data)
    pub fn with_requests(self, requests: Vec<UsageRequest>) -> Self {
        Self {
            requests: RwLock::new(requests),
            ..self
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn resolver(&self) -> &EntitlementResolver {
        &self.resolver
    }

    fn write<T>(
        &self,
        op: impl FnOnce(&mut Snapshot) -> EntitlementResult<T>,
    ) -> EntitlementResult<T> {
        let mut state = self
            .state
            .write()
            .map_err(|_| EntitlementError::StorePoisoned)?;
        op(&mut *state)
    }

    fn require_service(&self, service_id: &str) -> EntitlementResult<()> {
        match self.catalog.service(service_id) {
            Some(_) => Ok(()),
            None => Err(EntitlementError::NotFound(format!("service {}", service_id))),
        }
    }

    fn require_tool(&self, service_id: &str, tool_id: &str) -> EntitlementResult<()> {
        self.require_service(service_id)?;
        match self.catalog.tool(service_id, tool_id) {
            Some(_) => Ok(()),
            None => Err(EntitlementError::NotFound(format!(
                "tool {} in service {}",
                tool_id, service_id
            ))),
        }
    }

    // =========================================================================
    // User ↔ Role
    // =========================================================================

    /// Give a user a role; returns false if the user already had it
    pub fn assign_role(&self, user_id: &str, role_id: &str) -> EntitlementResult<bool> {
        self.write(|state| {
            if state.role(role_id).is_none() {
                return Err(EntitlementError::NotFound(format!("role {}", role_id)));
            }
            let user = find_user(state, user_id)?;
            let added = user.roles.insert(role_id.into());
            if added {
                tracing::info!(user_id, role_id, "Assigned role to user");
            }
            Ok(added)
        })
    }

    /// Take a role from a user; returns false if the user did not have it
    pub fn revoke_role(&self, user_id: &str, role_id: &str) -> EntitlementResult<bool> {
        self.write(|state| {
            let user = find_user(state, user_id)?;
            let removed = user.roles.remove(role_id);
            if removed {
                tracing::info!(user_id, role_id, "Revoked role from user");
            }
            Ok(removed)
        })
    }

    // =========================================================================
    // Role permissions and service allow-list
    // =========================================================================

    /// Replace a role's permission set; unknown permission ids are rejected
    pub fn set_role_permissions(
        &self,
        role_id: &str,
        permissions: BTreeSet<PermissionId>,
    ) -> EntitlementResult<()> {
        if let Some(unknown) = permissions.iter().find(|p| !p.is_known()) {
            return Err(EntitlementError::InvalidInput(format!(
                "unknown permission: {}",
                unknown
            )));
        }
        self.write(|state| {
            let role = find_role(state, role_id)?;
            role.permissions = permissions;
            tracing::info!(role_id, count = role.permissions.len(), "Updated role permissions");
            Ok(())
        })
    }

    /// Add a service to a role's allow-list
    ///
    /// Refused while the service is locked by the organization's plan.
    pub fn allow_service(&self, role_id: &str, service_id: &str) -> EntitlementResult<bool> {
        self.require_service(service_id)?;
        self.write(|state| {
            if !self.resolver.is_service_usable(&state.org_plan, service_id) {
                return Err(EntitlementError::PlanLocked {
                    subject: format!("service {}", service_id),
                    required: self.resolver.required_plan_for_service(service_id).to_string(),
                    current: state.org_plan.current_plan.to_string(),
                });
            }
            let role = find_role(state, role_id)?;
            // An unrestricted empty list already admits the service
            if self.resolver.role_reaches_all_services(role) {
                return Ok(false);
            }
            let added = role.allowed_services.allow(ServiceId::from(service_id));
            if added {
                tracing::info!(role_id, service_id, "Allowed service for role");
            }
            Ok(added)
        })
    }

    /// Remove a service from a role's allow-list
    ///
    /// A list that reaches every service cannot be narrowed one service at a
    /// time. When empty lists are unrestricted, removing the last listed
    /// service is refused since it would widen the role to every service.
    pub fn disallow_service(&self, role_id: &str, service_id: &str) -> EntitlementResult<bool> {
        let unrestricted_when_empty =
            self.resolver.config().empty_allow_list == EmptyAllowListMode::Unrestricted;
        self.write(|state| {
            let role = find_role(state, role_id)?;
            if self.resolver.role_reaches_all_services(role) {
                return Err(EntitlementError::InvalidInput(format!(
                    "role {} allows all services",
                    role_id
                )));
            }
            if let ServiceAllowList::Only(ids) = &role.allowed_services {
                if unrestricted_when_empty && ids.len() == 1 && ids.contains(service_id) {
                    return Err(EntitlementError::InvalidInput(format!(
                        "removing {} would leave role {} unrestricted",
                        service_id, role_id
                    )));
                }
            }
            let removed = role.allowed_services.disallow(service_id);
            if removed {
                tracing::info!(role_id, service_id, "Disallowed service for role");
            }
            Ok(removed)
        })
    }

    // =========================================================================
    // Profile ↔ Role, Profile ↔ Tool
    // =========================================================================

    pub fn apply_profile(&self, profile_id: &str, role_id: &str) -> EntitlementResult<bool> {
        self.write(|state| {
            if state.role(role_id).is_none() {
                return Err(EntitlementError::NotFound(format!("role {}", role_id)));
            }
            let profile = find_profile(state, profile_id)?;
            let added = profile.applied_roles.insert(role_id.into());
            if added {
                tracing::info!(profile_id, role_id, "Applied profile to role");
            }
            Ok(added)
        })
    }

    pub fn unapply_profile(&self, profile_id: &str, role_id: &str) -> EntitlementResult<bool> {
        self.write(|state| {
            let profile = find_profile(state, profile_id)?;
            let removed = profile.applied_roles.remove(role_id);
            if removed {
                tracing::info!(profile_id, role_id, "Removed profile from role");
            }
            Ok(removed)
        })
    }

    /// Add a tool to a profile's allow-list
    ///
    /// Refused while the tool is locked by the organization's plan.
    pub fn grant_tool(
        &self,
        profile_id: &str,
        service_id: &str,
        tool_id: &str,
    ) -> EntitlementResult<bool> {
        self.require_tool(service_id, tool_id)?;
        self.write(|state| {
            if !self
                .resolver
                .is_tool_usable(&state.org_plan, service_id, tool_id)
            {
                return Err(EntitlementError::PlanLocked {
                    subject: format!("tool {}/{}", service_id, tool_id),
                    required: self
                        .resolver
                        .required_plan_for_tool(service_id, tool_id)
                        .to_string(),
                    current: state.org_plan.current_plan.to_string(),
                });
            }
            let profile = find_profile(state, profile_id)?;
            let added = profile
                .module_permissions
                .entry(ServiceId::from(service_id))
                .or_default()
                .insert(ToolId::from(tool_id));
            if added {
                tracing::info!(profile_id, service_id, tool_id, "Granted tool on profile");
            }
            Ok(added)
        })
    }

    pub fn revoke_tool(
        &self,
        profile_id: &str,
        service_id: &str,
        tool_id: &str,
    ) -> EntitlementResult<bool> {
        self.write(|state| {
            let profile = find_profile(state, profile_id)?;
            let Some(tools) = profile.module_permissions.get_mut(service_id) else {
                return Ok(false);
            };
            let removed = tools.remove(tool_id);
            if tools.is_empty() {
                profile.module_permissions.remove(service_id);
            }
            if removed {
                tracing::info!(profile_id, service_id, tool_id, "Revoked tool on profile");
            }
            Ok(removed)
        })
    }

    // =========================================================================
    // Organization plan
    // =========================================================================

    /// Move the organization to `target`, returning what the move locks
    ///
    /// Role and profile grants are left untouched; the resolver's plan gate
    /// hides whatever the new tier no longer unlocks.
    pub fn change_plan(&self, target: PlanTier) -> EntitlementResult<PlanChangeImpact> {
        self.write(|state| {
            let impact = preview_plan_change(&self.resolver, &self.catalog.services, state, target);
            state.org_plan = state.org_plan.with_tier(target);
            tracing::info!(
                from = %impact.from,
                to = %impact.to,
                locked_services = impact.locked_services.len(),
                locked_tool_grants = impact.locked_tool_grants.len(),
                seats_over_limit = impact.seats_over_limit,
                "Changed organization plan"
            );
            Ok(impact)
        })
    }

    // =========================================================================
    // User tool preferences
    // =========================================================================

    /// Switch a tool on for a user
    ///
    /// Refused while the tool is locked by the organization's plan.
    pub fn enable_tool(
        &self,
        user_id: &str,
        service_id: &str,
        tool_id: &str,
    ) -> EntitlementResult<bool> {
        self.require_tool(service_id, tool_id)?;
        self.write(|state| {
            if !self
                .resolver
                .is_tool_usable(&state.org_plan, service_id, tool_id)
            {
                return Err(EntitlementError::PlanLocked {
                    subject: format!("tool {}/{}", service_id, tool_id),
                    required: self
                        .resolver
                        .required_plan_for_tool(service_id, tool_id)
                        .to_string(),
                    current: state.org_plan.current_plan.to_string(),
                });
            }
            let preference = find_preference(state, user_id)?;
            let added = preference.enable(ServiceId::from(service_id), ToolId::from(tool_id));
            if added {
                tracing::info!(user_id, service_id, tool_id, "Enabled tool for user");
            }
            Ok(added)
        })
    }

    pub fn disable_tool(
        &self,
        user_id: &str,
        service_id: &str,
        tool_id: &str,
    ) -> EntitlementResult<bool> {
        self.write(|state| {
            let preference = find_preference(state, user_id)?;
            let removed = preference.disable(service_id, tool_id);
            if removed {
                tracing::info!(user_id, service_id, tool_id, "Disabled tool for user");
            }
            Ok(removed)
        })
    }

    /// Replace a user's enabled tools for a service with every tool the plan
    /// unlocks, in catalog order
    pub fn enable_all_unlocked(
        &self,
        user_id: &str,
        service_id: &str,
    ) -> EntitlementResult<Vec<ToolId>> {
        self.require_service(service_id)?;
        self.write(|state| {
            let unlocked: Vec<ToolId> = self
                .catalog
                .tools_for(service_id)
                .iter()
                .filter(|tool| {
                    self.resolver
                        .is_tool_usable(&state.org_plan, service_id, tool.id.as_str())
                })
                .map(|tool| tool.id.clone())
                .collect();
            let preference = find_preference(state, user_id)?;
            if unlocked.is_empty() {
                preference.enabled_tools.remove(service_id);
            } else {
                preference
                    .enabled_tools
                    .insert(ServiceId::from(service_id), unlocked.iter().cloned().collect());
            }
            tracing::info!(
                user_id,
                service_id,
                count = unlocked.len(),
                "Enabled all unlocked tools for user"
            );
            Ok(unlocked)
        })
    }

    // =========================================================================
    // Usage requests
    // =========================================================================

    /// File a pending request from a known user for a catalog service or tool
    pub fn submit_request(
        &self,
        user_id: &str,
        service_id: &str,
        tool_id: Option<&str>,
        reason: &str,
    ) -> EntitlementResult<UsageRequest> {
        match tool_id {
            Some(tool_id) => self.require_tool(service_id, tool_id)?,
            None => self.require_service(service_id)?,
        }
        if self.snapshot()?.user(user_id).is_none() {
            return Err(EntitlementError::NotFound(format!("user {}", user_id)));
        }

        let request = UsageRequest::new(
            UserId::from(user_id),
            ServiceId::from(service_id),
            tool_id.map(ToolId::from),
            reason,
            OffsetDateTime::now_utc(),
        )?;

        let mut requests = self
            .requests
            .write()
            .map_err(|_| EntitlementError::StorePoisoned)?;
        requests.push(request.clone());
        tracing::info!(
            request_id = %request.id,
            user_id,
            service_id,
            tool_id = tool_id.unwrap_or("-"),
            "Submitted usage request"
        );
        Ok(request)
    }

    pub fn approve_request(&self, request_id: Uuid, reviewer: &str) -> EntitlementResult<UsageRequest> {
        self.review(request_id, |request| {
            request.approve(UserId::from(reviewer), OffsetDateTime::now_utc())
        })
    }

    pub fn reject_request(
        &self,
        request_id: Uuid,
        reviewer: &str,
        reason: &str,
    ) -> EntitlementResult<UsageRequest> {
        self.review(request_id, |request| {
            request.reject(UserId::from(reviewer), reason, OffsetDateTime::now_utc())
        })
    }

    fn review(
        &self,
        request_id: Uuid,
        op: impl FnOnce(&mut UsageRequest) -> EntitlementResult<()>,
    ) -> EntitlementResult<UsageRequest> {
        let mut requests = self
            .requests
            .write()
            .map_err(|_| EntitlementError::StorePoisoned)?;
        let request = requests
            .iter_mut()
            .find(|r| r.id == request_id)
            .ok_or_else(|| EntitlementError::NotFound(format!("usage request {}", request_id)))?;
        op(request)?;
        tracing::info!(request_id = %request.id, status = %request.status, "Reviewed usage request");
        Ok(request.clone())
    }

    /// Requests in submission order, optionally filtered by status
    pub fn list_requests(&self, status: Option<RequestStatus>) -> EntitlementResult<Vec<UsageRequest>> {
        let requests = self
            .requests
            .read()
            .map_err(|_| EntitlementError::StorePoisoned)?;
        Ok(requests
            .iter()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect())
    }
}

fn find_user<'a>(state: &'a mut Snapshot, user_id: &str) -> EntitlementResult<&'a mut User> {
    state
        .users
        .iter_mut()
        .find(|u| u.id.as_str() == user_id)
        .ok_or_else(|| EntitlementError::NotFound(format!("user {}", user_id)))
}

/// Preference record for a known user, created on first write
fn find_preference<'a>(
    state: &'a mut Snapshot,
    user_id: &str,
) -> EntitlementResult<&'a mut UserToolPreference> {
    if state.user(user_id).is_none() {
        return Err(EntitlementError::NotFound(format!("user {}", user_id)));
    }
    let index = match state
        .preferences
        .iter()
        .position(|p| p.user_id.as_str() == user_id)
    {
        Some(index) => index,
        None => {
            state
                .preferences
                .push(UserToolPreference::new(UserId::from(user_id)));
            state.preferences.len() - 1
        }
    };
    Ok(&mut state.preferences[index])
}

fn find_role<'a>(state: &'a mut Snapshot, role_id: &str) -> EntitlementResult<&'a mut Role> {
    state
        .roles
        .iter_mut()
        .find(|r| r.id.as_str() == role_id)
        .ok_or_else(|| EntitlementError::NotFound(format!("role {}", role_id)))
}

fn find_profile<'a>(
    state: &'a mut Snapshot,
    profile_id: &str,
) -> EntitlementResult<&'a mut Profile> {
    state
        .profiles
        .iter_mut()
        .find(|p| p.id.as_str() == profile_id)
        .ok_or_else(|| EntitlementError::NotFound(format!("profile {}", profile_id)))
}
