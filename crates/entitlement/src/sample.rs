//! Seed data
//!
//! The admin console's sample organization: twelve services, their tools,
//! five roles, three profiles and five users on the `pro` plan, one of whom
//! has picked the tools they use.

use mcpist_shared::{
    OrganizationPlan, PermissionId, PlanTier, Profile, ProfileId, Role, RoleId, Service,
    ServiceAllowList, ServiceId, Tool, ToolId, ToolParameter, User, UserId, UserToolPreference,
};
use std::collections::{BTreeMap, BTreeSet};
use time::macros::datetime;

use crate::catalog::{Catalog, PlanRequirements};
use crate::requests::{RequestStatus, UsageRequest};
use crate::store::Snapshot;

fn service(id: &str, name: &str, description: &str, category: &str) -> Service {
    Service {
        id: ServiceId::from(id),
        name: name.to_string(),
        description: description.to_string(),
        category: category.to_string(),
    }
}

fn param(name: &str, required: bool, description: &str) -> ToolParameter {
    ToolParameter {
        name: name.to_string(),
        param_type: "string".to_string(),
        required,
        description: description.to_string(),
    }
}

fn tool(id: &str, description: &str, parameters: Vec<ToolParameter>) -> Tool {
    Tool {
        id: ToolId::from(id),
        name: id.replace('-', "_"),
        description: description.to_string(),
        parameters,
    }
}

/// Sample service catalog with plan requirements
pub fn catalog() -> Catalog {
    let services = vec![
        service("google-calendar", "Google Calendar", "Manage and sync calendar events", "productivity"),
        service("notion", "Notion", "Documents and databases", "productivity"),
        service("github", "GitHub", "Repositories and issues", "development"),
        service("slack", "Slack", "Team communication", "communication"),
        service("zaim", "Zaim", "Household budget data and analysis", "finance"),
        service("freee", "freee", "Accounting and expense data", "finance"),
        service("dropbox", "Dropbox", "File storage", "storage"),
        service("google-drive", "Google Drive", "Drive file management", "storage"),
        service("trello", "Trello", "Task boards", "productivity"),
        service("jira", "Jira", "Project management", "development"),
        service("asana", "Asana", "Task management", "productivity"),
        service("moneytree", "Moneytree", "Asset management data", "finance"),
    ];

    let mut tools = BTreeMap::new();
    tools.insert(
        ServiceId::from("google-calendar"),
        vec![
            tool(
                "list-events",
                "List events in a date range",
                vec![
                    param("start_date", true, "Start date (ISO 8601)"),
                    param("end_date", true, "End date (ISO 8601)"),
                    param("calendar_id", false, "Calendar ID (default: primary)"),
                ],
            ),
            tool(
                "create-event",
                "Create a new event",
                vec![
                    param("title", true, "Event title"),
                    param("start_time", true, "Start time (ISO 8601)"),
                    param("end_time", true, "End time (ISO 8601)"),
                    param("description", false, "Event description"),
                ],
            ),
            tool(
                "delete-event",
                "Delete an event",
                vec![param("event_id", true, "Event ID")],
            ),
        ],
    );
    tools.insert(
        ServiceId::from("github"),
        vec![
            tool(
                "list-repos",
                "List the user's repositories",
                vec![
                    param("visibility", false, "public, private, all"),
                    param("sort", false, "created, updated, pushed, full_name"),
                ],
            ),
            tool(
                "create-issue",
                "Create a new issue",
                vec![
                    param("repo", true, "Repository (owner/repo)"),
                    param("title", true, "Issue title"),
                    param("body", false, "Issue body"),
                ],
            ),
        ],
    );
    tools.insert(
        ServiceId::from("slack"),
        vec![tool(
            "send-message",
            "Post a message to a channel",
            vec![
                param("channel", true, "Channel ID or name"),
                param("text", true, "Message text"),
            ],
        )],
    );
    tools.insert(
        ServiceId::from("notion"),
        vec![tool("search-pages", "Search pages", vec![param("query", true, "Search query")])],
    );
    tools.insert(
        ServiceId::from("zaim"),
        vec![tool(
            "get-transactions",
            "Fetch transaction history",
            vec![param("start_date", true, "Start date"), param("end_date", true, "End date")],
        )],
    );
    tools.insert(
        ServiceId::from("freee"),
        vec![tool("get-invoices", "List invoices", vec![param("status", false, "draft, sent, paid")])],
    );
    tools.insert(
        ServiceId::from("dropbox"),
        vec![tool("list-files", "List files in a folder", vec![param("path", true, "Folder path")])],
    );
    tools.insert(
        ServiceId::from("google-drive"),
        vec![tool("list-files", "List files", vec![param("folder_id", false, "Folder ID")])],
    );
    tools.insert(ServiceId::from("trello"), vec![tool("list-boards", "List boards", Vec::new())]);
    tools.insert(
        ServiceId::from("jira"),
        vec![tool("list-issues", "List issues", vec![param("project", true, "Project key")])],
    );
    tools.insert(
        ServiceId::from("asana"),
        vec![tool("list-tasks", "List tasks", vec![param("project_id", true, "Project ID")])],
    );
    tools.insert(ServiceId::from("moneytree"), vec![tool("get-accounts", "List accounts", Vec::new())]);

    let requirements = PlanRequirements::new()
        .with_service("google-calendar", PlanTier::Free)
        .with_service("notion", PlanTier::Free)
        .with_service("github", PlanTier::Free)
        .with_service("google-drive", PlanTier::Free)
        .with_service("slack", PlanTier::Pro)
        .with_service("dropbox", PlanTier::Pro)
        .with_service("trello", PlanTier::Pro)
        .with_service("jira", PlanTier::Pro)
        .with_service("asana", PlanTier::Pro)
        .with_service("zaim", PlanTier::Max)
        .with_service("freee", PlanTier::Max)
        .with_service("moneytree", PlanTier::Max)
        .with_tool("google-calendar", "delete-event", PlanTier::Pro)
        .with_tool("github", "create-issue", PlanTier::Pro);

    Catalog {
        services,
        tools,
        requirements,
    }
}

fn ids<T: From<&'static str> + Ord>(values: &[&'static str]) -> BTreeSet<T> {
    values.iter().map(|v| T::from(*v)).collect()
}

fn role(
    id: &'static str,
    name: &str,
    description: &str,
    permissions: &[&'static str],
    allowed_services: ServiceAllowList,
) -> Role {
    Role {
        id: RoleId::from(id),
        name: name.to_string(),
        description: description.to_string(),
        permissions: ids::<PermissionId>(permissions),
        allowed_services,
    }
}

fn profile(
    id: &'static str,
    name: &str,
    description: &str,
    applied_roles: &[&'static str],
    grants: Vec<(&'static str, Vec<&'static str>)>,
) -> Profile {
    Profile {
        id: ProfileId::from(id),
        name: name.to_string(),
        description: description.to_string(),
        applied_roles: ids::<RoleId>(applied_roles),
        module_permissions: grants
            .into_iter()
            .map(|(service_id, tools)| (ServiceId::from(service_id), ids::<ToolId>(&tools)))
            .collect(),
    }
}

fn user(id: &'static str, name: &str, email: &str, roles: &[&'static str]) -> User {
    User {
        id: UserId::from(id),
        name: name.to_string(),
        email: email.to_string(),
        roles: ids::<RoleId>(roles),
    }
}

/// Sample roles, profiles, users and organization plan
pub fn snapshot() -> Snapshot {
    let roles = vec![
        role(
            "1",
            "Administrator",
            "Access to every feature",
            &["tools.manage", "users.manage", "roles.manage", "logs.view"],
            ServiceAllowList::All,
        ),
        role(
            "2",
            "Developer",
            "Connect and use tools",
            &["tools.use", "tools.connect"],
            ServiceAllowList::only(["github", "notion", "google-calendar"]),
        ),
        role(
            "3",
            "Viewer",
            "Read-only access",
            &["tools.view"],
            ServiceAllowList::only(["google-calendar", "github"]),
        ),
        role(
            "4",
            "Accounting",
            "Access to accounting tools",
            &["tools.use"],
            ServiceAllowList::only(["freee", "zaim"]),
        ),
        role(
            "5",
            "External Partner",
            "Limited access",
            &["tools.view"],
            ServiceAllowList::default(),
        ),
    ];

    let profiles = vec![
        profile(
            "1",
            "Developer Standard",
            "Standard permission set for developers",
            &["2"],
            vec![
                ("github", vec!["list-repos", "create-issue"]),
                ("google-calendar", vec!["list-events", "create-event"]),
                ("notion", vec!["search-pages"]),
            ],
        ),
        profile(
            "2",
            "Read Only",
            "Minimal read-only permission set",
            &["3", "5"],
            vec![
                ("google-calendar", vec!["list-events"]),
                ("github", vec!["list-repos"]),
            ],
        ),
        profile(
            "3",
            "Full Access",
            "Access to every tool",
            &["1"],
            vec![
                ("github", vec!["list-repos", "create-issue"]),
                ("google-calendar", vec!["list-events", "create-event", "delete-event"]),
                ("notion", vec!["search-pages"]),
                ("slack", vec!["send-message"]),
            ],
        ),
    ];

    let users = vec![
        user("1", "Taro Yamada", "yamada@example.com", &["1", "2"]),
        user("2", "Hanako Sato", "sato@example.com", &["2"]),
        user("3", "Ichiro Suzuki", "suzuki@example.com", &["3"]),
        user("4", "Misaki Tanaka", "tanaka@example.com", &["2", "3"]),
        user("5", "Kenta Takahashi", "takahashi@example.com", &["1"]),
    ];

    let mut preference = UserToolPreference::new(UserId::from("2"));
    for (service_id, tool_id) in [
        ("github", "list-repos"),
        ("github", "create-issue"),
        ("google-calendar", "list-events"),
    ] {
        preference.enable(ServiceId::from(service_id), ToolId::from(tool_id));
    }

    Snapshot {
        org_plan: OrganizationPlan::new(PlanTier::Pro, users.len() as u32),
        roles,
        profiles,
        users,
        preferences: vec![preference],
    }
}

/// Sample usage requests: two pending, one approved, one rejected
pub fn usage_requests() -> Vec<UsageRequest> {
    let request = |user_id: &str,
                   service_id: &str,
                   tool_id: Option<&str>,
                   reason: &str,
                   requested_at| UsageRequest {
        id: uuid::Uuid::new_v4(),
        user_id: UserId::from(user_id),
        service_id: ServiceId::from(service_id),
        tool_id: tool_id.map(ToolId::from),
        reason: reason.to_string(),
        status: RequestStatus::Pending,
        requested_at,
        reviewed_at: None,
        reviewed_by: None,
        rejection_reason: None,
    };

    let mut approved = request(
        "2",
        "trello",
        None,
        "Task management integration",
        datetime!(2026-01-13 11:00 UTC),
    );
    approved.status = RequestStatus::Approved;
    approved.reviewed_at = Some(datetime!(2026-01-13 14:00 UTC));
    approved.reviewed_by = Some(UserId::from("1"));

    let mut rejected = request(
        "5",
        "jira",
        None,
        "Project management for the development team",
        datetime!(2026-01-12 10:00 UTC),
    );
    rejected.status = RequestStatus::Rejected;
    rejected.reviewed_at = Some(datetime!(2026-01-12 15:00 UTC));
    rejected.reviewed_by = Some(UserId::from("1"));
    rejected.rejection_reason =
        Some("Jira is currently limited to the development department".to_string());

    vec![
        request(
            "3",
            "dropbox",
            None,
            "Needed to share project material",
            datetime!(2026-01-15 09:00 UTC),
        ),
        request(
            "4",
            "google-calendar",
            Some("delete-event"),
            "Delete permission needed to tidy the team calendar",
            datetime!(2026-01-14 16:30 UTC),
        ),
        approved,
        rejected,
    ]
}
