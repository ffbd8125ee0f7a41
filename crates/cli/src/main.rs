//! Entitlement inspection tool for the MCPist admin console
//!
//! Evaluates the sample organization against a service catalog and prints
//! what its users can reach.
//!
//! The organization is always the built-in sample. A custom catalog that
//! lacks services or tools the sample names is still accepted; each missing
//! reference is logged as a warning and treated as absent.
//!
//! ## Usage
//! ```bash
//! mcpist-entitlements services
//! mcpist-entitlements check 2 github create-issue
//! mcpist-entitlements grants 4
//! mcpist-entitlements tools 2
//! mcpist-entitlements preview free
//! ```
//!
//! ## Environment Variables
//! - MCPIST_CATALOG_PATH: catalog JSON file (built-in sample when unset)
//! - MCPIST_EMPTY_ALLOWLIST: `deny` (default) or `unrestricted`
//! - MCPIST_UNMAPPED_PLAN: `fail_open` (default) or `fail_closed`
//! - MCPIST_LOG_JSON: `true` for JSON log lines
//! - RUST_LOG: log filter (default: info)

use anyhow::{bail, Context};
use std::env;

use mcpist_entitlement::{
    effective_permissions, preview_plan_change, sample, Catalog, EntitlementError,
    EntitlementResolver, GrantDecision, ResolverConfig, Snapshot,
};
use mcpist_shared::{McpistError, PlanTier, User};

const USAGE: &str = "Usage: mcpist-entitlements <services | check <user> <service> <tool> | grants <user> | tools <user> | preview <tier>>";

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first() else {
        bail!(USAGE);
    };

    let config = ResolverConfig::from_env()
        .map_err(|err| McpistError::from(EntitlementError::from(err)))?;
    let catalog = match env::var_os("MCPIST_CATALOG_PATH") {
        Some(path) => Catalog::load(&path)
            .map_err(McpistError::from)
            .with_context(|| format!("loading catalog {}", path.to_string_lossy()))?,
        None => sample::catalog(),
    };
    let resolver = EntitlementResolver::from_catalog(&catalog, config);
    let snapshot = sample::snapshot();
    for reference in snapshot.unresolved_references(&catalog) {
        tracing::warn!(reference = %reference, "Sample organization references an id missing from the catalog");
    }
    tracing::debug!(?config, services = catalog.services.len(), "Resolver ready");

    match (command.as_str(), &args[1..]) {
        ("services", []) => print_services(&resolver, &catalog, &snapshot),
        ("check", [user, service, tool]) => {
            let decision = snapshot.explain_tool_grant(&resolver, user, service, tool);
            println!("{}/{} for user {}: {}", service, tool, user, decision);
            if !decision.is_granted() {
                std::process::exit(1);
            }
        }
        ("grants", [user]) => {
            let user = find_user(&snapshot, user)?;
            print_grants(&resolver, &catalog, &snapshot, user);
        }
        ("tools", [user]) => {
            let user = find_user(&snapshot, user)?;
            print_enabled_tools(&resolver, &catalog, &snapshot, user);
        }
        ("preview", [tier]) => {
            let target: PlanTier = tier.parse().map_err(McpistError::Validation)?;
            print_preview(&resolver, &catalog, &snapshot, target);
        }
        _ => bail!(USAGE),
    }

    Ok(())
}

fn find_user<'a>(snapshot: &'a Snapshot, user_id: &str) -> Result<&'a User, McpistError> {
    snapshot
        .user(user_id)
        .ok_or_else(|| McpistError::NotFound(format!("user {}", user_id)))
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = env::var("MCPIST_LOG_JSON")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    // Logs go to stderr so stdout stays clean for the report
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_services(resolver: &EntitlementResolver, catalog: &Catalog, snapshot: &Snapshot) {
    let org = &snapshot.org_plan;
    let partition = resolver.list_usable_services_for_org(org, &catalog.services);
    println!(
        "Organization plan: {} ({} of {} services available)\n",
        org.current_plan.display_name(),
        partition.available.len(),
        catalog.services.len()
    );

    for (tier, services) in resolver.group_services_by_plan(&catalog.services) {
        if services.is_empty() {
            continue;
        }
        println!("{} plan", tier.display_name());
        for service in services {
            let tools = catalog.tools_for(service.id.as_str());
            let unlocked = resolver.unlocked_tool_count(org, service.id.as_str(), tools);
            let marker = if resolver.is_service_usable(org, service.id.as_str()) {
                " "
            } else {
                "x"
            };
            println!(
                "  [{}] {:<16} {}/{} tools",
                marker,
                service.id.as_str(),
                unlocked,
                tools.len()
            );
        }
    }
}

fn print_grants(
    resolver: &EntitlementResolver,
    catalog: &Catalog,
    snapshot: &Snapshot,
    user: &User,
) {
    println!("{} <{}>", user.name, user.email);

    let permissions = effective_permissions(user, &snapshot.roles);
    let permissions: Vec<&str> = permissions.iter().map(|p| p.as_str()).collect();
    println!("Permissions: {}", permissions.join(", "));

    for service in &catalog.services {
        let tools = resolver.granted_tools(
            user,
            &snapshot.roles,
            &snapshot.profiles,
            &snapshot.org_plan,
            service.id.as_str(),
            catalog.tools_for(service.id.as_str()),
        );
        if tools.is_empty() {
            continue;
        }
        let names: Vec<&str> = tools.iter().map(|t| t.id.as_str()).collect();
        println!("  {:<16} {}", service.id.as_str(), names.join(", "));
    }

    // Tools the user would hold except for the plan
    for service in &catalog.services {
        for tool in catalog.tools_for(service.id.as_str()) {
            let decision = resolver.explain_tool_grant(
                user,
                &snapshot.roles,
                &snapshot.profiles,
                &snapshot.org_plan,
                service.id.as_str(),
                tool.id.as_str(),
            );
            if let GrantDecision::PlanLocked { required, .. } = decision {
                let mut with_plan = snapshot.clone();
                with_plan.org_plan = snapshot.org_plan.with_tier(required);
                if with_plan
                    .explain_tool_grant(resolver, user.id.as_str(), service.id.as_str(), tool.id.as_str())
                    .is_granted()
                {
                    println!("  locked: {}/{} ({})", service.id, tool.id, decision);
                }
            }
        }
    }
}

fn print_enabled_tools(
    resolver: &EntitlementResolver,
    catalog: &Catalog,
    snapshot: &Snapshot,
    user: &User,
) {
    let Some(preference) = snapshot.preference(user.id.as_str()) else {
        println!("{} has not enabled any tools", user.name);
        return;
    };
    println!("{} <{}>", user.name, user.email);
    for service in &catalog.services {
        let tools = resolver.enabled_tools(
            user,
            &snapshot.roles,
            &snapshot.profiles,
            &snapshot.org_plan,
            Some(preference),
            service.id.as_str(),
            catalog.tools_for(service.id.as_str()),
        );
        if tools.is_empty() {
            continue;
        }
        let names: Vec<&str> = tools.iter().map(|t| t.id.as_str()).collect();
        println!("  {:<16} {}", service.id.as_str(), names.join(", "));
    }
}

fn print_preview(
    resolver: &EntitlementResolver,
    catalog: &Catalog,
    snapshot: &Snapshot,
    target: PlanTier,
) {
    let impact = preview_plan_change(resolver, &catalog.services, snapshot, target);
    println!(
        "{} -> {} ({:?})",
        impact.from.display_name(),
        impact.to.display_name(),
        impact.direction
    );
    if impact.is_lossless() {
        println!("Nothing becomes locked.");
        return;
    }

    for service_id in &impact.locked_services {
        println!("  service locked: {}", service_id);
    }
    for grant in &impact.locked_tool_grants {
        println!(
            "  profile {} loses {}/{} (requires {})",
            grant.profile_id, grant.service_id, grant.tool_id, grant.required
        );
    }
    for allowance in &impact.locked_role_services {
        println!(
            "  role {} loses {} (requires {})",
            allowance.role_id, allowance.service_id, allowance.required
        );
    }
    if impact.seats_over_limit > 0 {
        println!(
            "  {} users over the {}-seat limit",
            impact.seats_over_limit, impact.user_limit
        );
    }
}
