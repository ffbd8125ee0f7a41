//! Service catalog and plan requirement tables
//!
//! Static reference data: services, their tools, and the minimum plan tier
//! each service or tool requires. Loaded once at startup from JSON or built
//! from the seed data in [`crate::sample`].

use mcpist_shared::{PlanTier, Service, ServiceId, Tool, ToolId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::{EntitlementError, EntitlementResult};

/// Minimum plan tiers configured for services and individual tools
///
/// Only explicit entries live here. Defaulting and the service/tool `max`
/// composition happen in the resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRequirements {
    #[serde(default)]
    pub services: BTreeMap<ServiceId, PlanTier>,
    #[serde(default)]
    pub tools: BTreeMap<ServiceId, BTreeMap<ToolId, PlanTier>>,
}

impl PlanRequirements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service(mut self, service_id: impl Into<ServiceId>, tier: PlanTier) -> Self {
        self.services.insert(service_id.into(), tier);
        self
    }

    pub fn with_tool(
        mut self,
        service_id: impl Into<ServiceId>,
        tool_id: impl Into<ToolId>,
        tier: PlanTier,
    ) -> Self {
        self.tools
            .entry(service_id.into())
            .or_default()
            .insert(tool_id.into(), tier);
        self
    }

    /// Configured service requirement, if any
    pub fn service(&self, service_id: &str) -> Option<PlanTier> {
        self.services.get(service_id).copied()
    }

    /// Configured tool requirement, if any
    pub fn tool(&self, service_id: &str, tool_id: &str) -> Option<PlanTier> {
        self.tools
            .get(service_id)
            .and_then(|tools| tools.get(tool_id))
            .copied()
    }
}

/// Service catalog with tools and plan requirements
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub services: Vec<Service>,
    /// Tools keyed by owning service, in catalog order
    #[serde(default)]
    pub tools: BTreeMap<ServiceId, Vec<Tool>>,
    #[serde(default)]
    pub requirements: PlanRequirements,
}

impl Catalog {
    /// Parse and validate a catalog document
    pub fn from_json(json: &str) -> EntitlementResult<Self> {
        let catalog: Catalog = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Read, parse and validate a catalog file
    pub fn load(path: impl AsRef<Path>) -> EntitlementResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&json)?;
        tracing::info!(
            path = %path.display(),
            services = catalog.services.len(),
            "Loaded service catalog"
        );
        Ok(catalog)
    }

    /// Check structural integrity
    ///
    /// Duplicate ids and references to unknown services are errors.
    /// Tool requirements naming unknown tools are kept and logged.
    pub fn validate(&self) -> EntitlementResult<()> {
        let mut service_ids = BTreeSet::new();
        for service in &self.services {
            if !service_ids.insert(service.id.as_str()) {
                return Err(EntitlementError::InvalidCatalog(format!(
                    "duplicate service id: {}",
                    service.id
                )));
            }
        }

        for (service_id, tools) in &self.tools {
            if !service_ids.contains(service_id.as_str()) {
                return Err(EntitlementError::InvalidCatalog(format!(
                    "tools listed for unknown service: {}",
                    service_id
                )));
            }
            let mut tool_ids = BTreeSet::new();
            for tool in tools {
                if !tool_ids.insert(tool.id.as_str()) {
                    return Err(EntitlementError::InvalidCatalog(format!(
                        "duplicate tool id {} in service {}",
                        tool.id, service_id
                    )));
                }
            }
        }

        for service_id in self.requirements.services.keys() {
            if !service_ids.contains(service_id.as_str()) {
                return Err(EntitlementError::InvalidCatalog(format!(
                    "plan requirement for unknown service: {}",
                    service_id
                )));
            }
        }

        for (service_id, tools) in &self.requirements.tools {
            if !service_ids.contains(service_id.as_str()) {
                return Err(EntitlementError::InvalidCatalog(format!(
                    "tool plan requirement for unknown service: {}",
                    service_id
                )));
            }
            for tool_id in tools.keys() {
                if self.tool(service_id.as_str(), tool_id.as_str()).is_none() {
                    tracing::warn!(
                        service_id = %service_id,
                        tool_id = %tool_id,
                        "Plan requirement references a tool missing from the catalog"
                    );
                }
            }
        }

        Ok(())
    }

    pub fn service(&self, service_id: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.id.as_str() == service_id)
    }

    /// Tools of a service in catalog order (empty for unknown services)
    pub fn tools_for(&self, service_id: &str) -> &[Tool] {
        self.tools
            .get(service_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn tool(&self, service_id: &str, tool_id: &str) -> Option<&Tool> {
        self.tools_for(service_id)
            .iter()
            .find(|t| t.id.as_str() == tool_id)
    }
}
