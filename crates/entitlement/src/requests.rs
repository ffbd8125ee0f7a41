//! Usage requests
//!
//! Users ask administrators for access to a service, or to one tool of a
//! service. A request starts `pending` and is reviewed exactly once.
//! Approval records the decision only; granting the access itself is a
//! separate administrative write on roles or profiles.

use mcpist_shared::{ServiceId, ToolId, UserId};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{EntitlementError, EntitlementResult};

/// Review status of a usage request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestStatus::Pending => write!(f, "pending"),
            RequestStatus::Approved => write!(f, "approved"),
            RequestStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// Request for access to a service or a single tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRequest {
    pub id: Uuid,
    pub user_id: UserId,
    pub service_id: ServiceId,
    /// None when the whole service is requested
    pub tool_id: Option<ToolId>,
    pub reason: String,
    pub status: RequestStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub requested_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub reviewed_at: Option<OffsetDateTime>,
    pub reviewed_by: Option<UserId>,
    pub rejection_reason: Option<String>,
}

impl UsageRequest {
    /// New pending request; the reason must not be blank
    pub fn new(
        user_id: UserId,
        service_id: ServiceId,
        tool_id: Option<ToolId>,
        reason: &str,
        requested_at: OffsetDateTime,
    ) -> EntitlementResult<Self> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(EntitlementError::InvalidInput(
                "usage request reason is required".to_string(),
            ));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            service_id,
            tool_id,
            reason: reason.to_string(),
            status: RequestStatus::Pending,
            requested_at,
            reviewed_at: None,
            reviewed_by: None,
            rejection_reason: None,
        })
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }

    pub fn approve(&mut self, reviewer: UserId, at: OffsetDateTime) -> EntitlementResult<()> {
        self.ensure_pending()?;
        self.status = RequestStatus::Approved;
        self.reviewed_at = Some(at);
        self.reviewed_by = Some(reviewer);
        Ok(())
    }

    /// Reject with a mandatory, non-blank reason
    pub fn reject(
        &mut self,
        reviewer: UserId,
        reason: &str,
        at: OffsetDateTime,
    ) -> EntitlementResult<()> {
        self.ensure_pending()?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(EntitlementError::InvalidInput(
                "rejection reason is required".to_string(),
            ));
        }
        self.status = RequestStatus::Rejected;
        self.reviewed_at = Some(at);
        self.reviewed_by = Some(reviewer);
        self.rejection_reason = Some(reason.to_string());
        Ok(())
    }

    fn ensure_pending(&self) -> EntitlementResult<()> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(EntitlementError::AlreadyReviewed {
                id: self.id.to_string(),
                status: self.status,
            })
        }
    }
}
