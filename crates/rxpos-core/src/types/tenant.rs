//! Tenants, users and roles.
//!
//! ## Tenant Lifecycle
//! ```text
//!   register            approve              suspend
//!  ─────────► PENDING ───────────► ACTIVE ◄──────────► SUSPENDED
//!                │                   │       approve       │
//!                └───────────────────┴──────────┬──────────┘
//!                                               ▼
//!                                          CANCELLED (terminal)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

// =============================================================================
// Tenant Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TenantStatus {
    /// Registered, waiting for a super-admin to approve.
    Pending,
    /// Approved; staff can use the pharmacy dashboard.
    Active,
    /// Blocked by a super-admin; can be re-approved.
    Suspended,
    /// Closed for good. No operation currently leads here.
    Cancelled,
}

impl TenantStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TenantStatus::Pending => "PENDING",
            TenantStatus::Active => "ACTIVE",
            TenantStatus::Suspended => "SUSPENDED",
            TenantStatus::Cancelled => "CANCELLED",
        }
    }

    /// Whether an admin action may move a tenant from `self` to `next`.
    ///
    /// ## Rules
    /// - PENDING → ACTIVE (approve)
    /// - ACTIVE ⇄ SUSPENDED
    /// - any non-terminal → CANCELLED
    /// - CANCELLED is terminal
    pub fn can_transition_to(&self, next: TenantStatus) -> bool {
        use TenantStatus::*;
        matches!(
            (self, next),
            (Pending, Active)
                | (Active, Suspended)
                | (Suspended, Active)
                | (Pending, Cancelled)
                | (Active, Cancelled)
                | (Suspended, Cancelled)
        )
    }
}

impl fmt::Display for TenantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Subscription Plan
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionPlan {
    /// Plan assigned at self-registration.
    #[default]
    Free,
    Basic,
    Professional,
    Enterprise,
}

impl SubscriptionPlan {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SubscriptionPlan::Free => "FREE",
            SubscriptionPlan::Basic => "BASIC",
            SubscriptionPlan::Professional => "PROFESSIONAL",
            SubscriptionPlan::Enterprise => "ENTERPRISE",
        }
    }
}

impl fmt::Display for SubscriptionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Tenant
// =============================================================================

/// A pharmacy account: the unit of data isolation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub status: TenantStatus,
    pub plan: SubscriptionPlan,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    /// Staff of this tenant may operate the dashboard.
    #[inline]
    pub fn is_operational(&self) -> bool {
        self.status == TenantStatus::Active
    }
}

// =============================================================================
// User Role
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// Platform operator. Has no tenant of its own.
    SuperAdmin,
    PharmacyOwner,
    PharmacyManager,
    PharmacyEmployee,
    Cashier,
}

impl UserRole {
    pub const fn as_str(&self) -> &'static str {
        match self {
            UserRole::SuperAdmin => "SUPER_ADMIN",
            UserRole::PharmacyOwner => "PHARMACY_OWNER",
            UserRole::PharmacyManager => "PHARMACY_MANAGER",
            UserRole::PharmacyEmployee => "PHARMACY_EMPLOYEE",
            UserRole::Cashier => "CASHIER",
        }
    }

    /// Roles that work inside a single pharmacy.
    #[inline]
    pub const fn is_pharmacy_role(&self) -> bool {
        !matches!(self, UserRole::SuperAdmin)
    }

    /// Roles allowed to create staff accounts for their tenant.
    #[inline]
    pub const fn can_manage_staff(&self) -> bool {
        matches!(self, UserRole::PharmacyOwner | UserRole::PharmacyManager)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// User
// =============================================================================

/// A login account.
///
/// `tenant_id` is `None` only for super-admins.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: String,
    pub tenant_id: Option<String>,
    pub username: String,
    pub email: Option<String>,
    pub name: String,
    /// Argon2 PHC string. Never serialized.
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub password_hash: String,
    pub role: UserRole,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_lifecycle() {
        use TenantStatus::*;
        assert!(Pending.can_transition_to(Active));
        assert!(Active.can_transition_to(Suspended));
        assert!(Suspended.can_transition_to(Active));

        assert!(!Pending.can_transition_to(Suspended));
        assert!(!Active.can_transition_to(Active));
        assert!(!Cancelled.can_transition_to(Active));
        assert!(!Cancelled.can_transition_to(Suspended));
    }

    #[test]
    fn test_role_classification() {
        assert!(!UserRole::SuperAdmin.is_pharmacy_role());
        assert!(UserRole::Cashier.is_pharmacy_role());
        assert!(UserRole::PharmacyOwner.can_manage_staff());
        assert!(UserRole::PharmacyManager.can_manage_staff());
        assert!(!UserRole::PharmacyEmployee.can_manage_staff());
    }

    #[test]
    fn test_enum_wire_format() {
        assert_eq!(
            serde_json::to_string(&UserRole::PharmacyOwner).unwrap(),
            "\"PHARMACY_OWNER\""
        );
        let status: TenantStatus = serde_json::from_str("\"SUSPENDED\"").unwrap();
        assert_eq!(status, TenantStatus::Suspended);
        assert_eq!(SubscriptionPlan::default(), SubscriptionPlan::Free);
    }
}
