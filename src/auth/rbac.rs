/*!
 * # Role-Based Access Control (RBAC) Module
 *
 * Maps each back-office role to the permissions it unlocks. `admin` is
 * granted everything via the `*` wildcard.
 */

use super::permissions::consts::*;
use crate::entities::UserRole;
use lazy_static::lazy_static;
use std::collections::HashMap;

/// Role definition with associated permissions
#[derive(Debug, Clone)]
pub struct Role {
    pub name: UserRole,
    pub description: &'static str,
    pub permissions: Vec<&'static str>,
}

/// Grants every permission.
pub const WILDCARD: &str = "*";

lazy_static! {
    pub static ref ROLES: HashMap<UserRole, Role> = {
        let mut roles = HashMap::new();

        roles.insert(
            UserRole::Admin,
            Role {
                name: UserRole::Admin,
                description: "Administrator with full access",
                permissions: vec![WILDCARD],
            },
        );

        roles.insert(
            UserRole::InputSuratJalan,
            Role {
                name: UserRole::InputSuratJalan,
                description: "Issues delivery notes and records their realization",
                permissions: vec![
                    DASHBOARD_READ,
                    DELIVERY_NOTES_READ,
                    DELIVERY_NOTES_WRITE,
                    // Needed to pick truck, driver, route and material
                    MASTER_DATA_READ,
                ],
            },
        );

        roles.insert(
            UserRole::InputKas,
            Role {
                name: UserRole::InputKas,
                description: "Keeps the cash ledger",
                permissions: vec![DASHBOARD_READ, CASH_READ, CASH_WRITE],
            },
        );

        roles.insert(
            UserRole::InputInvoice,
            Role {
                name: UserRole::InputInvoice,
                description: "Attaches invoices to delivered notes",
                permissions: vec![
                    DASHBOARD_READ,
                    DELIVERY_NOTES_READ,
                    INVOICES_READ,
                    INVOICES_WRITE,
                ],
            },
        );

        roles.insert(
            UserRole::Reader,
            Role {
                name: UserRole::Reader,
                description: "Read-only access to reports",
                permissions: vec![
                    DASHBOARD_READ,
                    DELIVERY_NOTES_READ,
                    INVOICES_READ,
                    REPORTS_READ,
                    REPORTS_EXPORT,
                ],
            },
        );

        roles
    };
}

/// Whether `role` carries `permission`, directly or through the wildcard.
pub fn role_has_permission(role: UserRole, permission: &str) -> bool {
    ROLES
        .get(&role)
        .map(|r| {
            r.permissions
                .iter()
                .any(|p| *p == WILDCARD || *p == permission)
        })
        .unwrap_or(false)
}

/// Explicit permission list for a role, as put into access tokens.
pub fn permissions_for(role: UserRole) -> Vec<String> {
    ROLES
        .get(&role)
        .map(|r| r.permissions.iter().map(|p| p.to_string()).collect())
        .unwrap_or_default()
}
