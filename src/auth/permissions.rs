/*!
 * # Permissions Module
 *
 * Permission strings are `area:action`. Each back-office area gets a read
 * permission and, where it can be changed, a write permission.
 */

/// Permission actions
pub struct Actions;

impl Actions {
    pub const READ: &'static str = "read";
    pub const WRITE: &'static str = "write";
    pub const DELETE: &'static str = "delete";
    pub const EXPORT: &'static str = "export";
    pub const MANAGE: &'static str = "manage";
}

/// Back-office areas
pub struct Resources;

impl Resources {
    pub const DASHBOARD: &'static str = "dashboard";
    pub const DELIVERY_NOTES: &'static str = "delivery_notes";
    pub const INVOICES: &'static str = "invoices";
    pub const CASH: &'static str = "cash";
    pub const REPORTS: &'static str = "reports";
    pub const MASTER_DATA: &'static str = "master_data";
    pub const USERS: &'static str = "users";
}

/// Common permission string constants for compile-time safety
pub mod consts {
    pub const DASHBOARD_READ: &str = "dashboard:read";

    pub const DELIVERY_NOTES_READ: &str = "delivery_notes:read";
    pub const DELIVERY_NOTES_WRITE: &str = "delivery_notes:write";
    pub const DELIVERY_NOTES_DELETE: &str = "delivery_notes:delete";

    pub const INVOICES_READ: &str = "invoices:read";
    pub const INVOICES_WRITE: &str = "invoices:write";

    pub const CASH_READ: &str = "cash:read";
    pub const CASH_WRITE: &str = "cash:write";

    pub const REPORTS_READ: &str = "reports:read";
    pub const REPORTS_EXPORT: &str = "reports:export";

    pub const MASTER_DATA_READ: &str = "master_data:read";
    pub const MASTER_DATA_WRITE: &str = "master_data:write";

    pub const USERS_MANAGE: &str = "users:manage";
}

/// Builds a permission string from a resource and an action.
pub fn permission(resource: &str, action: &str) -> String {
    format!("{}:{}", resource, action)
}
