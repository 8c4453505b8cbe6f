use crate::types::{Role, User};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Capabilities granted to dashboard roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    // Admin
    ViewAllUsers,
    ManageUsers,
    ViewAllSellers,
    ManageSellers,
    ViewAllFranchises,
    ManageFranchises,
    ViewSystemSettings,
    ManageSystemSettings,
    ViewAllReports,
    ViewRevenue,
    ManageProducts,
    ManageOrders,
    // Seller
    ViewOwnProducts,
    ManageOwnProducts,
    ViewOwnOrders,
    ManageOwnOrders,
    ViewOwnRevenue,
    ViewOwnReports,
    ManageInventory,
    ViewCustomerInfo,
    // Franchise
    ViewFranchiseData,
    ManageFranchiseStores,
    ViewFranchiseEmployees,
    ManageFranchiseEmployees,
    ViewFranchiseRevenue,
    ViewFranchiseReports,
    ManageFranchiseInventory,
    ViewBranchPerformance,
    // User
    ViewOwnProfile,
    EditOwnProfile,
    ViewProducts,
    CreateOrders,
}

impl Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // serde's snake_case name doubles as the display form
        let name = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_default();
        f.write_str(&name)
    }
}

const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::ViewAllUsers,
    Permission::ManageUsers,
    Permission::ViewAllSellers,
    Permission::ManageSellers,
    Permission::ViewAllFranchises,
    Permission::ManageFranchises,
    Permission::ViewSystemSettings,
    Permission::ManageSystemSettings,
    Permission::ViewAllReports,
    Permission::ViewRevenue,
    Permission::ManageProducts,
    Permission::ManageOrders,
];

const SELLER_PERMISSIONS: &[Permission] = &[
    Permission::ViewOwnProducts,
    Permission::ManageOwnProducts,
    Permission::ViewOwnOrders,
    Permission::ManageOwnOrders,
    Permission::ViewOwnRevenue,
    Permission::ViewOwnReports,
    Permission::ManageInventory,
    Permission::ViewCustomerInfo,
];

const FRANCHISE_PERMISSIONS: &[Permission] = &[
    Permission::ViewFranchiseData,
    Permission::ManageFranchiseStores,
    Permission::ViewFranchiseEmployees,
    Permission::ManageFranchiseEmployees,
    Permission::ViewFranchiseRevenue,
    Permission::ViewFranchiseReports,
    Permission::ManageFranchiseInventory,
    Permission::ViewBranchPerformance,
];

const USER_PERMISSIONS: &[Permission] = &[
    Permission::ViewOwnProfile,
    Permission::EditOwnProfile,
    Permission::ViewProducts,
    Permission::CreateOrders,
    Permission::ViewOwnOrders,
];

/// Permission table, one arm per role
pub const fn permissions_for(role: Role) -> &'static [Permission] {
    match role {
        Role::Admin => ADMIN_PERMISSIONS,
        Role::Seller => SELLER_PERMISSIONS,
        Role::Franchise => FRANCHISE_PERMISSIONS,
        Role::User => USER_PERMISSIONS,
        Role::Unknown => &[],
    }
}

/// Permission checks for the (possibly absent) current user
///
/// Without a user every check answers `false`.
#[derive(Debug, Clone, Copy)]
pub struct Access<'a> {
    user: Option<&'a User>,
}

impl<'a> Access<'a> {
    pub const fn new(user: Option<&'a User>) -> Self {
        Self { user }
    }

    pub fn role(&self) -> Option<Role> {
        self.user.map(|u| u.role)
    }

    pub fn permissions(&self) -> &'static [Permission] {
        match self.role() {
            Some(role) => permissions_for(role),
            None => &[],
        }
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }

    pub fn has_any_permission(&self, permissions: &[Permission]) -> bool {
        let granted = self.permissions();
        permissions.iter().any(|p| granted.contains(p))
    }

    /// An empty request is satisfied only when a user is present
    pub fn has_all_permissions(&self, permissions: &[Permission]) -> bool {
        self.user.is_some() && permissions.iter().all(|p| self.permissions().contains(p))
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role() == Some(role)
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        self.role().is_some_and(|r| roles.contains(&r))
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    pub fn is_seller(&self) -> bool {
        self.has_role(Role::Seller)
    }

    pub fn is_franchise(&self) -> bool {
        self.has_role(Role::Franchise)
    }
}
