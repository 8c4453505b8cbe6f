//! Role-scoped dashboard navigation
//!
//! Each role gets a static menu tree. Lookups (current item, breadcrumbs,
//! flattened list for search) all work off these tables.

use crate::types::Role;
use serde::Serialize;

/// One entry of the side menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub id: &'static str,
    pub label: &'static str,
    pub path: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<u32>,
    #[serde(skip_serializing_if = "is_leaf")]
    pub children: &'static [NavItem],
}

impl NavItem {
    const fn leaf(id: &'static str, label: &'static str, path: &'static str) -> Self {
        Self {
            id,
            label,
            path,
            description: None,
            badge: None,
            children: &[],
        }
    }

    const fn described(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    const fn badge(mut self, count: u32) -> Self {
        self.badge = Some(count);
        self
    }

    const fn children(mut self, children: &'static [NavItem]) -> Self {
        self.children = children;
        self
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_leaf(children: &&'static [NavItem]) -> bool {
    children.is_empty()
}

/// Breadcrumb entry; the last crumb (the current page) has no path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breadcrumb {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

const ADMIN_MENU: &[NavItem] = &[
    NavItem::leaf("dashboard", "Dashboard", "/admin/dashboard").described("System overview"),
    NavItem::leaf("users", "User management", "/admin/users")
        .described("Manage users")
        .children(&[
            NavItem::leaf("all-users", "All users", "/admin/users/all"),
            NavItem::leaf("add-user", "Add user", "/admin/users/add"),
        ]),
    NavItem::leaf("sellers", "Seller management", "/admin/sellers").described("Manage sellers"),
    NavItem::leaf("franchises", "Franchise management", "/admin/franchises")
        .described("Manage branches"),
    NavItem::leaf("campaigns", "Campaigns", "/admin/campaigns")
        .described("Manage marketing campaigns")
        .badge(3),
    NavItem::leaf("requests", "Upgrade requests", "/admin/requests")
        .described("Review pending role upgrades"),
    NavItem::leaf("reports", "Reports", "/admin/reports").described("Reports and statistics"),
    NavItem::leaf("settings", "Settings", "/admin/settings").described("System settings"),
];

const SELLER_MENU: &[NavItem] = &[
    NavItem::leaf("dashboard", "Dashboard", "/seller/dashboard").described("Store overview"),
    NavItem::leaf("products", "Products", "/seller/products")
        .described("Manage products")
        .children(&[
            NavItem::leaf("all-products", "All products", "/seller/products/all"),
            NavItem::leaf("add-product", "Add product", "/seller/products/add"),
        ]),
    NavItem::leaf("orders", "Orders", "/seller/orders")
        .described("Manage orders")
        .badge(5),
    NavItem::leaf("campaigns", "Campaigns", "/seller/campaigns").described("Promotions"),
    NavItem::leaf("profile", "Profile", "/seller/profile").described("Personal information"),
];

const FRANCHISE_MENU: &[NavItem] = &[
    NavItem::leaf("dashboard", "Dashboard", "/franchise/dashboard").described("Branch overview"),
    NavItem::leaf("branches", "Branches", "/franchise/branches").described("Manage branches"),
    NavItem::leaf("employees", "Employees", "/franchise/employees").described("Manage staff"),
    NavItem::leaf("inventory", "Inventory", "/franchise/inventory").described("Manage stock"),
    NavItem::leaf("reports", "Reports", "/franchise/reports").described("Branch reports"),
];

const USER_MENU: &[NavItem] = &[
    NavItem::leaf("dashboard", "Dashboard", "/user/dashboard").described("Home"),
    NavItem::leaf("campaigns", "Campaigns", "/user/campaigns").described("Browse campaigns"),
    NavItem::leaf("profile", "Profile", "/user/profile").described("Personal information"),
];

/// Menu tree for a role
///
/// Unrecognised roles get the plain user menu; route guards keep them out of
/// the pages themselves.
pub const fn menu_for(role: Role) -> &'static [NavItem] {
    match role {
        Role::Admin => ADMIN_MENU,
        Role::Seller => SELLER_MENU,
        Role::Franchise => FRANCHISE_MENU,
        Role::User | Role::Unknown => USER_MENU,
    }
}

/// Default landing page for a role, `None` when the role has none
pub const fn dashboard_path(role: Role) -> Option<&'static str> {
    match role {
        Role::Admin => Some("/admin/dashboard"),
        Role::Seller => Some("/seller/dashboard"),
        Role::Franchise => Some("/franchise/dashboard"),
        Role::User => Some("/user/dashboard"),
        Role::Unknown => None,
    }
}

/// Target of the "Home" breadcrumb
pub fn home_path(role: Role) -> &'static str {
    dashboard_path(role).unwrap_or("/user/dashboard")
}

pub fn is_home(role: Role, path: &str) -> bool {
    home_path(role) == path
}

/// Depth-first flattening, parents before their children
pub fn flatten(items: &'static [NavItem]) -> Vec<&'static NavItem> {
    let mut flat = Vec::new();
    for item in items {
        flat.push(item);
        flat.extend(flatten(item.children));
    }
    flat
}

pub fn find_by_path(items: &'static [NavItem], path: &str) -> Option<&'static NavItem> {
    flatten(items).into_iter().find(|item| item.path == path)
}

pub fn find_by_id(items: &'static [NavItem], id: &str) -> Option<&'static NavItem> {
    flatten(items).into_iter().find(|item| item.id == id)
}

fn find_parent(items: &'static [NavItem], id: &str) -> Option<&'static NavItem> {
    for item in items {
        if item.children.iter().any(|child| child.id == id) {
            return Some(item);
        }
        if let Some(found) = find_parent(item.children, id) {
            return Some(found);
        }
    }
    None
}

/// Case-insensitive search over labels and descriptions
pub fn search(role: Role, term: &str) -> Vec<&'static NavItem> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return Vec::new();
    }

    flatten(menu_for(role))
        .into_iter()
        .filter(|item| {
            item.label.to_lowercase().contains(&term)
                || item
                    .description
                    .is_some_and(|d| d.to_lowercase().contains(&term))
        })
        .collect()
}

/// Home → optional parent → current page
pub fn breadcrumbs(role: Role, path: &str) -> Vec<Breadcrumb> {
    let menu = menu_for(role);
    let mut crumbs = vec![Breadcrumb {
        label: "Home".to_string(),
        path: Some(home_path(role).to_string()),
    }];

    if let Some(current) = find_by_path(menu, path) {
        if let Some(parent) = find_parent(menu, current.id) {
            crumbs.push(Breadcrumb {
                label: parent.label.to_string(),
                path: Some(parent.path.to_string()),
            });
        }
        crumbs.push(Breadcrumb {
            label: current.label.to_string(),
            path: None,
        });
    }

    crumbs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_assignable_role_has_a_dashboard_in_its_menu() {
        for role in Role::ASSIGNABLE {
            let home = dashboard_path(role).unwrap();
            assert!(
                find_by_path(menu_for(role), home).is_some(),
                "{role} menu lacks {home}"
            );
        }
    }

    #[test]
    fn test_menu_ids_are_unique_per_role() {
        for role in Role::ASSIGNABLE {
            let ids: Vec<_> = flatten(menu_for(role)).iter().map(|i| i.id).collect();
            let unique: HashSet<_> = ids.iter().collect();
            assert_eq!(ids.len(), unique.len(), "duplicate ids for {role}");
        }
    }

    #[test]
    fn test_menu_paths_stay_inside_role_prefix() {
        for role in Role::ASSIGNABLE {
            let prefix = format!("/{role}/");
            for item in flatten(menu_for(role)) {
                assert!(item.path.starts_with(&prefix), "{} escapes {prefix}", item.path);
            }
        }
    }

    #[test]
    fn test_flatten_keeps_parent_before_children() {
        let flat: Vec<_> = flatten(menu_for(Role::Admin))
            .iter()
            .map(|i| i.id)
            .collect();
        let users = flat.iter().position(|id| *id == "users").unwrap();
        assert_eq!(flat[users + 1], "all-users");
        assert_eq!(flat[users + 2], "add-user");
    }

    #[test]
    fn test_breadcrumbs_for_nested_page() {
        let crumbs = breadcrumbs(Role::Seller, "/seller/products/add");
        let labels: Vec<_> = crumbs.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, ["Home", "Products", "Add product"]);
        assert_eq!(crumbs[0].path.as_deref(), Some("/seller/dashboard"));
        assert_eq!(crumbs[1].path.as_deref(), Some("/seller/products"));
        assert_eq!(crumbs[2].path, None);
    }

    #[test]
    fn test_breadcrumbs_for_unknown_page_is_home_only() {
        let crumbs = breadcrumbs(Role::Admin, "/admin/nowhere");
        assert_eq!(crumbs.len(), 1);
        assert_eq!(crumbs[0].path.as_deref(), Some("/admin/dashboard"));
    }

    #[test]
    fn test_unknown_role_falls_back_to_user_menu() {
        assert_eq!(menu_for(Role::Unknown), menu_for(Role::User));
        assert_eq!(dashboard_path(Role::Unknown), None);
        assert!(is_home(Role::Unknown, "/user/dashboard"));
    }

    #[test]
    fn test_search_matches_label_and_description() {
        let hits: Vec<_> = search(Role::Admin, "MARKETING").iter().map(|i| i.id).collect();
        assert_eq!(hits, ["campaigns"]);
        assert!(search(Role::Admin, "   ").is_empty());
    }
}
