//! Route guards
//!
//! Guards decide what to do with a navigation given the current [`Session`]:
//! wait while the session is loading, let the user through, or send them
//! somewhere else.

use crate::store::Session;
use portal_core::Role;
use portal_core::navigation::dashboard_path;

pub const LOGIN_PATH: &str = "/login";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";
pub const ROOT_PATH: &str = "/";

/// Where to send the user instead, and where they were headed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub to: String,
    pub from: Option<String>,
}

impl Redirect {
    pub fn to(path: impl Into<String>) -> Self {
        Self {
            to: path.into(),
            from: None,
        }
    }

    #[must_use]
    pub fn from(mut self, location: impl Into<String>) -> Self {
        self.from = Some(location.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session still loading; show a pending indicator and decide later
    Pending,
    Allow,
    Redirect(Redirect),
}

impl GuardDecision {
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            Self::Redirect(redirect) => Some(&redirect.to),
            _ => None,
        }
    }
}

/// Authentication gate
///
/// Unauthenticated users go to the login page, which can send them back to
/// `location` afterwards.
pub fn require_auth(session: &Session, location: &str) -> GuardDecision {
    if session.is_loading {
        return GuardDecision::Pending;
    }
    if !session.is_authenticated {
        return GuardDecision::Redirect(Redirect::to(LOGIN_PATH).from(location));
    }
    GuardDecision::Allow
}

/// Role gate; an empty allow-list admits any signed-in user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGate {
    allowed: Vec<Role>,
    redirect_to: String,
}

impl RoleGate {
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            allowed: roles.into_iter().collect(),
            redirect_to: UNAUTHORIZED_PATH.to_string(),
        }
    }

    pub fn any() -> Self {
        Self {
            allowed: Vec::new(),
            redirect_to: UNAUTHORIZED_PATH.to_string(),
        }
    }

    /// Where users without an allowed role are sent
    #[must_use]
    pub fn redirect_to(mut self, path: impl Into<String>) -> Self {
        self.redirect_to = path.into();
        self
    }

    pub fn allowed_roles(&self) -> &[Role] {
        &self.allowed
    }

    pub fn allows(&self, role: Role) -> bool {
        self.allowed.is_empty() || self.allowed.contains(&role)
    }

    /// Runs the authentication gate first, then compares roles
    pub fn check(&self, session: &Session, location: &str) -> GuardDecision {
        match require_auth(session, location) {
            GuardDecision::Allow => {}
            decision => return decision,
        }
        match session.role() {
            Some(role) if self.allows(role) => GuardDecision::Allow,
            Some(_) => GuardDecision::Redirect(Redirect::to(&self.redirect_to)),
            None => GuardDecision::Redirect(Redirect::to(LOGIN_PATH)),
        }
    }
}

/// Default landing page for the session, once it has loaded
pub fn home_destination(session: &Session) -> Option<&'static str> {
    if session.is_loading {
        return None;
    }
    let destination = match (session.is_authenticated, session.role()) {
        (true, Some(role)) => dashboard_path(role).unwrap_or(UNAUTHORIZED_PATH),
        _ => LOGIN_PATH,
    };
    Some(destination)
}

/// Root-path redirect that fires once after loading completes
#[derive(Debug, Default)]
pub struct RoleRedirect {
    fired: bool,
}

impl RoleRedirect {
    pub const fn new() -> Self {
        Self { fired: false }
    }

    pub const fn has_fired(&self) -> bool {
        self.fired
    }

    /// Call on every session change; yields the target exactly once
    pub fn poll(&mut self, session: &Session) -> Option<&'static str> {
        if self.fired {
            return None;
        }
        let destination = home_destination(session)?;
        self.fired = true;
        Some(destination)
    }
}

/// Where to go after a successful login
pub fn post_login_destination(from: Option<&str>) -> &str {
    match from {
        Some(path) if !path.is_empty() && path != LOGIN_PATH => path,
        _ => ROOT_PATH,
    }
}

/// How a dashboard path is protected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteAccess {
    Public,
    /// The root path, which redirects by role
    RoleHome,
    Protected(RoleGate),
}

const ROLE_SECTIONS: [(&str, Role); 4] = [
    ("/admin", Role::Admin),
    ("/seller", Role::Seller),
    ("/franchise", Role::Franchise),
    ("/user", Role::User),
];

fn in_section(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Dashboard route table
pub fn route_access(path: &str) -> RouteAccess {
    if path == LOGIN_PATH || path == UNAUTHORIZED_PATH {
        return RouteAccess::Public;
    }
    if path == ROOT_PATH || path.is_empty() {
        return RouteAccess::RoleHome;
    }
    ROLE_SECTIONS
        .iter()
        .find(|(prefix, _)| in_section(path, prefix))
        .map_or_else(
            || RouteAccess::Protected(RoleGate::any()),
            |(_, role)| RouteAccess::Protected(RoleGate::new([*role])),
        )
}

/// Decide a navigation to `path` against the route table
pub fn evaluate(session: &Session, path: &str) -> GuardDecision {
    match route_access(path) {
        RouteAccess::Public => GuardDecision::Allow,
        RouteAccess::RoleHome => home_destination(session).map_or(GuardDecision::Pending, |to| {
            GuardDecision::Redirect(Redirect::to(to))
        }),
        RouteAccess::Protected(gate) => gate.check(session, path),
    }
}
