//! CLI commands

use anyhow::{Context as _, Result, bail};
use clap::Subcommand;
use portal_core::navigation::{self, NavItem};
use portal_core::{FileStore, Role};
use portal_http::ApiClient;
use portal_http::client::requests::{DEFAULT_LIMIT, DEFAULT_PAGE};
use portal_session::guard::{RoleRedirect, UNAUTHORIZED_PATH, post_login_destination};
use portal_session::{GuardDecision, LoginForm, RoleGate, Session, SessionStore, evaluate};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::PortalConfig;
use crate::state_dir::StateDir;

/// Page that lists pending upgrade requests
const REQUESTS_PAGE: &str = "/admin/requests";

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and store the session
    Login {
        /// Account email (defaults to the remembered one)
        email: Option<String>,

        /// Account password
        #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
        password: String,

        /// Remember the email for the next login
        #[arg(long)]
        remember: bool,
    },

    /// Sign out and forget the stored tokens
    Logout,

    /// Show the signed-in user and their permissions
    Whoami,

    /// Show the dashboard the signed-in user lands on
    Home,

    /// Check whether the signed-in user may open a dashboard path
    Check {
        /// Dashboard path, e.g. /admin/users
        path: String,
    },

    /// Show the navigation menu for the signed-in user
    Menu {
        /// Only show items whose label or description matches
        #[arg(long)]
        search: Option<String>,

        /// Toggle an item id in the favorites
        #[arg(long, value_name = "ITEM_ID")]
        favorite: Option<String>,
    },

    /// List role upgrade requests awaiting review (admins only)
    Requests {
        #[arg(long, default_value_t = DEFAULT_PAGE)]
        page: u32,

        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: u32,
    },

    /// Show this device's client id
    ClientId {
        /// Generate a new client id
        #[arg(long)]
        reset: bool,
    },
}

impl Commands {
    pub async fn execute(self, config: &PortalConfig, state_dir: &StateDir) -> Result<()> {
        let store = open_session(config, state_dir)?;
        let listener = store.listen_for_auth_events();

        let result = match self {
            Self::Login {
                email,
                password,
                remember,
            } => login(&store, email, password, remember).await,
            Self::Logout => logout(&store).await,
            Self::Whoami => whoami(&store).await,
            Self::Home => home(&store).await,
            Self::Check { path } => check(&store, &path).await,
            Self::Menu { search, favorite } => menu(&store, search, favorite).await,
            Self::Requests { page, limit } => requests(&store, page, limit).await,
            Self::ClientId { reset } => client_id(&store, reset),
        };

        listener.abort();
        result
    }
}

fn open_session(config: &PortalConfig, state_dir: &StateDir) -> Result<Arc<SessionStore>> {
    let session_file = state_dir.session_file();
    debug!("Using session file {}", session_file.display());
    let storage = FileStore::open(&session_file)
        .with_context(|| format!("Failed to open session file {}", session_file.display()))?;

    let client = ApiClient::builder()
        .config(&config.api)
        .storage(Arc::new(storage))
        .build()?;

    Ok(Arc::new(SessionStore::new(client)))
}

/// Bootstrap and require a signed-in user
async fn signed_in(store: &SessionStore) -> Result<Session> {
    let session = store.bootstrap().await;
    if !session.is_authenticated {
        bail!("Not signed in. Run `portal login` first.");
    }
    Ok(session)
}

async fn login(
    store: &SessionStore,
    email: Option<String>,
    password: String,
    remember: bool,
) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => store
            .preferences()
            .remembered_email()?
            .context("No email given and none remembered")?,
    };

    let form = LoginForm {
        email,
        password,
        remember_me: remember,
    };
    let user = match store.login(&form).await {
        Ok(user) => user,
        Err(e) => bail!("{}", e.user_message()),
    };

    let session = store.session();
    let destination = match evaluate(&session, post_login_destination(None)) {
        GuardDecision::Redirect(redirect) => redirect.to,
        _ => post_login_destination(None).to_string(),
    };

    println!("Signed in as {} ({})", user.email, user.role);
    println!("Continue at {destination}");
    Ok(())
}

async fn logout(store: &SessionStore) -> Result<()> {
    store.logout().await;
    println!("Signed out");
    Ok(())
}

async fn whoami(store: &SessionStore) -> Result<()> {
    let session = signed_in(store).await?;
    let Some(user) = &session.user else {
        bail!("Session has no user");
    };

    println!("ID:       {}", user.id);
    println!("Email:    {}", user.email);
    if !user.username.is_empty() {
        println!("Username: {}", user.username);
    }
    if !user.phone.is_empty() {
        println!("Phone:    {}", user.phone);
    }
    println!("Role:     {}", user.role);

    let permissions = session.access().permissions();
    if permissions.is_empty() {
        println!("Permissions: none");
    } else {
        println!("Permissions:");
        for permission in permissions {
            println!("  - {permission}");
        }
    }
    Ok(())
}

async fn home(store: &SessionStore) -> Result<()> {
    let session = store.bootstrap().await;
    // Bootstrap has resolved the session, so the redirect fires here
    let destination = RoleRedirect::new()
        .poll(&session)
        .unwrap_or(UNAUTHORIZED_PATH);
    println!("{destination}");
    Ok(())
}

async fn check(store: &SessionStore, path: &str) -> Result<()> {
    let session = store.bootstrap().await;

    match evaluate(&session, path) {
        GuardDecision::Allow => {
            println!("allowed: {path}");
            if let Some(role) = session.role() {
                print_breadcrumbs(role, path);
                store.preferences().record_visit(path)?;
            }
        }
        GuardDecision::Redirect(redirect) => {
            match redirect.from {
                Some(from) => println!("redirect: {} (return to {from})", redirect.to),
                None => println!("redirect: {}", redirect.to),
            }
        }
        GuardDecision::Pending => println!("pending: session still loading"),
    }
    Ok(())
}

fn print_breadcrumbs(role: Role, path: &str) {
    let trail: Vec<String> = navigation::breadcrumbs(role, path)
        .into_iter()
        .map(|crumb| crumb.label)
        .collect();
    if navigation::is_home(role, path) {
        println!("Home");
    } else {
        println!("{}", trail.join(" > "));
    }
}

async fn menu(store: &SessionStore, search: Option<String>, favorite: Option<String>) -> Result<()> {
    let session = signed_in(store).await?;
    let role = session.role().unwrap_or(Role::Unknown);
    let items = navigation::menu_for(role);
    let preferences = store.preferences();

    if let Some(id) = favorite {
        if navigation::find_by_id(items, &id).is_none() {
            bail!("No menu item '{id}' for role {role}");
        }
        let favorites = preferences.toggle_favorite(&id)?;
        info!(item = %id, "Toggled favorite");
        println!("Favorites: {}", favorites.join(", "));
        return Ok(());
    }

    let favorites = preferences.favorites()?;
    match search {
        Some(term) => {
            for item in navigation::search(role, &term) {
                print_item(item, 0, &favorites);
            }
        }
        None => {
            for item in items {
                print_tree(item, 0, &favorites);
            }
            let recent = preferences.recent()?;
            if !recent.is_empty() {
                println!();
                println!("Recent:");
                for path in recent {
                    println!("  {path}");
                }
            }
        }
    }
    Ok(())
}

fn print_tree(item: &NavItem, depth: usize, favorites: &[String]) {
    print_item(item, depth, favorites);
    for child in item.children {
        print_tree(child, depth + 1, favorites);
    }
}

fn print_item(item: &NavItem, depth: usize, favorites: &[String]) {
    let star = if favorites.iter().any(|id| id == item.id) {
        "*"
    } else {
        " "
    };
    let badge = item.badge.map(|n| format!(" [{n}]")).unwrap_or_default();
    println!(
        "{star} {indent}{label}{badge}  {path}",
        indent = "  ".repeat(depth),
        label = item.label,
        path = item.path,
    );
}

async fn requests(store: &SessionStore, page: u32, limit: u32) -> Result<()> {
    let session = store.bootstrap().await;
    if let GuardDecision::Redirect(redirect) =
        RoleGate::new([Role::Admin]).check(&session, REQUESTS_PAGE)
    {
        bail!("Access denied, redirected to {}", redirect.to);
    }

    let requests = store
        .client()
        .list_pending_upgrade_requests(page, limit)
        .await?;
    if requests.is_empty() {
        println!("No pending requests");
        return Ok(());
    }

    for request in requests {
        let franchise = request
            .franchise_name
            .as_deref()
            .map(|name| format!(" \"{name}\""))
            .unwrap_or_default();
        println!(
            "{}  {:<28} {:<10}{}  {}",
            request.id,
            request.email,
            format!("{:?}", request.role).to_lowercase(),
            franchise,
            request.created_at,
        );
    }
    Ok(())
}

fn client_id(store: &SessionStore, reset: bool) -> Result<()> {
    let identity = store.client().identity();
    if reset {
        identity.clear_client_id()?;
        info!("Client id reset");
    }
    let id = identity.get_client_id()?;
    println!("{id}");
    if let Some(info) = identity.client_info() {
        println!("Device:  {} / {} / {}", info.device_type, info.browser, info.os);
        println!("Created: {}", info.created_at.to_rfc3339());
    }
    println!("Agent:   {}", identity.current_device_info().user_agent);
    Ok(())
}
