//! Per-device client identity
//!
//! Every auth call carries a `clientId` that binds issued tokens to the
//! device. The id is generated once, persisted, and then reused until the
//! storage is cleared.

use crate::errors::CoreResult;
use crate::storage::{KeyValueStore, keys, lock};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

static TABLET_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)tablet|ipad|playbook|silk").expect("valid tablet pattern"));

static MOBILE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)mobile|iphone|ipod|android|blackberry|opera|mini|windows\sce|palm|smartphone|iemobile",
    )
    .expect("valid mobile pattern")
});

static CLIENT_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(desktop|mobile|tablet)-[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$",
    )
    .expect("valid client id pattern")
});

/// Coarse device class derived from the user agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceType {
    Desktop,
    Mobile,
    Tablet,
}

impl DeviceType {
    /// Detect the device class; tablets win over mobiles
    pub fn detect(user_agent: &str) -> Self {
        if TABLET_PATTERN.is_match(user_agent) {
            Self::Tablet
        } else if MOBILE_PATTERN.is_match(user_agent) {
            Self::Mobile
        } else {
            Self::Desktop
        }
    }

    /// Lowercase form used as the client id prefix
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
        }
    }
}

impl Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn detect_browser(user_agent: &str) -> &'static str {
    // Order matters: Chrome agents also mention Safari, Edge mentions Chrome.
    const BROWSERS: &[(&[&str], &str)] = &[
        (&["Firefox"], "Firefox"),
        (&["Opera", "OPR"], "Opera"),
        (&["Trident"], "Internet Explorer"),
        (&["Edge"], "Edge"),
        (&["Chrome"], "Chrome"),
        (&["Safari"], "Safari"),
    ];

    BROWSERS
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| user_agent.contains(n)))
        .map_or("Unknown", |(_, name)| *name)
}

fn detect_os(user_agent: &str) -> &'static str {
    const SYSTEMS: &[(&[&str], &str)] = &[
        (&["Windows NT 10.0"], "Windows 10"),
        (&["Windows NT 6.3"], "Windows 8.1"),
        (&["Windows NT 6.2"], "Windows 8"),
        (&["Windows NT 6.1"], "Windows 7"),
        (&["Mac OS X"], "Mac OS X"),
        (&["Android"], "Android"),
        (&["iOS", "iPhone", "iPad"], "iOS"),
        (&["Linux"], "Linux"),
    ];

    SYSTEMS
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| user_agent.contains(n)))
        .map_or("Unknown", |(_, name)| *name)
}

/// Device description derived from a user agent, without persisting anything
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub device_type: DeviceType,
    pub browser: String,
    pub os: String,
    pub user_agent: String,
}

impl DeviceInfo {
    pub fn from_user_agent(user_agent: &str) -> Self {
        Self {
            device_type: DeviceType::detect(user_agent),
            browser: detect_browser(user_agent).to_string(),
            os: detect_os(user_agent).to_string(),
            user_agent: user_agent.to_string(),
        }
    }
}

/// Persisted identity record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientIdentity {
    pub client_id: String,
    pub device_type: DeviceType,
    pub browser: String,
    pub os: String,
    pub created_at: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
}

impl ClientIdentity {
    /// Mint a fresh identity for the given device
    pub fn generate(device: &DeviceInfo) -> Self {
        let now = Utc::now();
        Self {
            client_id: format!("{}-{}", device.device_type.as_str(), Uuid::new_v4()),
            device_type: device.device_type,
            browser: device.browser.clone(),
            os: device.os.clone(),
            created_at: now,
            last_used: now,
        }
    }
}

/// Check the `<deviceType>-<uuid>` shape of a client id
pub fn is_valid_client_id(client_id: &str) -> bool {
    CLIENT_ID_PATTERN.is_match(client_id)
}

/// User agent describing this native client, shaped so the device heuristics
/// classify it sensibly
pub fn native_user_agent() -> String {
    let os = match std::env::consts::OS {
        "windows" => "Windows NT 10.0",
        "macos" => "Mac OS X",
        "ios" => "iPhone; iOS",
        "android" => "Linux; Android",
        "linux" => "X11; Linux",
        other => other,
    };
    format!("portal-client/{} ({os})", env!("CARGO_PKG_VERSION"))
}

/// Reads, creates and refreshes the persisted client identity
#[derive(Clone)]
pub struct ClientIdentityStore {
    store: Arc<dyn KeyValueStore>,
    user_agent: String,
    // Serializes load-or-create across clones
    update: Arc<Mutex<()>>,
}

impl ClientIdentityStore {
    pub fn new(store: Arc<dyn KeyValueStore>, user_agent: impl Into<String>) -> Self {
        Self {
            store,
            user_agent: user_agent.into(),
            update: Arc::new(Mutex::new(())),
        }
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Return the device's client id, creating it on first use
    ///
    /// Every call bumps `last_used` and re-persists the record.
    pub fn get_client_id(&self) -> CoreResult<String> {
        let _guard = lock(&self.update);
        let identity = match self.client_info() {
            Some(mut identity) => {
                identity.last_used = Utc::now();
                identity
            }
            None => {
                let identity =
                    ClientIdentity::generate(&DeviceInfo::from_user_agent(&self.user_agent));
                info!(client_id = %identity.client_id, "Generated new device client id");
                identity
            }
        };

        self.save(&identity)?;
        Ok(identity.client_id)
    }

    /// Load the persisted record; unreadable records count as absent
    pub fn client_info(&self) -> Option<ClientIdentity> {
        let stored = match self.store.get(keys::DEVICE_CLIENT_INFO) {
            Ok(stored) => stored?,
            Err(e) => {
                warn!("Error reading client info: {e}");
                return None;
            }
        };

        match serde_json::from_str(&stored) {
            Ok(identity) => Some(identity),
            Err(e) => {
                warn!("Discarding malformed client info: {e}");
                None
            }
        }
    }

    /// Forget the identity; the next lookup mints a new id
    pub fn clear_client_id(&self) -> CoreResult<()> {
        let _guard = lock(&self.update);
        self.store.remove(keys::DEVICE_CLIENT_ID)?;
        self.store.remove(keys::DEVICE_CLIENT_INFO)?;
        debug!("Cleared device client id");
        Ok(())
    }

    /// Device description for the configured user agent
    pub fn current_device_info(&self) -> DeviceInfo {
        DeviceInfo::from_user_agent(&self.user_agent)
    }

    fn save(&self, identity: &ClientIdentity) -> CoreResult<()> {
        self.store
            .set(keys::DEVICE_CLIENT_INFO, &serde_json::to_string(identity)?)?;
        self.store.set(keys::DEVICE_CLIENT_ID, &identity.client_id)
    }
}
