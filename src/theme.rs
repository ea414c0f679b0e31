//! Tenant branding with a version-keyed cache.
//!
//! Resolution order: a fresh cache entry, then the version endpoint (extending the entry
//! when the version is unchanged, fetching the full theme otherwise), then a stale entry,
//! then [`DEFAULT_THEME`].

use chrono::{DateTime, TimeDelta, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::shipment::ShipmentClient;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeVersion {
    pub version: u64,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branding {
    pub name: String,
    pub tagline: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub favicon_url: Option<String>,
    #[serde(default)]
    pub hero_image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    pub primary_color: String,
    #[serde(default)]
    pub secondary_color: Option<String>,
    pub success_color: String,
    pub warning_color: String,
    pub danger_color: String,
    #[serde(default)]
    pub info_color: Option<String>,
    pub font_family: String,
    #[serde(default)]
    pub font_url: Option<String>,
    #[serde(default)]
    pub border_radius: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeCopy {
    pub login_header: String,
    pub login_subtitle: String,
    pub signup_header: String,
    pub signup_subtitle: String,
    pub support_text: String,
    pub support_subtext: String,
    pub support_button: String,
    #[serde(default)]
    pub hero_title: Option<String>,
    #[serde(default)]
    pub hero_subtitle: Option<String>,
    #[serde(default)]
    pub cta_button: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeLinks {
    pub terms_url: String,
    pub privacy_url: String,
    pub support_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeFeatures {
    pub show_support_section: bool,
    pub enable_remember_me: bool,
    pub show_wallet_balance: bool,
}

/// `GET /theme-config/` payload
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ThemeConfigData {
    pub branding: Branding,
    pub theme: Palette,
    pub content: ThemeCopy,
    pub links: ThemeLinks,
    pub features: ThemeFeatures,
    pub version: u64,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Theme as the front end consumes it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeConfig {
    pub branding: Branding,
    pub theme: Palette,
    pub copy: ThemeCopy,
    pub links: ThemeLinks,
    pub features: ThemeFeatures,
}

impl From<ThemeConfigData> for ThemeConfig {
    fn from(data: ThemeConfigData) -> Self {
        let mut theme = data.theme;
        if theme.border_radius.as_deref().is_none_or(str::is_empty) {
            theme.border_radius = Some("lg".to_string());
        }

        Self {
            branding: data.branding,
            theme,
            copy: data.content,
            links: data.links,
            features: data.features,
        }
    }
}

pub static DEFAULT_THEME: Lazy<ThemeConfig> = Lazy::new(|| ThemeConfig {
    branding: Branding {
        name: "OhShip".to_string(),
        tagline: "Shipping Made Simple".to_string(),
        logo_url: None,
        favicon_url: None,
        hero_image_url: Some(
            "https://images.unsplash.com/photo-1578575437980-04aa37127db6?w=800&h=450&fit=crop"
                .to_string(),
        ),
    },
    theme: Palette {
        primary_color: "#6366f1".to_string(),
        secondary_color: Some("#8b5cf6".to_string()),
        success_color: "#22c55e".to_string(),
        warning_color: "#f59e0b".to_string(),
        danger_color: "#ef4444".to_string(),
        info_color: Some("#3b82f6".to_string()),
        font_family: "Inter".to_string(),
        font_url: None,
        border_radius: Some("lg".to_string()),
    },
    copy: ThemeCopy {
        login_header: "Welcome back".to_string(),
        login_subtitle: "Sign in to access your shipping portal".to_string(),
        signup_header: "Create your account".to_string(),
        signup_subtitle: "Start shipping smarter today".to_string(),
        support_text: "Need help?".to_string(),
        support_subtext: "Contact our support team".to_string(),
        support_button: "Get Support".to_string(),
        hero_title: Some("Ship Smarter, Not Harder".to_string()),
        hero_subtitle: Some(
            "Compare quotes from top carriers and book your shipment in minutes".to_string(),
        ),
        cta_button: Some("Get Started".to_string()),
    },
    links: ThemeLinks {
        terms_url: "/terms".to_string(),
        privacy_url: "/privacy".to_string(),
        support_url: "mailto:support@ohship.com".to_string(),
    },
    features: ThemeFeatures {
        show_support_section: true,
        enable_remember_me: true,
        show_wallet_balance: true,
    },
});

#[derive(Debug, Clone)]
struct CachedTheme {
    theme: ThemeConfig,
    version: u64,
    expires_at: DateTime<Utc>,
}

pub struct ThemeService {
    cache: Mutex<Option<CachedTheme>>,
    ttl: TimeDelta,
}

impl ThemeService {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Mutex::new(None),
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::minutes(30)),
        }
    }

    pub fn cached_version(&self) -> Option<u64> {
        self.snapshot().map(|cached| cached.version)
    }

    pub async fn resolve(&self, client: &ShipmentClient) -> ThemeConfig {
        self.resolve_at(client, Utc::now()).await
    }

    /// Never fails; the worst case is the built-in default.
    pub async fn resolve_at(&self, client: &ShipmentClient, now: DateTime<Utc>) -> ThemeConfig {
        let cached = self.snapshot();

        if let Some(entry) = cached.as_ref().filter(|entry| entry.expires_at > now) {
            debug!(version = entry.version, "theme cache hit");
            return entry.theme.clone();
        }

        match client.get_theme_version().await {
            Ok(current) => {
                if let Some(entry) = cached.as_ref().filter(|entry| entry.version == current.version) {
                    debug!(version = current.version, "theme version unchanged, extending cache");
                    self.store(entry.theme.clone(), current.version, now);
                    return entry.theme.clone();
                }

                match client.get_theme_config().await {
                    Ok(data) => {
                        let version = data.version;
                        let theme = ThemeConfig::from(data);
                        info!(version, "theme refreshed");
                        self.store(theme.clone(), version, now);
                        return theme;
                    }
                    Err(err) => warn!(error = %err, "failed to fetch theme"),
                }
            }
            Err(err) => warn!(error = %err, "failed to fetch theme version"),
        }

        match cached {
            Some(entry) => {
                warn!(version = entry.version, "theme API unavailable, using stale cache");
                entry.theme
            }
            None => {
                warn!("theme API unavailable and nothing cached, using default theme");
                DEFAULT_THEME.clone()
            }
        }
    }

    fn snapshot(&self) -> Option<CachedTheme> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store(&self, theme: ThemeConfig, version: u64, now: DateTime<Utc>) {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        *cache = Some(CachedTheme {
            theme,
            version,
            expires_at: now + self.ttl,
        });
    }
}
