use std::collections::HashMap;
use std::path::Path;

use fantoccini::cookies::Cookie;
use nr_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Cookie as exported by browser devtools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Unix seconds; absent or negative for session cookies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

impl SessionCookie {
    /// WebDriver cookie. Expiry is left unset: the browser only lives for
    /// one upload.
    pub fn to_webdriver(&self) -> Cookie<'static> {
        let mut cookie = Cookie::new(self.name.clone(), self.value.clone());
        if let Some(domain) = &self.domain {
            cookie.set_domain(domain.clone());
        }
        if let Some(path) = &self.path {
            cookie.set_path(path.clone());
        }
        if let Some(secure) = self.secure {
            cookie.set_secure(secure);
        }
        if let Some(http_only) = self.http_only {
            cookie.set_http_only(http_only);
        }
        cookie
    }

    pub fn from_webdriver(cookie: &Cookie<'_>) -> Self {
        Self {
            name: cookie.name().to_string(),
            value: cookie.value().to_string(),
            domain: cookie.domain().map(str::to_string),
            path: cookie.path().map(str::to_string),
            expires: cookie
                .expires()
                .and_then(|e| e.datetime())
                .map(|t| t.unix_timestamp() as f64),
            http_only: cookie.http_only(),
            secure: cookie.secure(),
            same_site: cookie.same_site().map(|s| s.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub cookies: Vec<SessionCookie>,
    #[serde(rename = "localStorageData", default)]
    pub local_storage_data: HashMap<String, String>,
}

impl SessionData {
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::Session(format!("Session file not found: {} ({})", path.display(), e)))?;
        let session: SessionData = serde_json::from_str(&raw)?;
        if session.cookies.is_empty() {
            return Err(Error::Session(format!("No cookies found in {}", path.display())));
        }
        info!("🍪 Loaded {} cookies from {}", session.cookies.len(), path.display());
        Ok(session)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, serde_json::to_vec(self)?).await?;
        info!("💾 Saved {} cookies to {}", self.cookies.len(), path.display());
        Ok(())
    }
}
