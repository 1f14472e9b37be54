// Portal HTTP client
//
// Wraps `reqwest::Client` with the portal's versioned URL layout and its
// redirect-based session signalling. Operation bodies live in sibling
// modules (auth, resources) as inherent methods.

use std::sync::{PoisonError, RwLock};

use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::auth::Subdomain;
use crate::error::Error;
use crate::models::SessionInfo;
use crate::transport::TransportConfig;

const SIGNIN_PAGE: &str = "/access/signin.jsp";

/// Raw HTTP client for the portal.
///
/// Every authenticated page lives under `/myhome/<version>/`, where the
/// version is discovered during sign-in. When the session lapses the
/// portal answers any page by redirecting to the sign-in form; that is
/// detected here and surfaced as [`Error::SessionInvalidated`].
pub struct HttpPortal {
    http: reqwest::Client,
    base_url: Url,
    session: RwLock<Option<SessionInfo>>,
}

impl HttpPortal {
    /// Create a client for one of the regional portal deployments.
    pub fn new(subdomain: Subdomain, transport: &TransportConfig) -> Result<Self, Error> {
        let base_url = Url::parse(&subdomain.base_url())?;
        Self::with_base_url(base_url, transport)
    }

    /// Create a client against an explicit portal root (tests, proxies).
    pub fn with_base_url(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            base_url,
            session: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── Session bookkeeping ──────────────────────────────────────────

    pub(crate) fn session(&self) -> Option<SessionInfo> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn store_session(&self, info: SessionInfo) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(info);
    }

    pub(crate) fn take_session(&self) -> Option<SessionInfo> {
        self.session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// The portal version of the current session, or `NotAuthenticated`.
    pub(crate) fn version(&self) -> Result<String, Error> {
        self.session()
            .map(|s| s.portal_version)
            .ok_or(Error::NotAuthenticated)
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/myhome/{version}/{path}`.
    pub(crate) fn page_url(&self, version: &str, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(&format!("/myhome/{version}/{path}"))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Reject responses that show the session is gone or the call failed.
    pub(crate) fn check_response(&self, resp: &reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if is_signin_page(resp.url())
            || status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            warn!(url = %resp.url(), %status, "portal session invalidated");
            self.take_session();
            return Err(Error::SessionInvalidated);
        }
        if !status.is_success() {
            return Err(Error::unexpected(
                format!("HTTP {status} from {}", resp.url().path()),
                String::new(),
            ));
        }
        Ok(())
    }

    /// GET a session-scoped page and decode its JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let version = self.version()?;
        let url = self.page_url(&version, path)?;
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await?;
        self.check_response(&resp)?;

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::unexpected(format!("{path}: {e} (body preview: {preview:?})"), body.clone())
        })
    }
}

/// Whether the portal sent us to its sign-in form.
pub(crate) fn is_signin_page(url: &Url) -> bool {
    url.path().ends_with(SIGNIN_PAGE)
}

/// Pull the portal version out of a `/myhome/<version>/...` path.
pub(crate) fn extract_version(url: &Url) -> Option<String> {
    let mut segments = url.path_segments()?;
    segments.find(|s| *s == "myhome")?;
    segments
        .next()
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn extracts_version_from_myhome_path() {
        let url = Url::parse("https://portal.example/myhome/27.0.0-140/access/signin.jsp").unwrap();
        assert_eq!(extract_version(&url).as_deref(), Some("27.0.0-140"));
    }

    #[test]
    fn no_version_outside_myhome() {
        let url = Url::parse("https://portal.example/maintenance.html").unwrap();
        assert_eq!(extract_version(&url), None);
        let url = Url::parse("https://portal.example/myhome/").unwrap();
        assert_eq!(extract_version(&url), None);
    }

    #[test]
    fn recognizes_signin_page() {
        let url = Url::parse("https://portal.example/myhome/1.0/access/signin.jsp?e=ns").unwrap();
        assert!(is_signin_page(&url));
        let url = Url::parse("https://portal.example/myhome/1.0/summary/summary.jsp").unwrap();
        assert!(!is_signin_page(&url));
    }

    #[test]
    fn page_url_is_version_scoped() {
        let portal = HttpPortal::with_base_url(
            Url::parse("https://portal.example").unwrap(),
            &TransportConfig::default(),
        )
        .unwrap();
        let url = portal.page_url("27.0.0-140", "KeepAlive").unwrap();
        assert_eq!(url.as_str(), "https://portal.example/myhome/27.0.0-140/KeepAlive");
    }
}
