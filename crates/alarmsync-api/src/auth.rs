use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Credentials for signing in to the portal.
///
/// The fingerprint is the browser fingerprint the portal issued when the
/// account completed two-factor enrollment; without it sign-in is refused.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
    pub fingerprint: String,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
            fingerprint: fingerprint.into(),
        }
    }
}

/// Which regional portal deployment to talk to.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
pub enum Subdomain {
    /// United States deployment.
    #[default]
    #[serde(rename = "portal")]
    #[strum(serialize = "portal")]
    Portal,
    /// Canadian deployment.
    #[serde(rename = "portal-ca")]
    #[strum(serialize = "portal-ca")]
    PortalCa,
}

impl Subdomain {
    /// Root URL of the portal for this deployment.
    pub fn base_url(self) -> String {
        format!("https://{self}.adtpulse.com")
    }
}
