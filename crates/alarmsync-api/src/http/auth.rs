// Portal authentication
//
// Form-based sign-in and sign-out. The sign-in form sets the session
// cookie in the client's jar; subsequent requests use it automatically.

use secrecy::ExposeSecret;
use tracing::debug;

use super::client::{HttpPortal, extract_version, is_signin_page};
use crate::auth::Credentials;
use crate::error::Error;
use crate::models::SessionInfo;

const SUMMARY_PAGE: &str = "/summary/summary.jsp";

impl HttpPortal {
    /// Sign in with username, password and device fingerprint.
    ///
    /// The portal root redirects to a versioned sign-in page; the version is
    /// read from that URL. A successful form post lands on the summary page,
    /// a rejected one lands back on the sign-in page.
    pub(crate) async fn sign_in(&self, credentials: &Credentials) -> Result<SessionInfo, Error> {
        debug!("discovering portal version at {}", self.base_url());

        let landing = self.http().get(self.base_url().clone()).send().await?;
        let landing_url = landing.url().clone();
        let version = extract_version(&landing_url).ok_or_else(|| {
            Error::unexpected(
                format!("no portal version in landing URL {landing_url}"),
                String::new(),
            )
        })?;

        let signin_url = self.page_url(&version, "access/signin.jsp")?;
        debug!("signing in at {}", signin_url);

        let form = [
            ("usernameForm", credentials.username.as_str()),
            ("passwordForm", credentials.password.expose_secret()),
            ("fingerprint", credentials.fingerprint.as_str()),
            ("sun", "yes"),
        ];
        let resp = self.http().post(signin_url).form(&form).send().await?;

        let status = resp.status();
        let final_url = resp.url().clone();
        if !status.is_success() {
            return Err(Error::unexpected(
                format!("sign-in returned HTTP {status}"),
                resp.text().await.unwrap_or_default(),
            ));
        }
        if is_signin_page(&final_url) {
            return Err(Error::Authentication {
                message: "portal rejected the username, password, or fingerprint".into(),
            });
        }
        if !final_url.path().ends_with(SUMMARY_PAGE) {
            return Err(Error::unexpected(
                format!("sign-in landed on unexpected page {}", final_url.path()),
                String::new(),
            ));
        }

        let info = SessionInfo {
            portal_version: extract_version(&final_url).unwrap_or(version),
        };
        self.store_session(info.clone());
        debug!(version = %info.portal_version, "sign-in successful");
        Ok(info)
    }

    /// End the current session. The local session is dropped first, so a
    /// failed request still leaves the client signed out.
    pub(crate) async fn sign_out(&self) -> Result<(), Error> {
        let Some(session) = self.take_session() else {
            debug!("sign-out skipped: no session");
            return Ok(());
        };

        let url = self.page_url(&session.portal_version, "access/signout.jsp")?;
        debug!("signing out at {}", url);
        self.http().get(url).send().await?;
        debug!("sign-out complete");
        Ok(())
    }
}
