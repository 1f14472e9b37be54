// Session-scoped portal operations
//
// Keep-alive, revision polling, resource documents, and the arm/disarm
// command. All of them require a session and all of them detect the
// portal bouncing us back to the sign-in form.

use chrono::Utc;
use tracing::debug;

use super::client::HttpPortal;
use crate::error::Error;
use crate::models::{ArmState, GatewayInfo, PanelInfo, PanelStatus, SensorInfo, SensorStatus};

const ARM_COMMAND_HREF: &str = "rest/adt/ui/client/security/setArmState";

impl HttpPortal {
    pub(crate) async fn keep_alive(&self) -> Result<(), Error> {
        let version = self.version()?;
        let url = self.page_url(&version, "KeepAlive")?;
        debug!("POST {}", url);

        let resp = self.http().post(url).send().await?;
        self.check_response(&resp)
    }

    /// Poll the revision code. The `t` parameter defeats intermediary caches.
    pub(crate) async fn sync_check(&self) -> Result<String, Error> {
        let version = self.version()?;
        let mut url = self.page_url(&version, "Ajax/SyncCheckServ")?;
        url.query_pairs_mut()
            .append_pair("t", &Utc::now().timestamp_millis().to_string());
        debug!("GET {}", url);

        let resp = self.http().get(url).send().await?;
        self.check_response(&resp)?;

        let body = resp.text().await?;
        let code = body.trim();
        if is_revision_code(code) {
            Ok(code.to_owned())
        } else {
            let preview: String = code.chars().take(40).collect();
            Err(Error::unexpected(
                format!("malformed revision code {preview:?}"),
                body.clone(),
            ))
        }
    }

    pub(crate) async fn gateway_info(&self) -> Result<GatewayInfo, Error> {
        self.get_json("api/gateway.json").await
    }

    pub(crate) async fn panel_info(&self) -> Result<PanelInfo, Error> {
        self.get_json("api/panel.json").await
    }

    pub(crate) async fn panel_status(&self) -> Result<PanelStatus, Error> {
        self.get_json("api/panel-status.json").await
    }

    pub(crate) async fn sensors_info(&self) -> Result<Vec<SensorInfo>, Error> {
        self.get_json("api/sensors.json").await
    }

    pub(crate) async fn sensors_status(&self) -> Result<Vec<SensorStatus>, Error> {
        self.get_json("api/sensors-status.json").await
    }

    /// Send the arm/disarm command after validating the transition locally.
    pub(crate) async fn arm_disarm(&self, current: ArmState, target: ArmState) -> Result<(), Error> {
        current.validate_transition(target)?;

        let version = self.version()?;
        let url = self.page_url(&version, "quickcontrol/armDisarm.jsp")?;
        debug!(%current, %target, "POST {}", url);

        let armstate = current.to_string();
        let arm = target.to_string();
        let form = [
            ("href", ARM_COMMAND_HREF),
            ("armstate", armstate.as_str()),
            ("arm", arm.as_str()),
        ];
        let resp = self.http().post(url).form(&form).send().await?;
        self.check_response(&resp)
    }
}

/// `N-N-N`, three dash-separated decimal fields.
fn is_revision_code(s: &str) -> bool {
    let parts: Vec<&str> = s.split('-').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::is_revision_code;

    #[test]
    fn revision_code_shape() {
        assert!(is_revision_code("1-0-0"));
        assert!(is_revision_code("2310-14-3"));
        assert!(!is_revision_code("1-0"));
        assert!(!is_revision_code("1--0"));
        assert!(!is_revision_code("<html>"));
        assert!(!is_revision_code("1-0-0-0"));
    }
}
