// HTTP implementation of the portal seam.

mod auth;
mod client;
mod resources;

pub use client::HttpPortal;

use async_trait::async_trait;

use crate::auth::Credentials;
use crate::error::Error;
use crate::models::{
    ArmState, GatewayInfo, PanelInfo, PanelStatus, SensorInfo, SensorStatus, SessionInfo,
};
use crate::portal::Portal;

#[async_trait]
impl Portal for HttpPortal {
    async fn authenticate(&self, credentials: &Credentials) -> Result<SessionInfo, Error> {
        self.sign_in(credentials).await
    }

    async fn end_session(&self) -> Result<(), Error> {
        self.sign_out().await
    }

    async fn fetch_gateway_info(&self) -> Result<GatewayInfo, Error> {
        self.gateway_info().await
    }

    async fn fetch_panel_info(&self) -> Result<PanelInfo, Error> {
        self.panel_info().await
    }

    async fn fetch_panel_status(&self) -> Result<PanelStatus, Error> {
        self.panel_status().await
    }

    async fn fetch_sensors_info(&self) -> Result<Vec<SensorInfo>, Error> {
        self.sensors_info().await
    }

    async fn fetch_sensors_status(&self) -> Result<Vec<SensorStatus>, Error> {
        self.sensors_status().await
    }

    async fn set_panel_status(&self, current: ArmState, target: ArmState) -> Result<(), Error> {
        self.arm_disarm(current, target).await
    }

    async fn perform_heartbeat(&self) -> Result<(), Error> {
        self.keep_alive().await
    }

    async fn perform_change_check(&self) -> Result<String, Error> {
        self.sync_check().await
    }

    fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }
}
