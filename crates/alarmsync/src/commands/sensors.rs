//! `sensors`: every sensor the portal reports, with its live state.
//!
//! Meant for writing the `[[sensors]]` tables: the name, type and zone
//! columns are exactly what a configured entry must match.

use serde::Serialize;
use tabled::Tabled;

use alarmsync_api::{SensorInfo, SensorStatus};
use alarmsync_core::SensorType;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct SensorView {
    device_id: String,
    name: String,
    zone: u32,
    /// Normalized type; `None` when the portal label is not recognized.
    sensor_type: Option<SensorType>,
    portal_type: String,
    state: Option<String>,
}

#[derive(Tabled)]
struct SensorRow {
    #[tabled(rename = "Portal ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    sensor_type: String,
    #[tabled(rename = "Zone")]
    zone: u32,
    #[tabled(rename = "State")]
    state: String,
}

impl From<&SensorView> for SensorRow {
    fn from(s: &SensorView) -> Self {
        Self {
            id: s.device_id.clone(),
            name: s.name.clone(),
            sensor_type: s
                .sensor_type
                .map_or_else(|| format!("? ({})", s.portal_type), |t| t.to_string()),
            zone: s.zone,
            state: s.state.clone().unwrap_or_else(|| "-".into()),
        }
    }
}

fn join(info: &[SensorInfo], status: &[SensorStatus]) -> Vec<SensorView> {
    info.iter()
        .map(|s| SensorView {
            device_id: s.device_id.clone(),
            name: s.name.clone(),
            zone: s.zone,
            sensor_type: SensorType::from_portal_label(&s.device_type),
            portal_type: s.device_type.clone(),
            state: status
                .iter()
                .find(|st| st.name == s.name && st.zone == s.zone)
                .map(|st| st.state.clone())
                .or_else(|| s.status.clone()),
        })
        .collect()
}

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let sensors = super::with_refreshed(global, |c| {
        Ok(join(
            &c.sensors_info().unwrap_or_default(),
            &c.sensors_status().unwrap_or_default(),
        ))
    })
    .await?;

    let out = output::render_list(
        global.output,
        &sensors,
        |s| SensorRow::from(s),
        |s| s.device_id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
