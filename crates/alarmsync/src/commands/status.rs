//! `status`: panel, gateway and sync summary after one refresh.

use chrono::{DateTime, Utc};
use serde::Serialize;

use alarmsync_api::{GatewayInfo, PanelInfo, PanelStatus};
use alarmsync_core::Controller;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct StatusView {
    panel: Option<PanelInfo>,
    panel_status: Option<PanelStatus>,
    gateway: Option<GatewayInfo>,
    device_count: usize,
    revision: Option<String>,
    last_refresh: Option<DateTime<Utc>>,
}

impl StatusView {
    fn capture(c: &Controller) -> Self {
        Self {
            panel: c.panel(),
            panel_status: c.panel_status(),
            gateway: c.gateway(),
            device_count: c.devices_snapshot().len(),
            revision: c.revision(),
            last_refresh: c.last_refresh(),
        }
    }
}

fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

fn detail(s: &StatusView, color: bool) -> String {
    let state = s.panel_status.as_ref().map_or_else(
        || "-".to_owned(),
        |p| output::arm_state_label(p.state, color),
    );
    let panel_text = s.panel_status.as_ref().and_then(|p| p.status.as_deref());
    let panel_model = s
        .panel
        .as_ref()
        .map(|p| format!("{} {}", or_dash(p.manufacturer.as_deref()), or_dash(p.model.as_deref())));

    let mut lines = vec![
        format!("Panel:       {state}"),
        format!("Status:      {}", or_dash(panel_text)),
        format!("Panel model: {}", panel_model.as_deref().unwrap_or("-")),
    ];

    if let Some(gw) = &s.gateway {
        lines.push(format!(
            "Gateway:     {} {}",
            or_dash(gw.manufacturer.as_deref()),
            or_dash(gw.model.as_deref())
        ));
        lines.push(format!("Firmware:    {}", or_dash(gw.firmware_version.as_deref())));
        lines.push(format!("Connection:  {}", or_dash(gw.primary_connection.as_deref())));
        lines.push(format!("Broadband:   {}", or_dash(gw.broadband_status.as_deref())));
        lines.push(format!("Cellular:    {}", or_dash(gw.cellular_status.as_deref())));
    } else {
        lines.push("Gateway:     -".into());
    }

    lines.push(format!("Devices:     {}", s.device_count));
    lines.push(format!(
        "Refreshed:   {}",
        s.last_refresh
            .map_or_else(|| "-".into(), |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
    ));
    lines.join("\n")
}

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let view = super::with_refreshed(global, |c| Ok(StatusView::capture(c))).await?;
    let color = output::should_color(global.color);

    let out = output::render_single(
        global.output,
        &view,
        |s| detail(s, color),
        |s| {
            s.panel_status
                .as_ref()
                .map_or_else(|| "unknown".into(), |p| p.state.to_string())
        },
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
