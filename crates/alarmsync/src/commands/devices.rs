//! `devices`: the canonical device list after one refresh.

use tabled::Tabled;

use alarmsync_core::Device;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Zone")]
    zone: String,
    #[tabled(rename = "Model")]
    model: String,
}

impl From<&Device> for DeviceRow {
    fn from(d: &Device) -> Self {
        let model = match (d.manufacturer.as_deref(), d.model.as_deref()) {
            (Some(make), Some(model)) => format!("{make} {model}"),
            (Some(only), None) | (None, Some(only)) => only.to_owned(),
            (None, None) => "-".into(),
        };
        Self {
            id: d.id.to_string(),
            name: d.name.clone(),
            category: d.category.to_string(),
            zone: d.zone.map_or_else(|| "-".into(), |z| z.to_string()),
            model,
        }
    }
}

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let devices = super::with_refreshed(global, |c| Ok(c.devices_snapshot())).await?;

    let out = output::render_list(
        global.output,
        devices.as_slice(),
        |d| DeviceRow::from(d),
        |d| d.id.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
