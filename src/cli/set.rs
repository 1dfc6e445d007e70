use eyre::{Result, bail};
use futures::future::join_all;

use crate::{config::Config, hardware::fan::defs::PowerState, platform::Platform};

pub async fn send(path: &str, state: PowerState, devices: &[String]) -> Result<()> {
    let config = Config::load(path).await?;
    let platform = Platform::from_config(&config)?;

    // Resolve everything first so an unknown id sends nothing
    let controllers = devices
        .iter()
        .map(|id| platform.controller(id))
        .collect::<Result<Vec<_>, _>>()?;

    let dispatches = controllers.iter().map(|fan| fan.set_active(state));

    let results = join_all(dispatches).await;
    let failed = results.iter().filter(|r| r.is_err()).count();

    if failed > 0 {
        bail!("{failed} of {} commands could not be sent", results.len());
    }

    tracing::info!("Sent {state} to {} devices", results.len());
    Ok(())
}
