use eyre::Result;

use crate::{config::Config, registry::DeviceRegistry};

pub async fn read_and_print(path: &str) -> Result<()> {
    let config = Config::load(path).await?;

    // Fails on the first invalid device, same as startup would
    let registry = DeviceRegistry::builder()
        .with_configs(&config.devices)
        .build()?;

    println!("{config}");
    println!("{} devices OK", registry.len());

    Ok(())
}
