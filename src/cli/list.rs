use eyre::Result;

use crate::{
    config::Config, misc::ColourDot, platform::cache::AccessoryCache, registry::DeviceRegistry,
};

pub async fn print_devices(path: &str) -> Result<()> {
    let config = Config::load(path).await?;

    let registry = DeviceRegistry::builder()
        .with_configs(&config.devices)
        .build()?;

    let cache = match &config.cache.path {
        Some(path) => AccessoryCache::open(path).await?,
        None => AccessoryCache::in_memory(),
    };

    for device in registry.list_devices() {
        let uuid = registry.derive_identity(device);
        let cached = cache.get(&uuid);

        println!("{} {device}", ColourDot::from(&cached));
        println!("    room: {}", device.room);
        println!("    uuid: {uuid}");
        println!(
            "    codes: {} B on, {} B off",
            device.on_payload.len(),
            device.off_payload.len()
        );
    }

    Ok(())
}
