use crate::{helpers::BakeError, world::Config};

fn builder() -> config::ConfigBuilder<config::builder::DefaultState> {
    config::Config::builder()
        .add_source(config::File::with_name("meshbake").required(false))
        .add_source(config::File::with_name("meshbake.local").required(false))
        .add_source(
            config::Environment::with_prefix("MESHBAKE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
}

/// Defaults, then `meshbake.toml`, `meshbake.local.toml` and `MESHBAKE__*`
/// environment variables, after loading `.env`.
pub fn load_config() -> Result<Config, BakeError> {
    let _ = dotenvy::dotenv();

    let cfg = builder().build()?;
    log::debug!("Config sources loaded {:?}", cfg);

    let cfg: Config = cfg.try_deserialize()?;
    if cfg.max_drawn_instances == 0 {
        return Err(BakeError::InvalidInput(
            "max_drawn_instances must be at least 1".to_string(),
        ));
    }
    log::info!("Config loaded successfully {:?}", cfg);
    Ok(cfg)
}
