use anyhow::Context;

use crate::config::AppConfig;

/// Writes a default configuration file, refusing to overwrite an existing
/// one.
pub fn run() -> anyhow::Result<()> {
    let path = AppConfig::default_config_path()?;

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = r#"---
providers:
  coingecko:
    base_url: "https://api.coingecko.com"
  exchangerate:
    base_url: "https://v6.exchangerate-api.com"
    # Leave empty to read EXCHANGERATE_API_KEY from the environment.
    api_key: ""

rates_ttl_seconds: 300
request_timeout_seconds: 10
"#;

    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    println!("Created default configuration at {}", path.display());
    Ok(())
}
