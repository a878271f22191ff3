//! Init command handler

use std::path::Path;

use crate::config::Config;

pub fn cmd_init(path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let default_path = Config::default_config_path();
    let path = path.unwrap_or(&default_path);

    if path.exists() && !force {
        println!(
            "{} already exists. Use --force to overwrite.",
            path.display()
        );
        return Ok(());
    }

    Config::default().save_to_path(path)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
