//! Hash-password command handler

use crate::config::Config;
use crate::store::hash_password;

pub fn cmd_hash_password(config: &Config, password: &str) -> anyhow::Result<()> {
    if password.chars().count() < config.security.min_password_length {
        anyhow::bail!(
            "Password must be at least {} characters",
            config.security.min_password_length
        );
    }

    let hash = hash_password(password, Some(&config.security))?;
    println!("{hash}");
    Ok(())
}
