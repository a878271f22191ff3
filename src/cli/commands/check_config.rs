//! Check-config command handler

use crate::config::Config;
use crate::environment::{Environment, EnvironmentManager};

pub fn cmd_check_config(config: &Config) -> anyhow::Result<()> {
    config.validate()?;

    let environment = EnvironmentManager::from_config(config);

    println!("Configuration OK");
    println!("{:-<60}", "");
    for env in [Environment::Sandbox, Environment::Live] {
        let marker = if env == environment.current() { "*" } else { " " };
        println!("{marker} {:<8} {}", env, config.upstream.base_url(env));
    }
    println!();
    println!("  Port:             {}", config.server.port);
    println!(
        "  Request override: {}",
        if config.environment.allow_request_override {
            "allowed"
        } else {
            "disabled"
        }
    );
    println!(
        "  Polling:          every {}s, up to {} polls",
        config.transactions.poll_interval_seconds, config.transactions.max_polls
    );

    Ok(())
}
