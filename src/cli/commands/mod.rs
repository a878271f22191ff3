mod check_config;
mod hash_password;
mod init;

pub use check_config::cmd_check_config;
pub use hash_password::cmd_hash_password;
pub use init::cmd_init;
