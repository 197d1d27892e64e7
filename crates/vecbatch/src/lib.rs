pub mod cli;
mod config;
pub mod handlers;
mod logging;

pub use config::{default_config_path, generate_commented_config, load_config};
pub use logging::init as init_logging;
