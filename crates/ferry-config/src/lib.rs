//! Configuration for Ferry.
//!
//! TOML files layered from the user config directory and the project
//! directory; CLI flags override the result. Sections:
//!
//! ```toml
//! [mcp]
//! endpoint = "ws://localhost:8080/mcp"
//! connect_timeout_secs = 5
//! request_timeout_secs = 60     # unset: wait until the connection drops
//!
//! [chat]
//! base_url = "http://localhost:8000/api"
//! timeout_secs = 30
//!
//! [logging]
//! level = "info"
//! file = true
//! directory = "/var/log/ferry"
//! ```

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigSource, LoadedConfig, load_config, load_config_file, load_config_with_options, log_dir,
    save_config, xdg_config_dir, xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
