pub mod cli;
pub mod config;
pub mod listener;
pub mod node;
pub mod session;
pub mod telemetry;

pub use cli::Cli;
pub use config::NodeConfig;
pub use listener::Listener;
pub use session::{SessionConfig, SessionEnd, SessionHandler};
