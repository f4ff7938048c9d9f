pub mod bootstrap;
pub mod config;
pub mod observability;
pub mod server;
pub mod sweep;

pub use config::AppConfig;
pub use observability::init_tracing;
pub use server::{ServerBuilder, StudioAuthServer, build_app};
