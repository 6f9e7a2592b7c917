//! Server configuration: the wire model, where it is loaded from, the
//! shared snapshot and its periodic refresher.

mod refresher;
mod server;
mod snapshot;
mod source;

pub use refresher::ConfigRefresher;
pub use server::{ServerConfig, parse_servers};
pub use snapshot::ConfigSnapshot;
pub use source::{BasicAuth, ConfigSource};
