pub mod config;
pub mod envelope;
pub mod error;
pub mod fault;
pub mod paths;

pub use config::Config;
pub use envelope::{
    RequestEnvelope, ResponseEnvelope, ToolSyncEntry, ToolSyncEnvelope, SYNC_REQUEST_KIND,
    SYNC_TOOLS_ID,
};
pub use error::{EngineError, Error, Result};
pub use fault::{Fault, FaultHub, FaultKind};
pub use paths::Paths;
