pub mod dispatcher;
pub mod jsonrpc;

pub use dispatcher::{Dispatcher, RelayReply, RESET_TOOL};
