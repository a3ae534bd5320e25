//! Remote commands: model, payload access, routing and handlers.

pub mod handlers;
pub mod payload;
pub mod router;
pub mod types;

pub use handlers::CommandContext;
pub use payload::{Fields, Payload};
pub use router::CommandRouter;
pub use types::{Command, CommandKind, DispatchMode};
