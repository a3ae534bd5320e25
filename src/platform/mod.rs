//! Host-side platform: the headless device, the system shell and the
//! daemon that runs the engine.

pub mod daemon;
pub mod host;
pub mod shell;

pub use host::{DeviceAction, FaultPlan, HostDevice};
pub use shell::SystemShell;
