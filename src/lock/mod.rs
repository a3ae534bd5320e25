//! Lock state machine with boot-persistent state.

mod boot;
mod machine;
mod pin;
mod store;

pub use boot::early_lock_check;
pub use machine::{LockState, LockStateMachine, UnlockTrigger};
pub use pin::{DEFAULT_PIN, hash_pin, verify_pin};
pub use store::{LOCK_STATE_FILE, LockStateStore};
