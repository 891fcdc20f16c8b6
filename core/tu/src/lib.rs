//! The telephone unit (TU) state machine.

mod sink;
mod tu;

pub use sink::ClientSink;
pub use tu::{chat, dec_ref, dial, hangup, inc_ref, pickup, set_extension, Tu};

#[cfg(any(test, feature = "test-util"))]
pub use sink::mock::MockSink;
