//! Per-tab protocol state and the browser's tab primitives.
//!
//! - `model`: background-owned `TabSession` and its delivery state machine
//! - `host`: the `TabHost` capability (tab messaging, script injection)

mod host;
mod model;

pub use host::TabHost;
pub use model::{ReceiverState, TabSession};
