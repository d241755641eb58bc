//! Request/response bridge between the panel and the content context.
//!
//! Both sides share one broadcast [`PageSurface`]. The panel tags requests
//! with its channel name and a request id; the content context answers with
//! the same pair. Replies are matched by id only, so any number of requests
//! may be in flight and answered in any order.

mod panel_bridge;
mod pending;
mod relay;
mod surface;

pub use panel_bridge::PanelBridge;
pub use pending::PendingRequests;
pub use relay::{BridgeHandler, ContentRelay};
pub use surface::PageSurface;
