//! Real-time notification channel.
//!
//! [`NotificationListener`] owns the WebSocket, [`NotificationStore`] holds the
//! normalised records, and [`protocol`] describes the frames exchanged.

mod listener;
mod model;
pub mod protocol;
mod store;

pub use listener::{EndpointFn, NotificationListener};
pub use model::{ConnectionStatus, NotificationEvent, NotificationRecord};
pub use store::NotificationStore;
