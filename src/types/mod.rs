pub mod constants;
pub mod error;
pub mod message;
pub mod notification;
pub mod timestamp;

pub use constants::*;
pub use error::{NotificationError, Result};
pub use message::{InboundFrame, OutboundFrame};
pub use notification::{ActionKind, Notification, NotificationAction, Severity};
