// Messaging module - Frame types and message routing
pub mod event;
pub mod router;

pub use event::{
    ErrorPayload, FrameType, NotificationEvent, NotificationPayload, NotificationReadPayload,
};
pub use router::MessageRouter;
