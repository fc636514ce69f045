// Store module - Deduplicated notification feed with optimistic updates
pub mod core;
pub mod optimistic;

pub use self::core::NotificationStore;
