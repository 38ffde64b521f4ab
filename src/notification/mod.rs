//! Notification types and the lifecycle engine.
//!
//! # Lifecycle
//!
//! A notification enters as `Pending` (submitted for immediate delivery) or
//! `Scheduled` (deferred). Each resolves exactly once into `Sent` or
//! `Failed`, both terminal. Scheduled records are promoted by
//! [`NotificationEngine::process_due`], which the scheduler calls on every
//! tick.

mod engine;
mod error;
mod types;

pub use engine::{
    NotificationEngine, ProcessReport, SubmitOutcome, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
pub use error::{EngineError, EngineResult};
pub use types::{
    Metadata, Notification, NotificationFilter, NotificationPage, NotificationPatch,
    NotificationRequest, NotificationStatus, NotificationType, ScheduleRequest, UnsupportedType,
};
