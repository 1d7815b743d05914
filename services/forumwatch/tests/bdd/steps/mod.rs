//! BDD step definitions for forumwatch service

pub mod api_steps;
pub mod detection_steps;
pub mod lifecycle_steps;
pub mod notification_steps;
pub mod service_steps;
pub mod watchdog_steps;
