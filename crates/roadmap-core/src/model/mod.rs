//! Roadmap data model: catalog items and captured subscribers.

pub mod item;
pub mod subscriber;

pub use item::{ItemValidationError, ParseEnumError, Priority, RoadmapItem, Status};
pub use subscriber::Subscriber;
