//! Events - 控制事件发布

mod publisher;

pub use publisher::{ControlEvent, EventPublisher, NoticeLevel};
