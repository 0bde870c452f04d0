//! Memory Layer - In-Memory State Management
//!
//! 在途请求登记，用于轮询去重

mod request_deduper;

pub use request_deduper::{InFlightGuard, RequestDeduper};
