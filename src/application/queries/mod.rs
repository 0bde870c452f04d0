//! 应用层 - 查询（读操作）
//!
//! CQRS 查询侧：模型注册表的只读查询

mod model_queries;

pub mod handlers;

pub use model_queries::*;
