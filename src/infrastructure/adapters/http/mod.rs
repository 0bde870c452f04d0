//! HTTP Adapter - 机器人服务端 HTTP 客户端

mod dto;
mod http_control_client;

pub use http_control_client::{HttpControlClient, HttpControlClientConfig};
