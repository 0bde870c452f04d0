//! Fake Adapter - 进程内模拟服务端

mod fake_control_server;

pub use fake_control_server::{FakeControlServer, FakeOperation};
