//! 传输层/协议模块
//!
//! 简化 TCP：拥塞控制变体、RTO 估计、批量发送/接收应用与连接状态机。

pub mod app;
pub mod congestion;
pub mod rtt;
pub mod tcp;

// Transport tag types live in `net::transport`.
pub use crate::net::{TcpSegment, Transport};
