//! 拓扑构建

pub mod bottleneck;
