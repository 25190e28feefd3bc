//! 系统级功能：日志初始化

pub mod logging;
