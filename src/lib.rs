//! Linkpulse - URL shortener backend
//!
//! 多租户短链接服务：账户与会话认证、链接创建与跳转、异步点击采集与统计。
//!
//! # Architecture
//! - `auth`: 注册、登录、会话上限、令牌刷新、密码重置
//! - `analytics`: 非阻塞点击采集管道与统计查询
//! - `services`: 短链接服务与 GeoIP 解析
//! - `storage`: 存储接口及内存 / SeaORM 实现
//! - `api`: HTTP 接口与中间件
//! - `config`: 配置加载
//! - `runtime`: 启动、关闭与服务器模式
//! - `system`: 日志

pub mod analytics;
pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod errors;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
