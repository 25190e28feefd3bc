//! 点击分析
//!
//! - [`ClickPipeline`]：重定向路径上的非阻塞采集入口
//! - [`ClickConsumer`]：唯一的后台消费者，负责地理解析与持久化
//! - [`StatsService`]：按短链接聚合统计，需所有者或管理令牌授权

mod pipeline;
mod stats;

pub use pipeline::{ClickConsumer, ClickPipeline, PipelineCounters, PipelineSnapshot};
pub use stats::{LinkStats, StatsService};

pub use crate::storage::ClickEvent;
