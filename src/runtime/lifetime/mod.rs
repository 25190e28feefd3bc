pub mod shutdown;
pub mod startup;

pub use shutdown::shutdown_background_tasks;
pub use startup::{BackgroundTasks, StartupContext, prepare_server_startup};
