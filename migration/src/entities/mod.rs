pub mod account;
pub mod click_log;
pub mod session;
pub mod short_link;

pub use account::Entity as AccountEntity;
pub use click_log::Entity as ClickLogEntity;
pub use session::Entity as SessionEntity;
pub use short_link::Entity as ShortLinkEntity;
