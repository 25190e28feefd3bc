//! 账户认证与会话生命周期

mod models;
pub mod notifier;
mod service;
pub mod token;

pub use models::{AuthenticatedUser, LoginFailure, LoginOutcome};
pub use notifier::{BrevoNotifier, LogNotifier, Notifier, create_notifier};
#[cfg(any(test, feature = "test-util"))]
pub use notifier::RecordingNotifier;
pub use service::{AuthService, MIN_PASSWORD_LENGTH};
pub use token::{AccessClaims, TokenIssuer};
