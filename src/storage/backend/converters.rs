//! 领域模型与 SeaORM Model / ActiveModel 之间的转换

use sea_orm::ActiveValue::Set;

use crate::storage::{Account, ClickEvent, PasswordReset, Session, ShortLink};
use migration::entities::{account, click_log, session, short_link};

pub fn model_to_account(model: account::Model) -> Account {
    // 两列同时存在才视为有待使用的重置码
    let pending_reset = match (model.reset_code_hash, model.reset_code_expires_at) {
        (Some(code_hash), Some(expires_at)) => Some(PasswordReset {
            code_hash,
            expires_at,
        }),
        _ => None,
    };

    Account {
        id: model.id,
        email: model.email,
        password_hash: model.password_hash,
        name: model.name,
        is_active: model.is_active,
        pending_reset,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

pub fn account_to_active_model(account: &Account) -> account::ActiveModel {
    let (reset_code_hash, reset_code_expires_at) = match &account.pending_reset {
        Some(reset) => (Some(reset.code_hash.clone()), Some(reset.expires_at)),
        None => (None, None),
    };

    account::ActiveModel {
        id: Set(account.id.clone()),
        email: Set(account.email.clone()),
        password_hash: Set(account.password_hash.clone()),
        name: Set(account.name.clone()),
        is_active: Set(account.is_active),
        reset_code_hash: Set(reset_code_hash),
        reset_code_expires_at: Set(reset_code_expires_at),
        created_at: Set(account.created_at),
        updated_at: Set(account.updated_at),
    }
}

pub fn model_to_session(model: session::Model) -> Session {
    Session {
        id: model.id,
        account_id: model.account_id,
        refresh_token: model.refresh_token,
        expires_at: model.expires_at,
        created_at: model.created_at,
    }
}

pub fn session_to_active_model(session: &Session) -> session::ActiveModel {
    session::ActiveModel {
        id: Set(session.id.clone()),
        account_id: Set(session.account_id.clone()),
        refresh_token: Set(session.refresh_token.clone()),
        expires_at: Set(session.expires_at),
        created_at: Set(session.created_at),
    }
}

pub fn model_to_shortlink(model: short_link::Model) -> ShortLink {
    ShortLink {
        code: model.code,
        destination_url: model.destination_url,
        management_token: model.management_token,
        owner_id: model.owner_id,
        expires_at: model.expires_at,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

pub fn shortlink_to_active_model(link: &ShortLink) -> short_link::ActiveModel {
    short_link::ActiveModel {
        code: Set(link.code.clone()),
        destination_url: Set(link.destination_url.clone()),
        management_token: Set(link.management_token.clone()),
        owner_id: Set(link.owner_id.clone()),
        expires_at: Set(link.expires_at),
        created_at: Set(link.created_at),
        updated_at: Set(link.updated_at),
    }
}

pub fn click_to_active_model(event: &ClickEvent) -> click_log::ActiveModel {
    click_log::ActiveModel {
        link_code: Set(event.link_code.clone()),
        clicked_at: Set(event.clicked_at),
        ip_address: Set(event.ip_address.clone()),
        user_agent: Set(event.user_agent.clone()),
        referrer: Set(event.referrer.clone()),
        country_code: Set(event.country_code.clone()),
        ..Default::default()
    }
}
