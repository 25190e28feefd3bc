pub mod clock;
pub mod ip;
pub mod password;

use base64::Engine;

pub use clock::{Clock, ManualClock, SystemClock};

/// 短码字符集
const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// 短码最大长度（与 short_links.code 列宽一致）
const MAX_SHORT_CODE_LENGTH: usize = 32;

/// 生成指定长度的随机字母数字串（短码、管理令牌）
pub fn generate_random_code(length: usize) -> String {
    std::iter::repeat_with(|| CODE_CHARSET[rand::random_range(0..CODE_CHARSET.len())] as char)
        .take(length)
        .collect()
}

/// 生成 `byte_len` 字节的随机令牌，Base64 URL-safe 编码（无填充）
pub fn generate_secure_token(byte_len: usize) -> String {
    let bytes: Vec<u8> = std::iter::repeat_with(rand::random::<u8>)
        .take(byte_len)
        .collect();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// 短码只允许字母数字，长度 1..=32
pub fn is_valid_short_code(code: &str) -> bool {
    !code.is_empty()
        && code.len() <= MAX_SHORT_CODE_LENGTH
        && code.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// `local@domain.tld` 形状检查
///
/// - local: 字母数字及 `._%+-`
/// - domain: 字母数字及 `.-`，至少包含一个点
/// - tld: 至少两个字母
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty()
        || !local
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"._%+-".contains(&b))
    {
        return false;
    }

    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };

    !host.is_empty()
        && host
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-')
        && tld.len() >= 2
        && tld.bytes().all(|b| b.is_ascii_alphabetic())
}
