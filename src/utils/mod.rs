pub mod crypto;
pub mod query;
pub mod telegram_auth;
pub mod time;
