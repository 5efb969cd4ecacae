pub mod chat;
pub mod launch;
pub mod user;
