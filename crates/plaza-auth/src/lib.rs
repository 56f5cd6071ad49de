//! Verification of Telegram Mini App `initData` and the `tg:<id>` user-key
//! codec. Everything here is pure: no I/O, no clock reads outside `verify`.

pub mod init_data;
pub mod user_key;

pub use init_data::{TelegramUser, VerifiedIdentity, VerifyError, verify};
