// ============ Chat Platforms ============
pub mod telegram;
pub use telegram::{MAX_MESSAGE_LENGTH, TelegramBot, split_message};
