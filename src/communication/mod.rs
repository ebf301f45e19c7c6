pub mod error_handler;
pub mod notifier;
pub mod telegram;
pub mod webshop;
