pub mod bots;
pub mod chat;
pub mod config;
pub mod error;
pub mod finance;
pub mod observability;
pub mod protocol;
pub mod storage;
pub mod stream;
pub mod transport;

mod util;
