//! MEXC spot exchange integration

mod client;
mod error;
mod types;

pub use client::MexcClient;
pub use error::MexcError;
pub use types::Ticker24hResponse;
