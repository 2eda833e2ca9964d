mod client_pool;
mod connection_error;
mod context;

pub use client_pool::*;
pub use connection_error::*;
pub use context::*;
