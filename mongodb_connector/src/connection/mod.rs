mod filtered_connection;
mod resilient_client;

pub use filtered_connection::*;
pub use resilient_client::*;
