pub mod context;
pub mod error;
pub mod inbound;
pub mod outbound;
pub mod types;
