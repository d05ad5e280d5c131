pub mod handlers;
pub mod lease;
pub mod poller;
pub mod types;
