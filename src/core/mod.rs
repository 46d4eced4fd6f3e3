pub mod assembly;
pub mod config;
pub mod events;
pub mod history;
pub mod message;
pub mod phase;
pub mod poller;
pub mod session;
pub mod store;
pub mod transport;
