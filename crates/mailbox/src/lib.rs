pub mod extract;
pub mod poller;
pub mod store;
pub mod types;

pub use poller::InboxPoller;
pub use store::{HostedMailbox, MessageStore};
pub use types::*;
