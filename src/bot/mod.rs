//! Event dispatch: inbound events in, platform-neutral replies out.

mod admin_commands;
pub mod command;
pub mod dispatcher;
pub mod reply;
mod runner;

pub use command::InboundEvent;
pub use dispatcher::Dispatcher;
pub use reply::{Reply, ReplyField};
pub use runner::run;
