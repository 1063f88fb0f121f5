//! Command/response correlation over a publish/subscribe bus
//!
//! A caller's `CommandDispatcher::send` registers a pending call with the
//! `CorrelationRouter`, publishes a command carrying a fresh correlation id and
//! a reply topic, and suspends. A `CommandResponder` on the receiving service
//! answers on that reply topic; the dispatcher's reply listener hands the
//! response to the router, which wakes the caller. Calls with no answer are
//! timed out by the router's sweep.

mod auth;
mod bus;
mod dispatcher;
mod responder;
mod router;

#[cfg(test)]
mod tests;

pub use auth::{AuthCommandClient, AuthCommandHandler};
pub use bus::{CommandBus, EnvelopeHandler};
pub use dispatcher::{CommandDispatcher, DispatcherConfig, ReplyListener};
pub use responder::{CommandHandler, CommandResponder};
pub use router::{CallOutcome, CallState, CorrelationRouter, PendingCall, SweeperHandle};
