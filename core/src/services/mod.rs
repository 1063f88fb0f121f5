//! Business services containing domain logic and use cases.

pub mod clock;
pub mod messaging;
pub mod token;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use messaging::{
    AuthCommandClient, AuthCommandHandler, CallState, CommandBus, CommandDispatcher,
    CommandHandler, CommandResponder, CorrelationRouter, DispatcherConfig, EnvelopeHandler,
    PendingCall, SweeperHandle,
};
pub use token::{
    CleanupResult, CleanupWorker, JwtTokenCodec, TokenCleanupConfig, TokenCleanupService,
    TokenCodec, TokenLifecycleConfig, TokenLifecycleManager,
};
