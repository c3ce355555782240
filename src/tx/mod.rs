//! Ledger transaction execution with multi-party signing

mod context;
mod executor;
mod session;

pub use context::{CallContext, CommandResponse, ProgramTarget};
pub use executor::Executor;
pub use session::ExecutorSession;
