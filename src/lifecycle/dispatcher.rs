//! Command dispatcher contract.

use crate::lifecycle::context::AppContext;
use crate::lifecycle::signals::ExitSignal;

/// The command dispatcher control is handed to once startup is done.
///
/// `execute` runs on a blocking thread and returns the process exit status.
pub trait Dispatcher: Send + 'static {
    fn execute(&self, ctx: &AppContext) -> u8;
}

impl<F> Dispatcher for F
where
    F: Fn(&AppContext) -> u8 + Send + 'static,
{
    fn execute(&self, ctx: &AppContext) -> u8 {
        self(ctx)
    }
}

/// How the run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The dispatcher returned this status.
    Completed(u8),
    /// A termination signal arrived first.
    Interrupted(ExitSignal),
}

impl Outcome {
    pub fn exit_code(self) -> i32 {
        match self {
            Outcome::Completed(code) => i32::from(code),
            Outcome::Interrupted(signal) => signal.exit_code(),
        }
    }
}
