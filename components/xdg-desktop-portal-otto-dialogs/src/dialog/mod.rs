//! Dialog surfaces and the single termination path they feed.
//!
//! A portal adapter pairs one [`Request`](crate::request::Request) with one
//! [`Dialog`] and hands both to the [`Dispatcher`]. From then on two producers
//! can end the interaction: the dialog, through its [`OutcomeSender`], and the
//! frontend, through `Close` on the request object. Both only enqueue a
//! [`Termination`]; the dispatcher consumes them one at a time, so the first
//! one for a dialog wins and anything after it is ignored.

pub mod command;
mod dispatcher;

pub use command::CommandDialog;
pub use dispatcher::{DialogHandle, Dispatcher, DispatcherHandle};

use std::fmt;

use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use crate::request::{IntoResults, ResponseCode, Results};

/// Identifies one open dialog inside the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DialogId(u64);

impl fmt::Display for DialogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dialog-{}", self.0)
    }
}

/// A UI surface presented on behalf of a portal caller.
pub trait Dialog: Send + 'static {
    /// Shows the surface. The user's decision must be reported through
    /// `outcome`, at most once.
    fn present(&mut self, outcome: OutcomeSender);

    /// Tears the surface down. Called exactly once, when the interaction ends
    /// for whatever reason.
    fn close(self: Box<Self>);
}

/// How the terminal answer reaches the caller.
pub enum Delivery {
    /// `Response` signal on the exported request object.
    Signal,
    /// Reply to the still pending method call.
    Reply(oneshot::Sender<(ResponseCode, Results)>),
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delivery::Signal => f.write_str("Signal"),
            Delivery::Reply(_) => f.write_str("Reply"),
        }
    }
}

/// One of the two events that can end an interaction.
#[derive(Debug)]
pub(crate) enum Termination {
    Outcome {
        id: DialogId,
        code: ResponseCode,
        results: Results,
    },
    CloseRequested {
        id: DialogId,
    },
}

impl Termination {
    fn id(&self) -> DialogId {
        match self {
            Termination::Outcome { id, .. } | Termination::CloseRequested { id } => *id,
        }
    }
}

/// Reports the user's decision for one dialog.
///
/// Consumed on use, so a dialog cannot answer twice.
pub struct OutcomeSender {
    id: DialogId,
    terminations: mpsc::UnboundedSender<Termination>,
}

impl OutcomeSender {
    pub(crate) fn new(id: DialogId, terminations: mpsc::UnboundedSender<Termination>) -> Self {
        Self { id, terminations }
    }

    pub fn id(&self) -> DialogId {
        self.id
    }

    pub fn send(self, code: ResponseCode, results: impl IntoResults) {
        let outcome = Termination::Outcome {
            id: self.id,
            code,
            results: results.into_results(),
        };
        if self.terminations.send(outcome).is_err() {
            warn!(dialog = %self.id, "Dispatcher is gone, dropping dialog outcome");
        }
    }

    pub fn accept(self, results: impl IntoResults) {
        self.send(ResponseCode::Success, results)
    }

    pub fn cancel(self) {
        self.send(ResponseCode::Cancelled, ())
    }
}
