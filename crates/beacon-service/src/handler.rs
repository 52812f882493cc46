//! Handler chain contract.

use beacon_proto::{AnswerList, Question, ReplyData};

/// Outcome of offering a question or reply to one handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// The handler claimed the item; later handlers in the chain are not
    /// consulted for it.
    Handled,

    /// The handler passed; the chain continues.
    NotYetHandled,
}

/// A domain plug-in consulted for inbound questions and replies.
///
/// Handlers are registered on the service before `init` and never
/// removed. For each question they run in registration order until one
/// returns [`HandlerOutcome::Handled`]; for replies the chain runs once
/// against the full record set of the datagram, first-handled wins.
///
/// Neither method may block. Long-running work (hostname resolution,
/// outbound registration) is spawned on the shared runtime, and such
/// continuations must be safe no-ops if they fire after the service has
/// shut down.
pub trait MdnsHandler: Send + Sync {
    /// Offers one decoded question.
    ///
    /// The handler may append zero or more records to `answers`, but must
    /// not touch it when returning [`HandlerOutcome::NotYetHandled`].
    fn on_question(&self, question: &Question, answers: &mut AnswerList) -> HandlerOutcome;

    /// Offers the full set of answer records decoded from one reply
    /// datagram. May take side effects; never produces outbound records.
    fn on_reply(&self, replies: &[ReplyData]) -> HandlerOutcome;
}
