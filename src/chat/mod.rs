pub mod history;
pub mod prompt;
pub mod rewrite;
pub mod session;
pub mod turn;

pub use history::{Role, StoredMessage, Transcript};
pub use session::{ChatOptions, ChatSession, SessionStore, MODELS};
pub use turn::{run_turn, Reference, TurnError, TurnOutcome, TurnRequest};
