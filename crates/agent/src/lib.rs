//! Conversation runtime for the product finder.
//!
//! One inbound message runs a constrained loop:
//! 1. **Extraction** (`extractor`) - parse free text into a constraint delta
//! 2. **Turn engine** (`engine`) - merge, search, relax, decide
//! 3. **Reply rendering** (`replies`) - format the outcome for the user
//! 4. **Coordination** (`coordinator`) - locking, deadlines, persistence
//!
//! The extractor is strictly a translator. It never decides which member
//! wins, when to relax, or when the conversation ends. Those are
//! deterministic decisions made by the core policy.

pub mod coordinator;
pub mod engine;
pub mod extractor;
pub mod llm;
pub mod replies;

pub use coordinator::{Coordinator, CoordinatorSettings};
pub use engine::{TurnEngine, TurnOutcome};
pub use extractor::{ConstraintExtractor, LlmExtractor, RuleBasedExtractor};
pub use llm::LlmClient;
pub use replies::TurnReply;
