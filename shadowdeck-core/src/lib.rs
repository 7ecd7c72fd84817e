pub mod algorithm;
pub mod clock;
pub mod errors;
pub mod fuzz;
pub mod models;
pub mod queue;
pub mod repo;
pub mod scheduler;
pub mod stats;

pub use algorithm::{apply_answer, AnswerOutcome, StatBump};
pub use clock::*;
pub use errors::*;
pub use fuzz::*;
pub use models::*;
pub use queue::DueCard;
pub use repo::*;
pub use scheduler::*;
pub use stats::*;
