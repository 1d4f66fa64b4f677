//! Feature-engineering search
//!
//! - [`EvaluationBasedOptimizer`] - budgeted beam search over the transformation graph
//! - [`PostProcessor`] - categorical crossing and tree-based selection on the final incumbent
//! - [`SearchBudget`] - evaluation-count and wall-clock limits behind a [`Clock`]

mod beam;
mod budget;
mod postprocess;
mod result;

pub use beam::{search, EvaluationBasedOptimizer};
pub use budget::{BudgetExhaustion, Clock, ManualClock, SearchBudget, SystemClock};
pub use postprocess::PostProcessor;
pub use result::{
    CandidateFailure, Incumbent, IncumbentUpdate, SearchPhase, SearchReport, SearchResult,
    SearchStats,
};
