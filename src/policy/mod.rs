//! Baseline action sources for evaluation and sanity checks.
//!
//! The real action source is an external trainer; these policies exist so
//! the environment can be exercised and evaluated without one.

mod greedy;
mod random;
mod trait_;

pub use greedy::GreedyPolicy;
pub use random::RandomPolicy;
pub use trait_::Policy;
