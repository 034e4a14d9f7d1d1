//! Boolean circuits of the lookup protocol.
//!
//! Circuits only ask their [`Backend`] to evaluate batches of independent gates and their
//! [`Scheduler`] to run independent sub-circuits, so the same code runs sequentially, on a
//! thread pool or on an accelerator.

pub mod aggregate;
pub mod comparison;
pub mod equality;
pub mod predicate;

use crate::backend::{Backend, Scheduler};

pub use aggregate::{homomorphic_sum, mask};
pub use comparison::{less_or_equal, less_than, signed_compare, Relation};
pub use equality::equal;
pub use predicate::{matches_identifier, matches_point, within_area};

/// Where the pieces of a predicate are evaluated
#[derive(Clone, Debug, Default)]
pub struct CircuitPlan {
    /// Runs the comparisons of one predicate
    pub sub_circuits: Scheduler,
    /// Evaluates the gate batches inside comparisons and equalities
    pub gates: Backend,
}

impl CircuitPlan {
    pub fn new(sub_circuits: Scheduler, gates: Backend) -> Self {
        Self {
            sub_circuits,
            gates,
        }
    }
}
