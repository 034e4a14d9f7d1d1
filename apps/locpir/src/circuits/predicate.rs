//! Match tests between a query and the location of one record.
//!
//! The comparisons of a predicate do not depend on each other and are handed to the
//! [`CircuitPlan`] scheduler, the gates inside them to its back-end.

use super::comparison::{check_comparison_operands, less_or_equal, less_than};
use super::equality::{check_equality_operands, equal};
use super::CircuitPlan;
use crate::backend::GateOp;
use crate::ciphertext::{Area, BitVector};
use crate::error::Result;
use crate::gates::BooleanGates;

/// Encrypted `left_x <= x < right_x && left_y <= y < right_y`
pub fn within_area<G: BooleanGates>(
    gates: &G,
    plan: &CircuitPlan,
    x: &BitVector<G::Bit>,
    y: &BitVector<G::Bit>,
    area: &Area<G::Bit>,
) -> Result<G::Bit> {
    for operand in [y, &area.left_x, &area.right_x, &area.left_y, &area.right_y] {
        check_comparison_operands(x.len(), operand.len())?;
    }

    let scheduler = &plan.sub_circuits;
    let backend = &plan.gates;
    let ((left_x, right_x), (left_y, right_y)) = scheduler.join(
        || {
            scheduler.join(
                || less_or_equal(gates, backend, &area.left_x, x),
                || less_than(gates, backend, x, &area.right_x),
            )
        },
        || {
            scheduler.join(
                || less_or_equal(gates, backend, &area.left_y, y),
                || less_than(gates, backend, y, &area.right_y),
            )
        },
    );
    let (left_x, right_x, left_y, right_y) = (left_x?, right_x?, left_y?, right_y?);

    let axes = backend.evaluate_batch(
        gates,
        &[
            GateOp::And(&left_x, &right_x),
            GateOp::And(&left_y, &right_y),
        ],
    );
    Ok(gates.and(&axes[0], &axes[1]))
}

/// Encrypted `x == point_x && y == point_y`
pub fn matches_point<G: BooleanGates>(
    gates: &G,
    plan: &CircuitPlan,
    x: &BitVector<G::Bit>,
    y: &BitVector<G::Bit>,
    point_x: &BitVector<G::Bit>,
    point_y: &BitVector<G::Bit>,
) -> Result<G::Bit> {
    for operand in [y, point_x, point_y] {
        check_equality_operands(x.len(), operand.len())?;
    }

    let backend = &plan.gates;
    let (x_equal, y_equal) = plan.sub_circuits.join(
        || equal(gates, backend, x, point_x),
        || equal(gates, backend, y, point_y),
    );
    Ok(gates.and(&x_equal?, &y_equal?))
}

/// Encrypted `id == target`
pub fn matches_identifier<G: BooleanGates>(
    gates: &G,
    plan: &CircuitPlan,
    id: &BitVector<G::Bit>,
    target: &BitVector<G::Bit>,
) -> Result<G::Bit> {
    equal(gates, &plan.gates, id, target)
}
