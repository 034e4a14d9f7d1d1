//! Signed comparison of two's complement bit vectors.

use crate::backend::{Backend, GateOp};
use crate::ciphertext::BitVector;
use crate::error::{check_length, ErrorKind, Result};
use crate::gates::BooleanGates;
use itertools::izip;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Relation {
    LessOrEqual,
    Less,
}

impl Relation {
    /// Result of the comparison when both operands are equal
    pub fn tie_value(self) -> bool {
        match self {
            Self::LessOrEqual => true,
            Self::Less => false,
        }
    }
}

/// Encrypted `a <= b` or `a < b`, the last bit of both operands being the sign bit.
///
/// The sign XOR and the magnitude XNORs are independent and form one batch. The magnitude scan
/// then goes from the least to the most significant bit: every differing bit overwrites the
/// running result with the bit of `b`, so the most significant difference wins. When the signs
/// differ, the sign of `a` alone gives the answer.
///
/// The scan is a chain of MUX gates, each one waiting for the previous one.
pub fn signed_compare<G: BooleanGates>(
    gates: &G,
    backend: &Backend,
    a: &BitVector<G::Bit>,
    b: &BitVector<G::Bit>,
    relation: Relation,
) -> Result<G::Bit> {
    check_comparison_operands(a.len(), b.len())?;

    let sign = a.len() - 1;
    let (a_magnitude, b_magnitude) = (&a.as_slice()[..sign], &b.as_slice()[..sign]);

    let batch: Vec<_> = std::iter::once(GateOp::Xor(&a[sign], &b[sign]))
        .chain(izip!(a_magnitude, b_magnitude).map(|(lhs, rhs)| GateOp::Xnor(lhs, rhs)))
        .collect();
    let outputs = backend.evaluate_batch(gates, &batch);
    let (signs_differ, equal_bits) = (&outputs[0], &outputs[1..]);

    let mut acc = gates.constant(relation.tie_value());
    for (equal_bit, b_bit) in izip!(equal_bits, b_magnitude) {
        acc = gates.mux(equal_bit, &acc, b_bit);
    }

    Ok(gates.mux(signs_differ, &a[sign], &acc))
}

/// Encrypted `a <= b`
pub fn less_or_equal<G: BooleanGates>(
    gates: &G,
    backend: &Backend,
    a: &BitVector<G::Bit>,
    b: &BitVector<G::Bit>,
) -> Result<G::Bit> {
    signed_compare(gates, backend, a, b, Relation::LessOrEqual)
}

/// Encrypted `a < b`
pub fn less_than<G: BooleanGates>(
    gates: &G,
    backend: &Backend,
    a: &BitVector<G::Bit>,
    b: &BitVector<G::Bit>,
) -> Result<G::Bit> {
    signed_compare(gates, backend, a, b, Relation::Less)
}

/// A comparison needs a sign bit and at least one magnitude bit
pub(crate) fn check_comparison_operands(lhs_len: usize, rhs_len: usize) -> Result<()> {
    check_length(lhs_len, rhs_len)?;
    if lhs_len < 2 {
        return Err(ErrorKind::OperandTooShort {
            minimum: 2,
            found: lhs_len,
        }
        .into());
    }
    Ok(())
}
