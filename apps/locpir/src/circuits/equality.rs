use crate::backend::{reduce_vectors, Backend, BinaryGate, GateOp};
use crate::ciphertext::BitVector;
use crate::error::{check_length, Error, ErrorKind, Result};
use crate::gates::BooleanGates;
use itertools::izip;

/// Encrypted `a == b`: one XNOR per bit position, then an AND over all of them.
pub fn equal<G: BooleanGates>(
    gates: &G,
    backend: &Backend,
    a: &BitVector<G::Bit>,
    b: &BitVector<G::Bit>,
) -> Result<G::Bit> {
    check_equality_operands(a.len(), b.len())?;

    let batch: Vec<_> = izip!(a, b)
        .map(|(lhs, rhs)| GateOp::Xnor(lhs, rhs))
        .collect();
    let equal_bits: Vec<[G::Bit; 1]> = backend
        .evaluate_batch(gates, &batch)
        .into_iter()
        .map(|bit| [bit])
        .collect();

    reduce_vectors(backend, gates, &equal_bits, BinaryGate::And)
        .and_then(|bits| bits.into_iter().next())
        .ok_or_else(|| Error::new("Equality of empty operands".to_string()))
}

pub(crate) fn check_equality_operands(lhs_len: usize, rhs_len: usize) -> Result<()> {
    check_length(lhs_len, rhs_len)?;
    if lhs_len == 0 {
        return Err(ErrorKind::OperandTooShort {
            minimum: 1,
            found: 0,
        }
        .into());
    }
    Ok(())
}
