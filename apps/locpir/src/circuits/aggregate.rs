//! Oblivious masking of payloads and their aggregation into one result.

use crate::backend::{reduce_vectors, Backend, BinaryGate, GateOp};
use crate::ciphertext::BitVector;
use crate::error::{ErrorKind, Result};
use crate::gates::BooleanGates;

/// ANDs `predicate` with every payload bit.
///
/// The same gates run whatever the predicate value, the payload comes out unchanged when the
/// predicate is true and zeroed otherwise.
pub fn mask<G: BooleanGates>(
    gates: &G,
    backend: &Backend,
    predicate: &G::Bit,
    payload: &BitVector<G::Bit>,
) -> BitVector<G::Bit> {
    let batch: Vec<_> = payload
        .iter()
        .map(|bit| GateOp::And(predicate, bit))
        .collect();
    backend.evaluate_batch(gates, &batch).into()
}

/// Position-wise XOR of all operands.
///
/// Operands are checked in index order before any gate is evaluated: an empty operand is
/// reported as missing, any other length than `payload_len` as a mismatch naming its index.
/// Without operands the result is `payload_len` zero bits.
///
/// XOR only selects a payload when at most one operand is non zero.
pub fn homomorphic_sum<G: BooleanGates>(
    gates: &G,
    backend: &Backend,
    operands: &[BitVector<G::Bit>],
    payload_len: usize,
) -> Result<BitVector<G::Bit>> {
    for (index, operand) in operands.iter().enumerate() {
        if operand.is_empty() {
            return Err(ErrorKind::MissingOperand { index }.into());
        }
        if operand.len() != payload_len {
            return Err(ErrorKind::OperandLengthMismatch {
                index,
                expected: payload_len,
                found: operand.len(),
            }
            .into());
        }
    }

    match reduce_vectors(backend, gates, operands, BinaryGate::Xor) {
        Some(sum) => Ok(sum.into()),
        None => Ok((0..payload_len).map(|_| gates.constant(false)).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{AcceleratorConfig, AcceleratorDevice};
    use crate::gates::{BitEncryptor, ClearGates, GateCounter};
    use crate::test_tools::{keys, signed_bits};
    use rand::Rng;
    use std::sync::Arc;

    fn backends() -> Vec<Backend> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(3)
            .build()
            .unwrap();
        let device = AcceleratorDevice::new(AcceleratorConfig::new(2).with_wave_size(4)).unwrap();
        vec![
            Backend::Sequential,
            Backend::Parallel(Arc::new(pool)),
            Backend::Accelerator(Arc::new(device)),
        ]
    }

    #[test]
    fn test_mask() {
        let payload = BitVector::new(signed_bits(0b1011_0110, 8));
        for backend in backends() {
            assert_eq!(mask(&ClearGates, &backend, &true, &payload), payload);
            assert_eq!(
                mask(&ClearGates, &backend, &false, &payload),
                BitVector::new(vec![false; 8])
            );
        }
    }

    #[test]
    fn test_encrypted_mask() {
        let (cks, sks) = keys();
        let clear = signed_bits(0b0110_1001, 8);
        let payload: BitVector<_> = clear.iter().map(|bit| cks.encrypt_bit(*bit)).collect();

        for predicate in [false, true] {
            let masked = mask(sks, &Backend::Sequential, &cks.encrypt_bit(predicate), &payload);
            let decrypted: Vec<bool> = masked.iter().map(|bit| cks.decrypt_bit(bit)).collect();
            let expected: Vec<bool> = clear.iter().map(|bit| *bit && predicate).collect();
            assert_eq!(decrypted, expected);
        }
    }

    /// At most one operand is non zero, the sum must be that operand on every back-end.
    fn one_hot_sum_test_case(backend: &Backend, count: usize, hot: Option<usize>) {
        let payload_len = 12;
        let mut rng = rand::thread_rng();
        let hot_payload = signed_bits(rng.gen_range(1..1 << payload_len), payload_len);

        let operands: Vec<BitVector<bool>> = (0..count)
            .map(|index| {
                if Some(index) == hot {
                    BitVector::new(hot_payload.clone())
                } else {
                    BitVector::new(vec![false; payload_len])
                }
            })
            .collect();

        let sum = homomorphic_sum(&ClearGates, backend, &operands, payload_len).unwrap();
        let expected = match hot {
            Some(_) => hot_payload,
            None => vec![false; payload_len],
        };
        assert_eq!(sum.into_inner(), expected);
    }

    #[test]
    fn test_sum_is_order_independent() {
        for backend in backends() {
            for count in [1, 2, 3, 7, 16, 33] {
                one_hot_sum_test_case(&backend, count, None);
                one_hot_sum_test_case(&backend, count, Some(0));
                one_hot_sum_test_case(&backend, count, Some(count - 1));
                one_hot_sum_test_case(&backend, count, Some(count / 2));
            }
        }
    }

    #[test]
    fn test_sum_without_operands() {
        let gates = GateCounter::new(ClearGates);
        let sum = homomorphic_sum(&gates, &Backend::Sequential, &[], 5).unwrap();
        assert_eq!(sum.into_inner(), vec![false; 5]);
        assert_eq!(gates.count().constant, 5);
    }

    #[test]
    fn test_sum_reports_first_bad_operand() {
        let good = BitVector::new(vec![true; 4]);
        let operands = vec![
            good.clone(),
            good.clone(),
            BitVector::default(),
            BitVector::new(vec![true; 3]),
        ];

        for backend in backends() {
            let gates = GateCounter::new(ClearGates);
            let err = homomorphic_sum(&gates, &backend, &operands, 4).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::MissingOperand { index: 2 });
            assert_eq!(gates.count().total(), 0);

            let err = homomorphic_sum(&gates, &backend, &operands[..2], 3).unwrap_err();
            assert_eq!(
                err.kind(),
                &ErrorKind::OperandLengthMismatch {
                    index: 0,
                    expected: 3,
                    found: 4
                }
            );

            let short_last = [good.clone(), good.clone(), BitVector::new(vec![true; 3])];
            let err = homomorphic_sum(&gates, &backend, &short_last, 4).unwrap_err();
            assert_eq!(
                err.kind(),
                &ErrorKind::OperandLengthMismatch {
                    index: 2,
                    expected: 4,
                    found: 3
                }
            );
            assert_eq!(gates.count().total(), 0);
        }
    }
}
