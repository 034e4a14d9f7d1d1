//! Back-ends evaluating batches of independent gates, and schedulers running independent
//! sub-circuits.

mod accelerator;

pub use accelerator::{AcceleratorConfig, AcceleratorDevice};

use crate::gates::BooleanGates;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::sync::Arc;

/// One gate whose operands are already computed
pub enum GateOp<'a, B> {
    And(&'a B, &'a B),
    Xor(&'a B, &'a B),
    Xnor(&'a B, &'a B),
    Mux {
        condition: &'a B,
        then: &'a B,
        otherwise: &'a B,
    },
    Copy(&'a B),
    Constant(bool),
}

impl<B> Clone for GateOp<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B> Copy for GateOp<'_, B> {}

impl<'a, B> GateOp<'a, B> {
    pub fn binary(gate: BinaryGate, lhs: &'a B, rhs: &'a B) -> Self {
        match gate {
            BinaryGate::And => Self::And(lhs, rhs),
            BinaryGate::Xor => Self::Xor(lhs, rhs),
            BinaryGate::Xnor => Self::Xnor(lhs, rhs),
        }
    }

    pub fn evaluate<G: BooleanGates<Bit = B>>(&self, gates: &G) -> B {
        match *self {
            Self::And(lhs, rhs) => gates.and(lhs, rhs),
            Self::Xor(lhs, rhs) => gates.xor(lhs, rhs),
            Self::Xnor(lhs, rhs) => gates.xnor(lhs, rhs),
            Self::Mux {
                condition,
                then,
                otherwise,
            } => gates.mux(condition, then, otherwise),
            Self::Copy(bit) => gates.copy(bit),
            Self::Constant(value) => gates.constant(value),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryGate {
    And,
    Xor,
    Xnor,
}

/// Where a batch of independent gates is evaluated.
#[derive(Clone, Debug, Default)]
pub enum Backend {
    #[default]
    Sequential,
    Parallel(Arc<ThreadPool>),
    Accelerator(Arc<AcceleratorDevice>),
}

impl Backend {
    /// Evaluates every gate of the batch, outputs are in batch order.
    pub fn evaluate_batch<G: BooleanGates>(
        &self,
        gates: &G,
        batch: &[GateOp<'_, G::Bit>],
    ) -> Vec<G::Bit> {
        match self {
            Self::Sequential => batch.iter().map(|op| op.evaluate(gates)).collect(),
            Self::Parallel(pool) => {
                pool.install(|| batch.par_iter().map(|op| op.evaluate(gates)).collect())
            }
            Self::Accelerator(device) => device.launch(gates, batch),
        }
    }

    pub fn is_sequential(&self) -> bool {
        matches!(self, Self::Sequential)
    }
}

/// Runs independent sub-computations, e.g. the records of a database or the comparisons of a
/// predicate.
#[derive(Clone, Debug, Default)]
pub enum Scheduler {
    #[default]
    Sequential,
    Threads(Arc<ThreadPool>),
}

impl Scheduler {
    pub fn join<A, B, RA, RB>(&self, a: A, b: B) -> (RA, RB)
    where
        A: FnOnce() -> RA + Send,
        B: FnOnce() -> RB + Send,
        RA: Send,
        RB: Send,
    {
        match self {
            Self::Sequential => (a(), b()),
            Self::Threads(pool) => pool.join(a, b),
        }
    }

    /// Applies `op` to every item, outputs are in item order.
    pub fn map<T, R, F>(&self, items: &[T], op: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(usize, &T) -> R + Sync + Send,
    {
        match self {
            Self::Sequential => items
                .iter()
                .enumerate()
                .map(|(index, item)| op(index, item))
                .collect(),
            Self::Threads(pool) => pool.install(|| {
                items
                    .par_iter()
                    .enumerate()
                    .map(|(index, item)| op(index, item))
                    .collect()
            }),
        }
    }
}

/// Combines same length vectors position-wise with `gate`.
///
/// The sequential back-end folds from left to right. The other back-ends build a pairwise tree:
/// each level combines adjacent vectors (index `i` with `i + stride`, the stride doubling every
/// level) in a single batch, and a level only starts once the previous one is complete.
///
/// Returns `None` when there is nothing to combine. Operand lengths must have been checked by
/// the caller.
pub fn reduce_vectors<G, V>(
    backend: &Backend,
    gates: &G,
    operands: &[V],
    gate: BinaryGate,
) -> Option<Vec<G::Bit>>
where
    G: BooleanGates,
    V: AsRef<[G::Bit]>,
{
    let (first, rest) = operands.split_first()?;

    if backend.is_sequential() {
        let mut acc = first.as_ref().to_vec();
        for operand in rest {
            let batch: Vec<_> = acc
                .iter()
                .zip(operand.as_ref())
                .map(|(lhs, rhs)| GateOp::binary(gate, lhs, rhs))
                .collect();
            acc = backend.evaluate_batch(gates, &batch);
        }
        return Some(acc);
    }

    if rest.is_empty() {
        return Some(first.as_ref().to_vec());
    }

    let mut level = pairwise_level(backend, gates, operands, gate);
    while level.len() > 1 {
        level = pairwise_level(backend, gates, &level, gate);
    }
    level.pop()
}

fn pairwise_level<G, V>(
    backend: &Backend,
    gates: &G,
    operands: &[V],
    gate: BinaryGate,
) -> Vec<Vec<G::Bit>>
where
    G: BooleanGates,
    V: AsRef<[G::Bit]>,
{
    let batch: Vec<_> = operands
        .chunks_exact(2)
        .flat_map(|pair| {
            pair[0]
                .as_ref()
                .iter()
                .zip(pair[1].as_ref())
                .map(move |(lhs, rhs)| GateOp::binary(gate, lhs, rhs))
        })
        .collect();
    let mut outputs = backend.evaluate_batch(gates, &batch).into_iter();

    let mut next_level: Vec<Vec<G::Bit>> = operands
        .chunks_exact(2)
        .map(|pair| outputs.by_ref().take(pair[0].as_ref().len()).collect())
        .collect();

    if let [.., odd] = operands {
        if operands.len() % 2 == 1 {
            next_level.push(odd.as_ref().to_vec());
        }
    }
    next_level
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::{ClearGates, GateCounter};
    use rayon::ThreadPoolBuilder;

    fn pool(threads: usize) -> Arc<ThreadPool> {
        Arc::new(ThreadPoolBuilder::new().num_threads(threads).build().unwrap())
    }

    fn backends() -> Vec<Backend> {
        vec![
            Backend::Sequential,
            Backend::Parallel(pool(3)),
            Backend::Accelerator(Arc::new(
                AcceleratorDevice::new(AcceleratorConfig::new(4).with_wave_size(5)).unwrap(),
            )),
        ]
    }

    fn bits(value: u32, len: usize) -> Vec<bool> {
        (0..len).map(|i| (value >> i) & 1 == 1).collect()
    }

    #[test]
    fn test_evaluate_batch_is_ordered() {
        let one = true;
        let zero = false;
        let batch = vec![
            GateOp::And(&one, &zero),
            GateOp::Xor(&one, &zero),
            GateOp::Xnor(&one, &zero),
            GateOp::Mux {
                condition: &zero,
                then: &one,
                otherwise: &zero,
            },
            GateOp::Copy(&one),
            GateOp::Constant(true),
        ];

        for backend in backends() {
            assert_eq!(
                backend.evaluate_batch(&ClearGates, &batch),
                vec![false, true, false, false, true, true]
            );
        }
    }

    #[test]
    fn test_scheduler_map_keeps_order() {
        let items: Vec<u32> = (0..50).collect();
        for scheduler in [Scheduler::Sequential, Scheduler::Threads(pool(4))] {
            let outputs = scheduler.map(&items, |index, item| (index, item * 2));
            let expected: Vec<_> = items.iter().map(|item| (*item as usize, item * 2)).collect();
            assert_eq!(outputs, expected);

            assert_eq!(scheduler.join(|| 1, || 2), (1, 2));
        }
    }

    #[test]
    fn test_reduce_vectors_agrees_between_backends() {
        for count in 1..10 {
            let operands: Vec<Vec<bool>> = (0..count).map(|i| bits(i * 37 + 5, 6)).collect();
            let expected = (0..count).fold(0, |acc, i| acc ^ ((i * 37 + 5) & 0b11_1111));

            for backend in backends() {
                let reduced =
                    reduce_vectors(&backend, &ClearGates, &operands, BinaryGate::Xor).unwrap();
                assert_eq!(reduced, bits(expected, 6), "{count} operands on {backend:?}");
            }
        }
    }

    #[test]
    fn test_reduce_vectors_without_operands() {
        let operands: Vec<Vec<bool>> = vec![];
        assert!(reduce_vectors(&Backend::Sequential, &ClearGates, &operands, BinaryGate::And)
            .is_none());
    }

    #[test]
    fn test_reduce_vectors_gate_count_is_strategy_independent() {
        let operands: Vec<Vec<bool>> = (0..7).map(|i| bits(i, 3)).collect();
        for backend in backends() {
            let gates = GateCounter::new(ClearGates);
            reduce_vectors(&backend, &gates, &operands, BinaryGate::And).unwrap();
            assert_eq!(gates.count().and, 6 * 3);
        }
    }

    #[test]
    fn test_accelerator_launches_one_batch_per_level() {
        let device = Arc::new(AcceleratorDevice::new(AcceleratorConfig::new(2)).unwrap());
        let backend = Backend::Accelerator(device.clone());

        for (count, levels) in [(1, 0), (2, 1), (5, 3), (8, 3), (9, 4)] {
            let before = device.launch_count();
            let operands: Vec<Vec<bool>> = (0..count).map(|i| bits(i, 4)).collect();
            reduce_vectors(&backend, &ClearGates, &operands, BinaryGate::Xor).unwrap();
            assert_eq!(device.launch_count() - before, levels, "{count} operands");
        }
    }
}
