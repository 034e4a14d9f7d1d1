//! Evaluation side of the lookup protocol.
//!
//! For every record the server evaluates a match predicate against the query, masks the record
//! payload with it and finally XORs all masked payloads together. It performs the same gates
//! whichever record matches, so it learns neither the query nor the answer.
//!
//! # Precondition
//!
//! At most one record of the database may match a query. With several matches the result is the
//! XOR of their payloads, which is not an error the server can detect.

use crate::ciphertext::{BitVector, Database, Location, LocationKind, PositionQuery};
use crate::circuits::{
    homomorphic_sum, mask, matches_identifier, matches_point, within_area, CircuitPlan,
};
use crate::error::{Error, ErrorKind, Result};
use crate::gates::BooleanGates;
use crate::strategy::ExecutionContext;
use tracing::{debug, info_span};

/// Answers lookups with the gates of `G`, e.g. a TFHE boolean `ServerKey`.
#[derive(Clone, Debug)]
pub struct LookupServer<G> {
    gates: G,
}

impl<G: BooleanGates> LookupServer<G> {
    pub fn new(gates: G) -> Self {
        Self { gates }
    }

    pub fn gates(&self) -> &G {
        &self.gates
    }

    /// Payload of the record whose area contains the queried position
    pub fn range_lookup(
        &self,
        query: &PositionQuery<G::Bit>,
        database: &Database<G::Bit>,
        context: &ExecutionContext,
    ) -> Result<BitVector<G::Bit>> {
        self.lookup(
            LocationKind::Area,
            query.x.len(),
            Some(query.y.len()),
            database,
            context,
            |gates, plan, location| match location {
                Location::Area(area) => within_area(gates, plan, &query.x, &query.y, area),
                _ => Err(unexpected_location(LocationKind::Area, location)),
            },
        )
    }

    /// Payload of the record stored exactly at the queried position
    pub fn point_lookup(
        &self,
        query: &PositionQuery<G::Bit>,
        database: &Database<G::Bit>,
        context: &ExecutionContext,
    ) -> Result<BitVector<G::Bit>> {
        self.lookup(
            LocationKind::Point,
            query.x.len(),
            Some(query.y.len()),
            database,
            context,
            |gates, plan, location| match location {
                Location::Point { x, y } => matches_point(gates, plan, &query.x, &query.y, x, y),
                _ => Err(unexpected_location(LocationKind::Point, location)),
            },
        )
    }

    /// Payload of the record stored under the queried identifier
    pub fn identifier_lookup(
        &self,
        query: &BitVector<G::Bit>,
        database: &Database<G::Bit>,
        context: &ExecutionContext,
    ) -> Result<BitVector<G::Bit>> {
        self.lookup(
            LocationKind::Identifier,
            query.len(),
            None,
            database,
            context,
            |gates, plan, location| match location {
                Location::Identifier(id) => matches_identifier(gates, plan, query, id),
                _ => Err(unexpected_location(LocationKind::Identifier, location)),
            },
        )
    }

    fn lookup<P>(
        &self,
        kind: LocationKind,
        query_len: usize,
        second_query_len: Option<usize>,
        database: &Database<G::Bit>,
        context: &ExecutionContext,
        predicate: P,
    ) -> Result<BitVector<G::Bit>>
    where
        P: Fn(&G, &CircuitPlan, &Location<G::Bit>) -> Result<G::Bit> + Sync + Send,
    {
        check_query(kind, query_len, second_query_len, database)?;

        let span = info_span!(
            "lookup",
            ?kind,
            records = database.len(),
            strategy = %context.strategy()
        );
        let _guard = span.enter();

        let plan = context.plan();
        let gates = &self.gates;
        let masked = plan
            .records
            .map(database.records(), |_, record| -> Result<_> {
                let matched = predicate(gates, &plan.circuit, &record.location)?;
                Ok(mask(gates, &plan.mask, &matched, &record.payload))
            })
            .into_iter()
            .collect::<Result<Vec<_>>>()?;
        debug!("predicates and masks done");

        let result = homomorphic_sum(gates, &plan.reduction, &masked, database.payload_len())?;
        debug!("reduction done");
        Ok(result)
    }
}

/// Everything that can make a lookup fail is checked here, before the first gate.
fn check_query<B>(
    kind: LocationKind,
    query_len: usize,
    second_query_len: Option<usize>,
    database: &Database<B>,
) -> Result<()> {
    let expected = database.location_len();
    for found in std::iter::once(query_len).chain(second_query_len) {
        if found != expected {
            return Err(ErrorKind::LengthMismatch { expected, found }.into());
        }
    }

    let minimum = match kind {
        LocationKind::Area => 2,
        LocationKind::Point | LocationKind::Identifier => 1,
    };
    if query_len < minimum {
        return Err(ErrorKind::OperandTooShort {
            minimum,
            found: query_len,
        }
        .into());
    }

    match database.kind() {
        Some(found) if found != kind => Err(ErrorKind::IncompatibleLocation {
            expected: kind,
            found,
        }
        .into()),
        _ => Ok(()),
    }
}

fn unexpected_location<B>(expected: LocationKind, location: &Location<B>) -> Error {
    ErrorKind::IncompatibleLocation {
        expected,
        found: location.kind(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::AcceleratorConfig;
    use crate::ciphertext::{Area, Record};
    use crate::client::encoding::encode_fixed_point;
    use crate::gates::{ClearGates, GateCounter};
    use crate::strategy::{ExecutionConfig, ExecutionStrategy};
    use crate::test_tools::signed_bits;

    const LEN: usize = 8;
    const PAYLOAD_LEN: usize = 16;

    fn fixed(value: f64) -> BitVector<bool> {
        let encoded = encode_fixed_point(value, LEN).unwrap();
        (0..LEN).map(|i| (encoded >> i) & 1 == 1).collect()
    }

    fn payload(value: i64) -> BitVector<bool> {
        BitVector::new(signed_bits(value, PAYLOAD_LEN))
    }

    /// Unit squares along the diagonal, record `i` covers `[i - 4, i - 3) x [i - 4, i - 3)`
    fn diagonal_database(count: usize) -> Database<bool> {
        let records = (0..count)
            .map(|i| {
                let low = i as f64 - 4.0;
                Record {
                    location: Location::Area(Area {
                        left_x: fixed(low),
                        right_x: fixed(low + 1.0),
                        left_y: fixed(low),
                        right_y: fixed(low + 1.0),
                    }),
                    payload: payload(1000 + i as i64),
                }
            })
            .collect();
        Database::new(records, LEN, PAYLOAD_LEN).unwrap()
    }

    fn contexts() -> Vec<ExecutionContext> {
        let accelerator = AcceleratorConfig::new(3).with_wave_size(7);
        vec![
            ExecutionContext::sequential(),
            ExecutionContext::new(
                ExecutionConfig::new(ExecutionStrategy::ParallelRecords).with_threads(3),
            )
            .unwrap(),
            ExecutionContext::new(
                ExecutionConfig::new(ExecutionStrategy::ParallelCircuits).with_threads(3),
            )
            .unwrap(),
            ExecutionContext::new(
                ExecutionConfig::new(ExecutionStrategy::ParallelCircuits)
                    .with_threads(2)
                    .with_accelerator(accelerator),
            )
            .unwrap(),
            ExecutionContext::new(
                ExecutionConfig::new(ExecutionStrategy::Accelerated)
                    .with_threads(2)
                    .with_accelerator(accelerator),
            )
            .unwrap(),
        ]
    }

    fn range_lookup_test_case(context: &ExecutionContext) {
        let server = LookupServer::new(ClearGates);
        let database = diagonal_database(6);

        for i in 0..6 {
            let coordinate = i as f64 - 4.0 + 0.5;
            let query = PositionQuery::new(fixed(coordinate), fixed(coordinate)).unwrap();
            let result = server.range_lookup(&query, &database, context).unwrap();
            assert_eq!(result, payload(1000 + i as i64), "record {i} on {:?}", context.strategy());
        }

        let outside = PositionQuery::new(fixed(-4.5), fixed(3.0)).unwrap();
        let result = server.range_lookup(&outside, &database, context).unwrap();
        assert_eq!(result, payload(0));
    }

    #[test]
    fn test_range_lookup_on_every_strategy() {
        for context in contexts() {
            range_lookup_test_case(&context);
        }
    }

    #[test]
    fn test_point_and_identifier_lookups() {
        let server = LookupServer::new(ClearGates);
        let points = Database::new(
            (0..4)
                .map(|i| Record {
                    location: Location::Point {
                        x: BitVector::new(signed_bits(i, LEN)),
                        y: BitVector::new(signed_bits(2 * i, LEN)),
                    },
                    payload: payload(50 + i),
                })
                .collect(),
            LEN,
            PAYLOAD_LEN,
        )
        .unwrap();
        let identifiers = Database::new(
            (0..5)
                .map(|i| Record {
                    location: Location::Identifier(BitVector::new(signed_bits(i, 3))),
                    payload: payload(-i),
                })
                .collect(),
            3,
            PAYLOAD_LEN,
        )
        .unwrap();

        for context in contexts() {
            let query = PositionQuery::new(
                BitVector::new(signed_bits(3, LEN)),
                BitVector::new(signed_bits(6, LEN)),
            )
            .unwrap();
            assert_eq!(server.point_lookup(&query, &points, &context).unwrap(), payload(53));

            let query = PositionQuery::new(
                BitVector::new(signed_bits(3, LEN)),
                BitVector::new(signed_bits(5, LEN)),
            )
            .unwrap();
            assert_eq!(server.point_lookup(&query, &points, &context).unwrap(), payload(0));

            let query = BitVector::new(signed_bits(4, 3));
            assert_eq!(
                server
                    .identifier_lookup(&query, &identifiers, &context)
                    .unwrap(),
                payload(-4)
            );
        }
    }

    #[test]
    fn test_lookup_work_does_not_depend_on_the_answer() {
        let server = LookupServer::new(GateCounter::new(ClearGates));
        let database = diagonal_database(5);
        let context = ExecutionContext::sequential();

        let mut counts = vec![];
        for coordinate in [-3.5, 0.5, 7.0] {
            server.gates().reset();
            let query = PositionQuery::new(fixed(coordinate), fixed(coordinate)).unwrap();
            server.range_lookup(&query, &database, &context).unwrap();
            counts.push(server.gates().count());
        }

        assert!(counts.windows(2).all(|pair| pair[0] == pair[1]));
        // 3 ANDs per predicate, one AND per payload bit, one XOR per payload bit and combination
        assert_eq!(counts[0].and, 5 * (3 + PAYLOAD_LEN));
        assert_eq!(counts[0].xor, 5 * 4 + 4 * PAYLOAD_LEN);
    }

    #[test]
    fn test_empty_database_gives_zeros() {
        let server = LookupServer::new(ClearGates);
        let database = Database::new(vec![], LEN, PAYLOAD_LEN).unwrap();
        let query = PositionQuery::new(fixed(1.0), fixed(1.0)).unwrap();

        for context in contexts() {
            assert_eq!(
                server.range_lookup(&query, &database, &context).unwrap(),
                payload(0)
            );
        }
    }

    #[test]
    fn test_lookup_errors_are_strategy_independent() {
        let server = LookupServer::new(GateCounter::new(ClearGates));
        let database = diagonal_database(3);

        let short_query = PositionQuery::new(
            BitVector::new(vec![false; LEN - 1]),
            BitVector::new(vec![false; LEN - 1]),
        )
        .unwrap();
        let point_query = PositionQuery::new(fixed(0.0), fixed(0.0)).unwrap();

        for context in contexts() {
            let err = server
                .range_lookup(&short_query, &database, &context)
                .unwrap_err();
            assert_eq!(
                err.kind(),
                &ErrorKind::LengthMismatch {
                    expected: LEN,
                    found: LEN - 1
                }
            );

            let err = server
                .point_lookup(&point_query, &database, &context)
                .unwrap_err();
            assert_eq!(
                err.kind(),
                &ErrorKind::IncompatibleLocation {
                    expected: LocationKind::Point,
                    found: LocationKind::Area
                }
            );
        }
        assert_eq!(server.gates().count().total(), 0);
    }
}
