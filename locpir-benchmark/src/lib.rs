//! Synthetic workloads shared by the lookup benchmarks and the timing driver.

use rand::Rng;
use rayon::prelude::*;
use tfhe_locpir::client::encoding::{identifier_len, text_payload_len};
use tfhe_locpir::{
    BitEncryptor, BitVector, BooleanGates, Database, Error, ExecutionContext, LocationKind,
    LookupClient, LookupServer, PayloadKind, PlainLocation, PlainPayload, PlainRecord, Result,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum PredicateKind {
    /// Position inside one of the stored areas
    Area,
    /// Position equal to one of the stored points
    Point,
    /// Identifier equal to one of the stored identifiers
    Identifier,
}

impl From<PredicateKind> for LocationKind {
    fn from(kind: PredicateKind) -> Self {
        match kind {
            PredicateKind::Area => Self::Area,
            PredicateKind::Point => Self::Point,
            PredicateKind::Identifier => Self::Identifier,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PlainQuery {
    Position { x: f64, y: f64 },
    Identifier(u64),
}

/// A one-hot database and a query matching exactly one of its records
#[derive(Clone, Debug)]
pub struct Workload {
    pub kind: PredicateKind,
    pub records: Vec<PlainRecord>,
    pub query: PlainQuery,
    /// Index of the record matching the query
    pub expected: usize,
}

impl Workload {
    pub fn expected_payload(&self) -> &PlainPayload {
        &self.records[self.expected].payload
    }

    pub fn payload_kind(&self) -> PayloadKind {
        match self.expected_payload() {
            PlainPayload::Text(_) => PayloadKind::Text,
            PlainPayload::Value(_) => PayloadKind::Value,
        }
    }
}

/// Queries the record at a random index of a loaded dataset: the center of an area, the point
/// itself or the identifier.
///
/// The dataset must be one-hot for that query, overlapping areas or duplicated points give the
/// XOR of the matching payloads.
pub fn dataset_workload<R: Rng>(
    kind: PredicateKind,
    records: Vec<PlainRecord>,
    rng: &mut R,
) -> Result<Workload> {
    if records.is_empty() {
        return Err(Error::from("A workload needs at least one record"));
    }

    let expected = rng.gen_range(0..records.len());
    let query = match (kind, &records[expected].location) {
        (
            PredicateKind::Area,
            PlainLocation::Area {
                left_x,
                right_x,
                left_y,
                right_y,
            },
        ) => PlainQuery::Position {
            x: (left_x + right_x) / 2.0,
            y: (left_y + right_y) / 2.0,
        },
        (PredicateKind::Point, PlainLocation::Point { x, y }) => {
            PlainQuery::Position { x: *x, y: *y }
        }
        (PredicateKind::Identifier, PlainLocation::Identifier(id)) => PlainQuery::Identifier(*id),
        (_, location) => {
            return Err(Error::from(format!(
                "Record {expected} does not fit a {kind:?} lookup: {location:?}"
            )))
        }
    };

    Ok(Workload {
        kind,
        records,
        query,
        expected,
    })
}

/// Records are laid out on a square grid of unit cells centered on the origin. Areas are the
/// cells, points their lower left corners and identifiers the record indices.
pub fn synthetic_workload<R: Rng>(
    kind: PredicateKind,
    count: usize,
    location_len: usize,
    payload_len: usize,
    rng: &mut R,
) -> Result<Workload> {
    if count == 0 {
        return Err(Error::from("A workload needs at least one record"));
    }
    if payload_len == 0 || payload_len > 64 {
        return Err(Error::from(format!(
            "Payloads are drawn as integers of 1 to 64 bits, got {payload_len} bits"
        )));
    }

    let side = (count as f64).sqrt().ceil() as usize;
    let half = (side / 2) as f64 + 1.0;
    let range = 2f64.powi((location_len / 2) as i32);
    match kind {
        PredicateKind::Area | PredicateKind::Point if half >= range => {
            return Err(Error::from(format!(
                "{count} records do not fit in coordinates of {location_len} bits"
            )));
        }
        PredicateKind::Identifier if identifier_len(count) > location_len => {
            return Err(Error::from(format!(
                "{count} identifiers do not fit in {location_len} bits"
            )));
        }
        _ => {}
    }

    let corner = |index: usize| {
        (
            (index % side) as f64 - (side / 2) as f64,
            (index / side) as f64 - (side / 2) as f64,
        )
    };

    let records = (0..count)
        .map(|index| {
            let (x, y) = corner(index);
            let location = match kind {
                PredicateKind::Area => PlainLocation::Area {
                    left_x: x,
                    right_x: x + 1.0,
                    left_y: y,
                    right_y: y + 1.0,
                },
                PredicateKind::Point => PlainLocation::Point { x, y },
                PredicateKind::Identifier => PlainLocation::Identifier(index as u64),
            };
            let payload = (rng.gen::<u64>() >> (64 - payload_len)) | 1;
            PlainRecord {
                location,
                payload: PlainPayload::Value(payload),
            }
        })
        .collect();

    let expected = rng.gen_range(0..count);
    let (x, y) = corner(expected);
    let query = match kind {
        PredicateKind::Area => PlainQuery::Position {
            x: x + 0.5,
            y: y + 0.5,
        },
        PredicateKind::Point => PlainQuery::Position { x, y },
        PredicateKind::Identifier => PlainQuery::Identifier(expected as u64),
    };

    Ok(Workload {
        kind,
        records,
        query,
        expected,
    })
}

/// Payload bits of a loaded dataset: the longest text for text payloads, `value_len` otherwise
pub fn dataset_payload_len(records: &[PlainRecord], kind: PayloadKind, value_len: usize) -> usize {
    match kind {
        PayloadKind::Text => {
            let texts: Vec<&str> = records
                .iter()
                .filter_map(|record| match &record.payload {
                    PlainPayload::Text(text) => Some(text.as_str()),
                    PlainPayload::Value(_) => None,
                })
                .collect();
            text_payload_len(&texts).max(8)
        }
        PayloadKind::Value => value_len,
    }
}

/// Encrypts the records of a workload, spread over the global rayon pool
pub fn encrypt_workload<K>(client: &LookupClient<K>, workload: &Workload) -> Result<Database<K::Bit>>
where
    K: BitEncryptor + Sync,
    K::Bit: Send,
{
    let records = workload
        .records
        .par_iter()
        .map(|record| client.encrypt_record(record))
        .collect::<Result<Vec<_>>>()?;
    Database::new(records, client.location_len(), client.payload_len())
}

pub enum EncryptedQuery<B> {
    Position(tfhe_locpir::PositionQuery<B>),
    Identifier(BitVector<B>),
}

pub fn encrypt_query<K: BitEncryptor>(
    client: &LookupClient<K>,
    query: &PlainQuery,
) -> Result<EncryptedQuery<K::Bit>> {
    Ok(match query {
        PlainQuery::Position { x, y } => EncryptedQuery::Position(client.encrypt_position(*x, *y)?),
        PlainQuery::Identifier(id) => EncryptedQuery::Identifier(client.encrypt_identifier(*id)?),
    })
}

/// Runs the lookup matching the workload predicate
pub fn run_lookup<G: BooleanGates>(
    server: &LookupServer<G>,
    kind: PredicateKind,
    query: &EncryptedQuery<G::Bit>,
    database: &Database<G::Bit>,
    context: &ExecutionContext,
) -> Result<BitVector<G::Bit>> {
    match (kind, query) {
        (PredicateKind::Area, EncryptedQuery::Position(query)) => {
            server.range_lookup(query, database, context)
        }
        (PredicateKind::Point, EncryptedQuery::Position(query)) => {
            server.point_lookup(query, database, context)
        }
        (PredicateKind::Identifier, EncryptedQuery::Identifier(query)) => {
            server.identifier_lookup(query, database, context)
        }
        _ => Err(Error::from(format!(
            "The query does not fit a {kind:?} lookup"
        ))),
    }
}
