//! Values the lookup protocol works on: bit vectors, locations, records and databases.
//!
//! Every type is generic over the bit type `B`, which is a TFHE boolean ciphertext for
//! encrypted data and a `bool` for clear data.

use crate::error::{check_length, Error, ErrorKind, Result};
use serde::{Deserialize, Serialize};
use std::ops::Index;
use tfhe::boolean::ciphertext::Ciphertext;

/// An owned, fixed length sequence of bits, least significant bit first.
///
/// When the vector holds a signed fixed-point number the last bit is the sign bit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitVector<B> {
    bits: Vec<B>,
}

pub type EncryptedBitVector = BitVector<Ciphertext>;

impl<B> BitVector<B> {
    pub fn new(bits: Vec<B>) -> Self {
        Self { bits }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, B> {
        self.bits.iter()
    }

    pub fn as_slice(&self) -> &[B] {
        &self.bits
    }

    pub fn into_inner(self) -> Vec<B> {
        self.bits
    }
}

impl<B> Default for BitVector<B> {
    fn default() -> Self {
        Self { bits: Vec::new() }
    }
}

impl<B> AsRef<[B]> for BitVector<B> {
    fn as_ref(&self) -> &[B] {
        &self.bits
    }
}

impl<B> Index<usize> for BitVector<B> {
    type Output = B;

    fn index(&self, index: usize) -> &B {
        &self.bits[index]
    }
}

impl<B> From<Vec<B>> for BitVector<B> {
    fn from(bits: Vec<B>) -> Self {
        Self::new(bits)
    }
}

impl<B> FromIterator<B> for BitVector<B> {
    fn from_iter<I: IntoIterator<Item = B>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<B> IntoIterator for BitVector<B> {
    type Item = B;
    type IntoIter = std::vec::IntoIter<B>;

    fn into_iter(self) -> Self::IntoIter {
        self.bits.into_iter()
    }
}

impl<'a, B> IntoIterator for &'a BitVector<B> {
    type Item = &'a B;
    type IntoIter = std::slice::Iter<'a, B>;

    fn into_iter(self) -> Self::IntoIter {
        self.bits.iter()
    }
}

/// A rectangle, `left_x <= x < right_x` and `left_y <= y < right_y`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area<B> {
    pub left_x: BitVector<B>,
    pub right_x: BitVector<B>,
    pub left_y: BitVector<B>,
    pub right_y: BitVector<B>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocationKind {
    Area,
    Point,
    Identifier,
}

/// The location a record is stored under
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Location<B> {
    Area(Area<B>),
    Point { x: BitVector<B>, y: BitVector<B> },
    Identifier(BitVector<B>),
}

impl<B> Location<B> {
    pub fn kind(&self) -> LocationKind {
        match self {
            Self::Area(_) => LocationKind::Area,
            Self::Point { .. } => LocationKind::Point,
            Self::Identifier(_) => LocationKind::Identifier,
        }
    }

    fn fields(&self) -> Vec<&BitVector<B>> {
        match self {
            Self::Area(area) => vec![&area.left_x, &area.right_x, &area.left_y, &area.right_y],
            Self::Point { x, y } => vec![x, y],
            Self::Identifier(id) => vec![id],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record<B> {
    pub location: Location<B>,
    pub payload: BitVector<B>,
}

#[derive(Deserialize)]
struct RawDatabase<B> {
    records: Vec<Record<B>>,
    location_len: usize,
    payload_len: usize,
}

/// The records a server looks up, all sharing one location kind, one location field length and
/// one payload length.
///
/// The database is read only once built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "RawDatabase<B>",
    bound(deserialize = "B: Deserialize<'de>")
)]
pub struct Database<B> {
    records: Vec<Record<B>>,
    location_len: usize,
    payload_len: usize,
}

impl<B> Database<B> {
    /// Checks the records in index order and reports the first malformed one.
    pub fn new(records: Vec<Record<B>>, location_len: usize, payload_len: usize) -> Result<Self> {
        let kind = records.first().map(|record| record.location.kind());

        for (index, record) in records.iter().enumerate() {
            if Some(record.location.kind()) != kind {
                return Err(ErrorKind::MixedLocationKinds { index }.into());
            }

            for field in record.location.fields() {
                check_record_field(index, location_len, field.len())?;
            }

            if record.payload.is_empty() {
                return Err(ErrorKind::MissingOperand { index }.into());
            }
            check_record_field(index, payload_len, record.payload.len())?;
        }

        Ok(Self {
            records,
            location_len,
            payload_len,
        })
    }

    /// Kind of the stored locations, `None` for an empty database
    pub fn kind(&self) -> Option<LocationKind> {
        self.records.first().map(|record| record.location.kind())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record<B>] {
        &self.records
    }

    pub fn location_len(&self) -> usize {
        self.location_len
    }

    pub fn payload_len(&self) -> usize {
        self.payload_len
    }
}

fn check_record_field(index: usize, expected: usize, found: usize) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(ErrorKind::RecordLengthMismatch {
            index,
            expected,
            found,
        }
        .into())
    }
}

impl<B> TryFrom<RawDatabase<B>> for Database<B> {
    type Error = Error;

    fn try_from(raw: RawDatabase<B>) -> Result<Self> {
        Self::new(raw.records, raw.location_len, raw.payload_len)
    }
}

/// A position to look up, either inside areas or against exact points
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionQuery<B> {
    pub x: BitVector<B>,
    pub y: BitVector<B>,
}

impl<B> PositionQuery<B> {
    pub fn new(x: BitVector<B>, y: BitVector<B>) -> Result<Self> {
        check_length(x.len(), y.len())?;
        Ok(Self { x, y })
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}
