//! Client side of the lookup protocol: encodes and encrypts databases and queries, decrypts and
//! decodes answers.

pub mod dataset;
pub mod encoding;

use crate::ciphertext::{Area, BitVector, Database, Location, PositionQuery, Record};
use crate::error::{ErrorKind, Result};
use crate::gates::BitEncryptor;
pub use dataset::PayloadKind;
use encoding::{
    bits_of, decode_fixed_point, decode_text, decode_unsigned, encode_fixed_point,
    encode_text, encode_unsigned,
};
use serde::{Deserialize, Serialize};

/// A clear location, coordinates are real numbers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PlainLocation {
    Area {
        left_x: f64,
        right_x: f64,
        left_y: f64,
        right_y: f64,
    },
    Point {
        x: f64,
        y: f64,
    },
    Identifier(u64),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlainPayload {
    Text(String),
    Value(u64),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlainRecord {
    pub location: PlainLocation,
    pub payload: PlainPayload,
}

/// Holds the secret key and the bit lengths shared with the server.
///
/// Coordinates are fixed-point numbers of `location_len` bits, identifiers unsigned integers of
/// `location_len` bits and payloads either texts or unsigned integers of `payload_len` bits.
pub struct LookupClient<K> {
    key: K,
    location_len: usize,
    payload_len: usize,
}

impl<K: BitEncryptor> LookupClient<K> {
    pub fn new(key: K, location_len: usize, payload_len: usize) -> Result<Self> {
        if location_len == 0 {
            return Err(ErrorKind::OperandTooShort {
                minimum: 1,
                found: 0,
            }
            .into());
        }
        if payload_len == 0 {
            return Err(ErrorKind::OperandTooShort {
                minimum: 1,
                found: 0,
            }
            .into());
        }

        Ok(Self {
            key,
            location_len,
            payload_len,
        })
    }

    pub fn location_len(&self) -> usize {
        self.location_len
    }

    pub fn payload_len(&self) -> usize {
        self.payload_len
    }

    pub fn encrypt_bits(&self, bits: &[bool]) -> BitVector<K::Bit> {
        bits.iter().map(|bit| self.key.encrypt_bit(*bit)).collect()
    }

    pub fn encrypt_coordinate(&self, value: f64) -> Result<BitVector<K::Bit>> {
        let encoded = encode_fixed_point(value, self.location_len)?;
        Ok(self.encrypt_bits(&bits_of(encoded, self.location_len)))
    }

    /// Query for range and point lookups
    pub fn encrypt_position(&self, x: f64, y: f64) -> Result<PositionQuery<K::Bit>> {
        PositionQuery::new(self.encrypt_coordinate(x)?, self.encrypt_coordinate(y)?)
    }

    /// Query for identifier lookups
    pub fn encrypt_identifier(&self, id: u64) -> Result<BitVector<K::Bit>> {
        Ok(self.encrypt_bits(&encode_unsigned(id, self.location_len)?))
    }

    pub fn encrypt_text(&self, text: &str) -> BitVector<K::Bit> {
        self.encrypt_bits(&encode_text(text, self.payload_len))
    }

    pub fn encrypt_value(&self, value: u64) -> Result<BitVector<K::Bit>> {
        Ok(self.encrypt_bits(&encode_unsigned(value, self.payload_len)?))
    }

    pub fn encrypt_location(&self, location: &PlainLocation) -> Result<Location<K::Bit>> {
        Ok(match location {
            PlainLocation::Area {
                left_x,
                right_x,
                left_y,
                right_y,
            } => Location::Area(Area {
                left_x: self.encrypt_coordinate(*left_x)?,
                right_x: self.encrypt_coordinate(*right_x)?,
                left_y: self.encrypt_coordinate(*left_y)?,
                right_y: self.encrypt_coordinate(*right_y)?,
            }),
            PlainLocation::Point { x, y } => Location::Point {
                x: self.encrypt_coordinate(*x)?,
                y: self.encrypt_coordinate(*y)?,
            },
            PlainLocation::Identifier(id) => Location::Identifier(self.encrypt_identifier(*id)?),
        })
    }

    pub fn encrypt_payload(&self, payload: &PlainPayload) -> Result<BitVector<K::Bit>> {
        match payload {
            PlainPayload::Text(text) => Ok(self.encrypt_text(text)),
            PlainPayload::Value(value) => self.encrypt_value(*value),
        }
    }

    pub fn encrypt_record(&self, record: &PlainRecord) -> Result<Record<K::Bit>> {
        Ok(Record {
            location: self.encrypt_location(&record.location)?,
            payload: self.encrypt_payload(&record.payload)?,
        })
    }

    pub fn encrypt_database(&self, records: &[PlainRecord]) -> Result<Database<K::Bit>> {
        let records = records
            .iter()
            .map(|record| self.encrypt_record(record))
            .collect::<Result<Vec<_>>>()?;
        Database::new(records, self.location_len, self.payload_len)
    }

    pub fn decrypt_bit(&self, bit: &K::Bit) -> bool {
        self.key.decrypt_bit(bit)
    }

    pub fn decrypt_bits(&self, bits: &BitVector<K::Bit>) -> Vec<bool> {
        bits.iter().map(|bit| self.key.decrypt_bit(bit)).collect()
    }

    pub fn decrypt_coordinate(&self, bits: &BitVector<K::Bit>) -> Result<f64> {
        decode_fixed_point(&self.decrypt_bits(bits))
    }

    pub fn decrypt_text(&self, bits: &BitVector<K::Bit>) -> Result<String> {
        decode_text(&self.decrypt_bits(bits))
    }

    pub fn decrypt_value(&self, bits: &BitVector<K::Bit>) -> Result<u64> {
        decode_unsigned(&self.decrypt_bits(bits))
    }

    pub fn decrypt_payload(
        &self,
        bits: &BitVector<K::Bit>,
        kind: PayloadKind,
    ) -> Result<PlainPayload> {
        Ok(match kind {
            PayloadKind::Text => PlainPayload::Text(self.decrypt_text(bits)?),
            PayloadKind::Value => PlainPayload::Value(self.decrypt_value(bits)?),
        })
    }

    pub fn decrypt_location(&self, location: &Location<K::Bit>) -> Result<PlainLocation> {
        Ok(match location {
            Location::Area(area) => PlainLocation::Area {
                left_x: self.decrypt_coordinate(&area.left_x)?,
                right_x: self.decrypt_coordinate(&area.right_x)?,
                left_y: self.decrypt_coordinate(&area.left_y)?,
                right_y: self.decrypt_coordinate(&area.right_y)?,
            },
            Location::Point { x, y } => PlainLocation::Point {
                x: self.decrypt_coordinate(x)?,
                y: self.decrypt_coordinate(y)?,
            },
            Location::Identifier(id) => PlainLocation::Identifier(self.decrypt_value(id)?),
        })
    }

    pub fn decrypt_record(
        &self,
        record: &Record<K::Bit>,
        payload: PayloadKind,
    ) -> Result<PlainRecord> {
        Ok(PlainRecord {
            location: self.decrypt_location(&record.location)?,
            payload: self.decrypt_payload(&record.payload, payload)?,
        })
    }

    /// Decrypts every record, coordinates come back rounded to the fixed-point precision and
    /// texts truncated to the payload length.
    pub fn decrypt_database(
        &self,
        database: &Database<K::Bit>,
        payload: PayloadKind,
    ) -> Result<Vec<PlainRecord>> {
        database
            .records()
            .iter()
            .map(|record| self.decrypt_record(record, payload))
            .collect()
    }
}
