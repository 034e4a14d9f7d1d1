//! Clear datasets read from CSV files.
//!
//! Every file starts with a header line and every row with a label column which is not stored.
//! The remaining columns depend on the kind of location:
//!
//! | kind         | columns                                         |
//! |--------------|-------------------------------------------------|
//! | `Area`       | label, left_x, right_x, left_y, right_y, payload |
//! | `Point`      | label, x, y, payload                            |
//! | `Identifier` | label, code, payload                            |
//!
//! Identifier rows are numbered in file order, the code column is kept as a label only. Cells are
//! trimmed and payload texts may be quoted.

use super::{PlainLocation, PlainPayload, PlainRecord};
use crate::ciphertext::LocationKind;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::fmt::{Display, Formatter};
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

/// How the payload column of a dataset is encoded into bits
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    #[default]
    Text,
    Value,
}

impl PayloadKind {
    pub const ALL: [Self; 2] = [Self::Text, Self::Value];

    pub fn name(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Value => "value",
        }
    }

    fn parse(self, cell: String) -> Result<PlainPayload> {
        match self {
            Self::Text => Ok(PlainPayload::Text(cell)),
            Self::Value => cell
                .parse()
                .map(PlainPayload::Value)
                .map_err(|err| Error::new(format!("Invalid payload value `{cell}`: {err}"))),
        }
    }
}

impl Display for PayloadKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for PayloadKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| {
                Error::new(format!(
                    "Unknown payload kind `{s}`, expected one of: {}",
                    Self::ALL.map(Self::name).join(", ")
                ))
            })
    }
}

#[derive(Deserialize)]
struct AreaRow {
    _label: String,
    left_x: f64,
    right_x: f64,
    left_y: f64,
    right_y: f64,
    payload: String,
}

#[derive(Deserialize)]
struct PointRow {
    _label: String,
    x: f64,
    y: f64,
    payload: String,
}

#[derive(Deserialize)]
struct IdentifierRow {
    _label: String,
    _code: String,
    payload: String,
}

/// Reads the rows of a dataset of `kind` locations
pub fn load_dataset<R: Read>(
    reader: R,
    kind: LocationKind,
    payload: PayloadKind,
) -> Result<Vec<PlainRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    reader
        .records()
        .enumerate()
        .map(|(index, row)| {
            let row = row.map_err(|err| Error::new(format!("Cannot read row {index}: {err}")))?;
            let invalid = |err: csv::Error| Error::new(format!("Invalid row {index}: {err}"));

            Ok(match kind {
                LocationKind::Area => {
                    let row: AreaRow = row.deserialize(None).map_err(invalid)?;
                    PlainRecord {
                        location: PlainLocation::Area {
                            left_x: row.left_x,
                            right_x: row.right_x,
                            left_y: row.left_y,
                            right_y: row.right_y,
                        },
                        payload: payload.parse(row.payload)?,
                    }
                }
                LocationKind::Point => {
                    let row: PointRow = row.deserialize(None).map_err(invalid)?;
                    PlainRecord {
                        location: PlainLocation::Point { x: row.x, y: row.y },
                        payload: payload.parse(row.payload)?,
                    }
                }
                LocationKind::Identifier => {
                    let row: IdentifierRow = row.deserialize(None).map_err(invalid)?;
                    PlainRecord {
                        location: PlainLocation::Identifier(index as u64),
                        payload: payload.parse(row.payload)?,
                    }
                }
            })
        })
        .collect()
}

pub fn load_dataset_from_path<P: AsRef<Path>>(
    path: P,
    kind: LocationKind,
    payload: PayloadKind,
) -> Result<Vec<PlainRecord>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .map_err(|err| Error::new(format!("Cannot open `{}`: {err}", path.display())))?;
    load_dataset(std::io::BufReader::new(file), kind, payload)
}
