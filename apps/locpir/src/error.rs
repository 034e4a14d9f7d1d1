use crate::ciphertext::LocationKind;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ErrorKind {
    Message(String),
    /// Two operands of the same circuit do not have the same number of bits
    LengthMismatch { expected: usize, found: usize },
    /// The operand is shorter than what the circuit needs (e.g. a signed comparison needs a
    /// sign bit and at least one magnitude bit)
    OperandTooShort { minimum: usize, found: usize },
    /// An operand of a masking or a reduction step holds no bits at all
    MissingOperand { index: usize },
    /// The operand at `index` of a masking or a reduction step does not have the expected length
    OperandLengthMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },
    /// A field of the record at `index` does not have the length declared by the database
    RecordLengthMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },
    /// The record at `index` does not describe the same kind of location as the first record
    MixedLocationKinds { index: usize },
    /// The lookup predicate cannot be evaluated against the locations stored in the database
    IncompatibleLocation {
        expected: LocationKind,
        found: LocationKind,
    },
    /// Thread pools need at least one worker
    InvalidThreadCount,
    /// The selected strategy offloads circuits but no accelerator was configured
    AcceleratorRequired,
    /// A clear value cannot be represented with the requested encoding
    InvalidEncoding(String),
}

#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    pub(crate) fn new(message: String) -> Self {
        Self::from(ErrorKind::Message(message))
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.kind() {
            ErrorKind::Message(msg) => write!(f, "{msg}"),
            ErrorKind::LengthMismatch { expected, found } => {
                write!(f, "Operand length mismatch: expected {expected} bits, got {found}")
            }
            ErrorKind::OperandTooShort { minimum, found } => {
                write!(f, "Operand too short: at least {minimum} bits are needed, got {found}")
            }
            ErrorKind::MissingOperand { index } => {
                write!(f, "Missing operand at index {index}")
            }
            ErrorKind::OperandLengthMismatch {
                index,
                expected,
                found,
            } => write!(
                f,
                "Operand {index} has {found} bits where {expected} bits were expected"
            ),
            ErrorKind::RecordLengthMismatch {
                index,
                expected,
                found,
            } => write!(
                f,
                "Record {index} has a field of {found} bits where {expected} bits were expected"
            ),
            ErrorKind::MixedLocationKinds { index } => write!(
                f,
                "Record {index} does not store the same kind of location as the previous records"
            ),
            ErrorKind::IncompatibleLocation { expected, found } => write!(
                f,
                "The lookup expects {expected:?} locations but the database stores {found:?} locations"
            ),
            ErrorKind::InvalidThreadCount => {
                write!(f, "The number of threads must be strictly positive")
            }
            ErrorKind::AcceleratorRequired => write!(
                f,
                "The selected execution strategy requires an accelerator configuration"
            ),
            ErrorKind::InvalidEncoding(msg) => write!(f, "Invalid encoding: {msg}"),
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self { kind }
    }
}

impl<'a> From<&'a str> for Error {
    fn from(message: &'a str) -> Self {
        Self::new(message.to_string())
    }
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// Returns an error if `found` is not `expected`
pub(crate) fn check_length(expected: usize, found: usize) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(ErrorKind::LengthMismatch { expected, found }.into())
    }
}
