//! Private location lookups over TFHE boolean circuits.
//!
//! A client encrypts a database of records, each one stored under an area, a point or an
//! identifier, together with a payload. Given an encrypted position or identifier, the server
//! evaluates a match predicate against every record, masks every payload with its predicate and
//! XORs all of them together. The client decrypts the payload of the matching record, or zeros
//! when nothing matched, while the server learns neither the query nor which record matched.
//!
//! ```rust,no_run
//! use tfhe::boolean::gen_keys;
//! use tfhe_locpir::{
//!     ExecutionConfig, ExecutionContext, ExecutionStrategy, LookupClient, LookupServer,
//!     PlainLocation, PlainPayload, PlainRecord,
//! };
//!
//! let (cks, sks) = gen_keys();
//! let client = LookupClient::new(cks, 16, 64).unwrap();
//! let database = client
//!     .encrypt_database(&[PlainRecord {
//!         location: PlainLocation::Area {
//!             left_x: 1.0,
//!             right_x: 3.0,
//!             left_y: 2.0,
//!             right_y: 4.0,
//!         },
//!         payload: PlainPayload::Text("station".to_string()),
//!     }])
//!     .unwrap();
//!
//! let context = ExecutionContext::new(
//!     ExecutionConfig::new(ExecutionStrategy::ParallelRecords).with_threads(8),
//! )
//! .unwrap();
//! let server = LookupServer::new(sks);
//! let query = client.encrypt_position(2.5, 3.5).unwrap();
//! let answer = server.range_lookup(&query, &database, &context).unwrap();
//!
//! assert_eq!(client.decrypt_text(&answer).unwrap(), "station");
//! ```

pub mod backend;
pub mod ciphertext;
pub mod circuits;
pub mod client;
pub mod error;
pub mod gates;
pub mod server;
pub mod strategy;

pub use backend::{AcceleratorConfig, AcceleratorDevice, Backend, Scheduler};
pub use ciphertext::{
    Area, BitVector, Database, EncryptedBitVector, Location, LocationKind, PositionQuery, Record,
};
pub use client::{LookupClient, PayloadKind, PlainLocation, PlainPayload, PlainRecord};
pub use error::{Error, ErrorKind, Result};
pub use gates::{BitEncryptor, BooleanGates, ClearGates, GateCount, GateCounter};
pub use server::LookupServer;
pub use strategy::{ExecutionConfig, ExecutionContext, ExecutionPlan, ExecutionStrategy};
