//! Boolean gate providers.
//!
//! Every circuit of this crate is written against [`BooleanGates`], the set of elementary gates
//! the lookup protocol needs. The main implementation is the TFHE boolean
//! [`ServerKey`], which evaluates each gate with a bootstrapping. [`ClearGates`] evaluates the
//! very same circuits on `bool`s.

use std::sync::atomic::{AtomicUsize, Ordering};
use tfhe::boolean::ciphertext::Ciphertext;
use tfhe::boolean::client_key::ClientKey;
use tfhe::boolean::server_key::{BinaryBooleanGates, ServerKey};

/// The elementary gates used by the lookup circuits.
///
/// Implementations must be usable from several threads at once, as independent gates of a
/// circuit are evaluated concurrently.
pub trait BooleanGates: Sync {
    type Bit: Clone + Send + Sync;

    fn and(&self, lhs: &Self::Bit, rhs: &Self::Bit) -> Self::Bit;

    fn xor(&self, lhs: &Self::Bit, rhs: &Self::Bit) -> Self::Bit;

    fn xnor(&self, lhs: &Self::Bit, rhs: &Self::Bit) -> Self::Bit;

    /// Returns `then` if `condition` is true, `otherwise` if not
    fn mux(&self, condition: &Self::Bit, then: &Self::Bit, otherwise: &Self::Bit) -> Self::Bit;

    fn copy(&self, bit: &Self::Bit) -> Self::Bit {
        bit.clone()
    }

    /// A bit with a publicly known value
    fn constant(&self, value: bool) -> Self::Bit;
}

impl BooleanGates for ServerKey {
    type Bit = Ciphertext;

    fn and(&self, lhs: &Ciphertext, rhs: &Ciphertext) -> Ciphertext {
        <Self as BinaryBooleanGates<&Ciphertext, &Ciphertext>>::and(self, lhs, rhs)
    }

    fn xor(&self, lhs: &Ciphertext, rhs: &Ciphertext) -> Ciphertext {
        <Self as BinaryBooleanGates<&Ciphertext, &Ciphertext>>::xor(self, lhs, rhs)
    }

    fn xnor(&self, lhs: &Ciphertext, rhs: &Ciphertext) -> Ciphertext {
        <Self as BinaryBooleanGates<&Ciphertext, &Ciphertext>>::xnor(self, lhs, rhs)
    }

    fn mux(&self, condition: &Ciphertext, then: &Ciphertext, otherwise: &Ciphertext) -> Ciphertext {
        ServerKey::mux(self, condition, then, otherwise)
    }

    fn constant(&self, value: bool) -> Ciphertext {
        self.trivial_encrypt(value)
    }
}

impl<G: BooleanGates + ?Sized> BooleanGates for &G {
    type Bit = G::Bit;

    fn and(&self, lhs: &Self::Bit, rhs: &Self::Bit) -> Self::Bit {
        (**self).and(lhs, rhs)
    }

    fn xor(&self, lhs: &Self::Bit, rhs: &Self::Bit) -> Self::Bit {
        (**self).xor(lhs, rhs)
    }

    fn xnor(&self, lhs: &Self::Bit, rhs: &Self::Bit) -> Self::Bit {
        (**self).xnor(lhs, rhs)
    }

    fn mux(&self, condition: &Self::Bit, then: &Self::Bit, otherwise: &Self::Bit) -> Self::Bit {
        (**self).mux(condition, then, otherwise)
    }

    fn copy(&self, bit: &Self::Bit) -> Self::Bit {
        (**self).copy(bit)
    }

    fn constant(&self, value: bool) -> Self::Bit {
        (**self).constant(value)
    }
}

/// Evaluates the gates on clear booleans.
///
/// Running a circuit with `ClearGates` gives the value its encrypted evaluation decrypts to.
#[derive(Copy, Clone, Debug, Default)]
pub struct ClearGates;

impl BooleanGates for ClearGates {
    type Bit = bool;

    fn and(&self, lhs: &bool, rhs: &bool) -> bool {
        *lhs & *rhs
    }

    fn xor(&self, lhs: &bool, rhs: &bool) -> bool {
        *lhs ^ *rhs
    }

    fn xnor(&self, lhs: &bool, rhs: &bool) -> bool {
        !(*lhs ^ *rhs)
    }

    fn mux(&self, condition: &bool, then: &bool, otherwise: &bool) -> bool {
        if *condition {
            *then
        } else {
            *otherwise
        }
    }

    fn constant(&self, value: bool) -> bool {
        value
    }
}

/// Client side counterpart of a gate provider: turns clear bits into bits the provider works on
/// and back.
pub trait BitEncryptor {
    type Bit;

    fn encrypt_bit(&self, value: bool) -> Self::Bit;

    fn decrypt_bit(&self, bit: &Self::Bit) -> bool;
}

impl BitEncryptor for ClientKey {
    type Bit = Ciphertext;

    fn encrypt_bit(&self, value: bool) -> Ciphertext {
        self.encrypt(value)
    }

    fn decrypt_bit(&self, bit: &Ciphertext) -> bool {
        self.decrypt(bit)
    }
}

impl BitEncryptor for ClearGates {
    type Bit = bool;

    fn encrypt_bit(&self, value: bool) -> bool {
        value
    }

    fn decrypt_bit(&self, bit: &bool) -> bool {
        *bit
    }
}

/// Number of gates evaluated by a [`GateCounter`], per gate kind
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct GateCount {
    pub and: usize,
    pub xor: usize,
    pub xnor: usize,
    pub mux: usize,
    pub copy: usize,
    pub constant: usize,
}

impl GateCount {
    /// Gates that need a bootstrapping when evaluated under TFHE
    pub fn bootstrapped(&self) -> usize {
        self.and + self.xor + self.xnor + self.mux
    }

    pub fn total(&self) -> usize {
        self.bootstrapped() + self.copy + self.constant
    }
}

/// Wraps a gate provider and counts the gates it evaluates.
#[derive(Debug, Default)]
pub struct GateCounter<G> {
    inner: G,
    and: AtomicUsize,
    xor: AtomicUsize,
    xnor: AtomicUsize,
    mux: AtomicUsize,
    copy: AtomicUsize,
    constant: AtomicUsize,
}

impl<G> GateCounter<G> {
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            and: AtomicUsize::new(0),
            xor: AtomicUsize::new(0),
            xnor: AtomicUsize::new(0),
            mux: AtomicUsize::new(0),
            copy: AtomicUsize::new(0),
            constant: AtomicUsize::new(0),
        }
    }

    pub fn count(&self) -> GateCount {
        GateCount {
            and: self.and.load(Ordering::Relaxed),
            xor: self.xor.load(Ordering::Relaxed),
            xnor: self.xnor.load(Ordering::Relaxed),
            mux: self.mux.load(Ordering::Relaxed),
            copy: self.copy.load(Ordering::Relaxed),
            constant: self.constant.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.and,
            &self.xor,
            &self.xnor,
            &self.mux,
            &self.copy,
            &self.constant,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl<G: BooleanGates> BooleanGates for GateCounter<G> {
    type Bit = G::Bit;

    fn and(&self, lhs: &Self::Bit, rhs: &Self::Bit) -> Self::Bit {
        self.and.fetch_add(1, Ordering::Relaxed);
        self.inner.and(lhs, rhs)
    }

    fn xor(&self, lhs: &Self::Bit, rhs: &Self::Bit) -> Self::Bit {
        self.xor.fetch_add(1, Ordering::Relaxed);
        self.inner.xor(lhs, rhs)
    }

    fn xnor(&self, lhs: &Self::Bit, rhs: &Self::Bit) -> Self::Bit {
        self.xnor.fetch_add(1, Ordering::Relaxed);
        self.inner.xnor(lhs, rhs)
    }

    fn mux(&self, condition: &Self::Bit, then: &Self::Bit, otherwise: &Self::Bit) -> Self::Bit {
        self.mux.fetch_add(1, Ordering::Relaxed);
        self.inner.mux(condition, then, otherwise)
    }

    fn copy(&self, bit: &Self::Bit) -> Self::Bit {
        self.copy.fetch_add(1, Ordering::Relaxed);
        self.inner.copy(bit)
    }

    fn constant(&self, value: bool) -> Self::Bit {
        self.constant.fetch_add(1, Ordering::Relaxed);
        self.inner.constant(value)
    }
}
