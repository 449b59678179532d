// Oracle capabilities consumed by the attacks, and the query budget used to
// bound them.
//
// The attacks never see a key. Everything they learn comes through one of
// the traits below, each of which is also implemented for plain closures so
// callers can wire a victim in with `|c: &[u8]| victim.check(c)`.

use std::sync::atomic::{AtomicU64, Ordering};

use num_bigint::BigUint;

use crate::{AttackError, Result};

/// Reports whether a ciphertext decrypts to validly padded plaintext under a
/// fixed, unknown key.
pub trait PaddingOracle {
    fn is_valid(&self, ciphertext: &[u8]) -> bool;
}

impl<F> PaddingOracle for F
where
    F: Fn(&[u8]) -> bool,
{
    fn is_valid(&self, ciphertext: &[u8]) -> bool {
        self(ciphertext)
    }
}

/// Encrypts `head | prefix | tail` under a fixed, unknown key, where only
/// `prefix` is chosen by the caller.
pub trait EncryptionOracle {
    fn encrypt(&self, prefix: &[u8]) -> Vec<u8>;
}

impl<F> EncryptionOracle for F
where
    F: Fn(&[u8]) -> Vec<u8>,
{
    fn encrypt(&self, prefix: &[u8]) -> Vec<u8> {
        self(prefix)
    }
}

/// Reports whether an RSA ciphertext decrypts to a buffer starting with
/// `0x00 0x02`.
pub trait RsaPaddingOracle {
    fn is_valid(&self, ciphertext: &BigUint) -> bool;
}

impl<F> RsaPaddingOracle for F
where
    F: Fn(&BigUint) -> bool,
{
    fn is_valid(&self, ciphertext: &BigUint) -> bool {
        self(ciphertext)
    }
}

/// Decrypts RSA ciphertexts, but may refuse some of them (e.g. ones it has
/// seen before).
pub trait RsaDecryptionOracle {
    fn decrypt(&self, ciphertext: &BigUint) -> Option<BigUint>;
}

impl<F> RsaDecryptionOracle for F
where
    F: Fn(&BigUint) -> Option<BigUint>,
{
    fn decrypt(&self, ciphertext: &BigUint) -> Option<BigUint> {
        self(ciphertext)
    }
}

/// Counts oracle queries and enforces an optional upper bound on them.
///
/// The counter is atomic so a single budget can be shared between the block
/// workers of the parallel CBC attack.
#[derive(Debug, Default)]
pub struct QueryBudget {
    limit: Option<u64>,
    spent: AtomicU64,
}

impl QueryBudget {
    pub fn new(limit: Option<u64>) -> Self {
        Self {
            limit,
            spent: AtomicU64::new(0),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(None)
    }

    pub fn limited(limit: u64) -> Self {
        Self::new(Some(limit))
    }

    /// Number of queries charged so far.
    pub fn spent(&self) -> u64 {
        self.spent.load(Ordering::Relaxed)
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Charge one query, failing if that would go over the limit.
    pub fn charge(&self) -> Result<()> {
        let spent = self.spent.fetch_add(1, Ordering::Relaxed) + 1;
        match self.limit {
            Some(limit) if spent > limit => Err(AttackError::QueryBudgetExhausted(limit)),
            _ => Ok(()),
        }
    }
}

/// An oracle paired with the budget every query is charged against.
pub(crate) struct Metered<'a, O: ?Sized> {
    oracle: &'a O,
    budget: &'a QueryBudget,
}

impl<'a, O: ?Sized> Metered<'a, O> {
    pub(crate) fn new(oracle: &'a O, budget: &'a QueryBudget) -> Self {
        Self { oracle, budget }
    }
}

impl<O: PaddingOracle + ?Sized> Metered<'_, O> {
    pub(crate) fn padding_valid(&self, ciphertext: &[u8]) -> Result<bool> {
        self.budget.charge()?;
        Ok(PaddingOracle::is_valid(self.oracle, ciphertext))
    }
}

impl<O: EncryptionOracle + ?Sized> Metered<'_, O> {
    pub(crate) fn encrypt(&self, prefix: &[u8]) -> Result<Vec<u8>> {
        self.budget.charge()?;
        Ok(self.oracle.encrypt(prefix))
    }
}

impl<O: RsaPaddingOracle + ?Sized> Metered<'_, O> {
    pub(crate) fn rsa_padding_valid(&self, ciphertext: &BigUint) -> Result<bool> {
        self.budget.charge()?;
        Ok(RsaPaddingOracle::is_valid(self.oracle, ciphertext))
    }
}
