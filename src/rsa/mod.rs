// Attacks on RSA.

use num_bigint::BigUint;

use crate::padding::modulus_byte_len;

pub mod bleichenbacher;
pub mod interval;
pub mod unpadded;

/// An RSA public key `(e, n)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPublicKey {
    pub e: BigUint,
    pub n: BigUint,
}

impl RsaPublicKey {
    pub fn new(e: BigUint, n: BigUint) -> Self {
        Self { e, n }
    }

    pub fn encrypt(&self, plaintext: &BigUint) -> BigUint {
        plaintext.modpow(&self.e, &self.n)
    }

    /// Length of the modulus in bytes.
    pub fn byte_len(&self) -> usize {
        modulus_byte_len(&self.n)
    }

    /// Multiply `ciphertext` by `s^e`, which multiplies the plaintext it
    /// decrypts to by `s`.
    pub fn blind(&self, ciphertext: &BigUint, s: &BigUint) -> BigUint {
        (ciphertext * s.modpow(&self.e, &self.n)) % &self.n
    }
}
