// Victim systems the attacks are tested against.

use aes::cipher::{generic_array::GenericArray, BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes128;
use num_bigint::{BigUint, RandBigInt};
use num_traits::Zero;
use rand::Rng;

use crate::{
    pkcs7_pad, pkcs7_padding_len, EncryptionOracle, PaddingOracle, RsaDecryptionOracle,
    RsaPaddingOracle, RsaPublicKey,
};

const BLOCK_SIZE: usize = 16;
const MILLER_RABIN_ROUNDS: u32 = 8;
const SMALL_ODD_PRIMES: [u32; 10] = [3, 5, 7, 11, 13, 17, 19, 23, 29, 31];

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn new_cipher<R: Rng + ?Sized>(rng: &mut R) -> Aes128 {
    let key: [u8; BLOCK_SIZE] = rng.gen();
    Aes128::new(&GenericArray::from(key))
}

fn encrypt_block(cipher: &Aes128, block: &[u8]) -> Vec<u8> {
    let mut block = GenericArray::clone_from_slice(block);
    cipher.encrypt_block(&mut block);
    block.to_vec()
}

fn decrypt_block(cipher: &Aes128, block: &[u8]) -> Vec<u8> {
    let mut block = GenericArray::clone_from_slice(block);
    cipher.decrypt_block(&mut block);
    block.to_vec()
}

fn xor(a: &[u8], b: &[u8]) -> Vec<u8> {
    a.iter().zip(b).map(|(x, y)| x ^ y).collect()
}

/// AES-128-CBC server that only tells whether a ciphertext's padding is
/// valid.
pub struct CbcPaddingVictim {
    cipher: Aes128,
    iv: [u8; BLOCK_SIZE],
}

impl CbcPaddingVictim {
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            cipher: new_cipher(rng),
            iv: rng.gen(),
        }
    }

    /// Returns the IV and the ciphertext of the padded message.
    pub fn encrypt(&self, msg: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let mut prev = self.iv.to_vec();
        let mut ciphertext = Vec::new();
        for block in pkcs7_pad(msg, BLOCK_SIZE).chunks(BLOCK_SIZE) {
            prev = encrypt_block(&self.cipher, &xor(block, &prev));
            ciphertext.extend_from_slice(&prev);
        }
        (self.iv.to_vec(), ciphertext)
    }

    pub fn check(&self, ciphertext: &[u8]) -> bool {
        let len = ciphertext.len();
        if len == 0 || len % BLOCK_SIZE != 0 {
            return false;
        }
        let prev = if len == BLOCK_SIZE {
            &self.iv[..]
        } else {
            &ciphertext[(len - 2 * BLOCK_SIZE)..(len - BLOCK_SIZE)]
        };
        let last = xor(
            &decrypt_block(&self.cipher, &ciphertext[(len - BLOCK_SIZE)..]),
            prev,
        );
        pkcs7_padding_len(&last, BLOCK_SIZE).is_some()
    }
}

impl PaddingOracle for CbcPaddingVictim {
    fn is_valid(&self, ciphertext: &[u8]) -> bool {
        self.check(ciphertext)
    }
}

/// AES-128-ECB server encrypting `head | prefix | tail` for a caller chosen
/// prefix.
pub struct EcbInfixVictim {
    cipher: Aes128,
    head: Vec<u8>,
    tail: Vec<u8>,
}

impl EcbInfixVictim {
    pub fn new<R: Rng + ?Sized>(rng: &mut R, head: &[u8], tail: &[u8]) -> Self {
        Self {
            cipher: new_cipher(rng),
            head: head.to_vec(),
            tail: tail.to_vec(),
        }
    }
}

impl EncryptionOracle for EcbInfixVictim {
    fn encrypt(&self, prefix: &[u8]) -> Vec<u8> {
        let plaintext = [self.head.as_slice(), prefix, self.tail.as_slice()].concat();
        pkcs7_pad(&plaintext, BLOCK_SIZE)
            .chunks(BLOCK_SIZE)
            .flat_map(|block| encrypt_block(&self.cipher, block))
            .collect()
    }
}

/// Textbook RSA key pair whose owner answers padding and decryption
/// queries.
pub struct RsaVictim {
    public: RsaPublicKey,
    private: BigUint,
}

impl RsaVictim {
    pub fn new<R: Rng + ?Sized>(n_bits: u64, rng: &mut R) -> Self {
        let e = BigUint::from(65537u32);
        loop {
            let p = generate_prime(n_bits / 2, rng);
            let q = generate_prime(n_bits / 2, rng);
            if p == q {
                continue;
            }
            let totient = (&p - 1u32) * (&q - 1u32);
            if let Some(d) = e.modinv(&totient) {
                return Self {
                    public: RsaPublicKey::new(e, &p * &q),
                    private: d,
                };
            }
        }
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    pub fn decrypt(&self, ciphertext: &BigUint) -> BigUint {
        ciphertext.modpow(&self.private, &self.public.n)
    }

    /// Whether the plaintext starts with `00 02`.
    pub fn padding_is_valid(&self, ciphertext: &BigUint) -> bool {
        let plaintext = self.decrypt(ciphertext).to_bytes_be();
        plaintext.len() + 1 == self.public.byte_len() && plaintext.first() == Some(&0x02)
    }
}

impl RsaPaddingOracle for RsaVictim {
    fn is_valid(&self, ciphertext: &BigUint) -> bool {
        self.padding_is_valid(ciphertext)
    }
}

impl RsaDecryptionOracle for RsaVictim {
    fn decrypt(&self, ciphertext: &BigUint) -> Option<BigUint> {
        Some(RsaVictim::decrypt(self, ciphertext))
    }
}

fn generate_prime<R: Rng + ?Sized>(n_bits: u64, rng: &mut R) -> BigUint {
    loop {
        let mut candidate = rng.gen_biguint(n_bits);
        // Setting the two top bits makes the product of two primes exactly
        // twice as wide.
        candidate.set_bit(n_bits - 1, true);
        candidate.set_bit(n_bits - 2, true);
        candidate.set_bit(0, true);
        if is_likely_prime(&candidate, rng) {
            return candidate;
        }
    }
}

fn is_likely_prime<R: Rng + ?Sized>(candidate: &BigUint, rng: &mut R) -> bool {
    let one = BigUint::from(1u64);
    let two = BigUint::from(2u64);
    if candidate < &BigUint::from(4u64) {
        return candidate >= &two;
    }
    if !candidate.bit(0) {
        return false;
    }
    for small_prime in SMALL_ODD_PRIMES {
        let p = BigUint::from(small_prime);
        if candidate == &p {
            return true;
        }
        if (candidate % &p).is_zero() {
            return false;
        }
    }

    let n_minus_one = candidate - &one;
    let r = n_minus_one.trailing_zeros().unwrap_or(0);
    let d = &n_minus_one >> r;
    'witness: for _ in 0..MILLER_RABIN_ROUNDS {
        let a = rng.gen_biguint_range(&two, &n_minus_one);
        let mut x = a.modpow(&d, candidate);
        if x == one || x == n_minus_one {
            continue;
        }
        for _ in 1..r {
            x = x.modpow(&two, candidate);
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    use num_traits::Num;
    use rand::{rngs::StdRng, SeedableRng};
    use rstest::rstest;

    #[rstest]
    #[case(BigUint::from(2u64))]
    #[case(BigUint::from(37u64))]
    #[case(BigUint::from(65537u64))]
    #[case(BigUint::from_str_radix("170141183460469231731687303715884105727", 10).unwrap())]
    fn is_likely_prime_returns_true_given_prime(#[case] prime: BigUint) {
        let mut rng = StdRng::from_seed([101; 32]);

        assert!(is_likely_prime(&prime, &mut rng));
    }

    #[rstest]
    #[case(BigUint::from(1u64))]
    #[case(BigUint::from(561u64))]
    #[case(BigUint::from(65535u64))]
    #[case(BigUint::from_str_radix("170141183460469231731687303715884105729", 10).unwrap())]
    fn is_likely_prime_returns_false_given_composite(#[case] composite: BigUint) {
        let mut rng = StdRng::from_seed([101; 32]);

        assert!(!is_likely_prime(&composite, &mut rng));
    }

    #[test]
    fn rsa_victim_round_trips_messages() {
        let mut rng = StdRng::from_seed([12; 32]);
        let victim = RsaVictim::new(256, &mut rng);
        let msg = BigUint::from(42u64);

        let ciphertext = victim.public_key().encrypt(&msg);

        assert_eq!(victim.public_key().n.bits(), 256);
        assert_eq!(RsaVictim::decrypt(&victim, &ciphertext), msg);
    }

    #[test]
    fn cbc_padding_victim_accepts_its_own_ciphertexts() {
        let mut rng = StdRng::from_seed([3; 32]);
        let victim = CbcPaddingVictim::new(&mut rng);
        let (_, ciphertext) = victim.encrypt(b"ICE ICE BABY");

        assert!(victim.check(&ciphertext));
        assert!(!victim.check(&ciphertext[1..]));
    }
}
