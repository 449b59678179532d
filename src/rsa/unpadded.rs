// Unpadded RSA message recovery
//
// A server that refuses to decrypt the same ciphertext twice will still
// decrypt c' = s^e * c, whose plaintext is s * m. Dividing by s gives m back.

use num_bigint::BigUint;

use crate::{AttackError, Result, RsaDecryptionOracle, RsaPublicKey};

/// Recover the plaintext of `ciphertext` from an oracle that won't decrypt
/// it directly.
///
/// `s` should be a random value in `[2, n)`. A value without an inverse
/// modulo `n` fails with [`AttackError::NotInvertible`], and `s = 1` just
/// resubmits the original ciphertext.
pub fn recover_unpadded<O>(
    oracle: &O,
    key: &RsaPublicKey,
    ciphertext: &BigUint,
    s: &BigUint,
) -> Result<BigUint>
where
    O: RsaDecryptionOracle + ?Sized,
{
    let inverse = s.modinv(&key.n).ok_or(AttackError::NotInvertible)?;
    let plaintext = oracle
        .decrypt(&key.blind(ciphertext, s))
        .ok_or(AttackError::DecryptionRefused)?;
    Ok((plaintext * inverse) % &key.n)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::collections::HashSet;

    use rand::{rngs::StdRng, SeedableRng};
    use rstest::rstest;

    use crate::testing::RsaVictim;

    #[rstest]
    #[case(2u64)]
    #[case(12345u64)]
    fn recover_unpadded_recovers_message_from_recently_seen_ciphertext(#[case] s: u64) {
        let mut rng = StdRng::from_seed([101; 32]);
        let victim = RsaVictim::new(256, &mut rng);
        let seen = RefCell::new(HashSet::new());
        let oracle = |c: &BigUint| {
            let unseen = seen.borrow_mut().insert(c.clone());
            unseen.then(|| victim.decrypt(c))
        };
        let key = victim.public_key();
        let ciphertext = key.encrypt(&BigUint::from(1337u64));
        assert_eq!(oracle(&ciphertext), Some(BigUint::from(1337u64)));
        assert_eq!(oracle(&ciphertext), None);

        let plaintext = recover_unpadded(&oracle, key, &ciphertext, &BigUint::from(s)).unwrap();

        assert_eq!(plaintext, BigUint::from(1337u64));
    }

    #[test]
    fn recover_unpadded_reports_refused_queries() {
        let key = RsaPublicKey::new(BigUint::from(29u64), BigUint::from(133u64));
        let oracle = |_: &BigUint| -> Option<BigUint> { None };

        let result =
            recover_unpadded(&oracle, &key, &BigUint::from(92u64), &BigUint::from(2u64));

        assert_eq!(result, Err(AttackError::DecryptionRefused));
    }

    #[test]
    fn recover_unpadded_rejects_factors_sharing_a_prime_with_n() {
        let key = RsaPublicKey::new(BigUint::from(29u64), BigUint::from(133u64));
        let oracle = |c: &BigUint| Some(c.clone());

        let result =
            recover_unpadded(&oracle, &key, &BigUint::from(92u64), &BigUint::from(7u64));

        assert_eq!(result, Err(AttackError::NotInvertible));
    }
}
