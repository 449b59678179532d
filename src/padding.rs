// PKCS#7 and PKCS#1 v1.5 padding.
//
// The attacks recover padded plaintext; these helpers let callers strip that
// padding again, and let tests build properly padded victims.

use num_bigint::BigUint;
use rand::Rng;

use crate::{AttackError, Result};

/// Minimum number of non-zero filler bytes in a PKCS#1 v1.5 block.
const PKCS1_MIN_FILLER: usize = 8;

pub fn pkcs7_pad(bytes: &[u8], block_size: usize) -> Vec<u8> {
    let n_pad = block_size - (bytes.len() % block_size);
    let mut out = Vec::with_capacity(bytes.len() + n_pad);
    out.extend_from_slice(bytes);
    out.resize(bytes.len() + n_pad, n_pad as u8);
    out
}

/// Returns the number of padding bytes if `bytes` ends in valid PKCS#7
/// padding for the given block size.
pub fn pkcs7_padding_len(bytes: &[u8], block_size: usize) -> Option<usize> {
    let n_pad = *bytes.last()? as usize;
    if n_pad == 0 || n_pad > block_size || n_pad > bytes.len() {
        return None;
    }
    bytes[(bytes.len() - n_pad)..]
        .iter()
        .all(|&b| b as usize == n_pad)
        .then_some(n_pad)
}

pub fn pkcs7_unpad(bytes: &mut Vec<u8>, block_size: usize) -> Result<()> {
    let n_pad = pkcs7_padding_len(bytes, block_size).ok_or(AttackError::InvalidPadding)?;
    bytes.truncate(bytes.len() - n_pad);
    Ok(())
}

/// Length in bytes of the modulus `n`.
pub(crate) fn modulus_byte_len(n: &BigUint) -> usize {
    ((n.bits() + 7) / 8) as usize
}

/// Encode `message` as `00 02 | non-zero random bytes | 00 | message`, as
/// wide as the modulus.
pub fn pkcs1v15_pad<R: Rng + ?Sized>(message: &[u8], n: &BigUint, rng: &mut R) -> Result<BigUint> {
    let k = modulus_byte_len(n);
    let max = k.saturating_sub(3 + PKCS1_MIN_FILLER);
    if k < 3 + PKCS1_MIN_FILLER || message.len() > max {
        return Err(AttackError::MessageTooLong {
            len: message.len(),
            max,
        });
    }

    let mut block = Vec::with_capacity(k);
    block.extend_from_slice(&[0x00, 0x02]);
    (0..(k - message.len() - 3)).for_each(|_| block.push(rng.gen_range(1..=u8::MAX)));
    block.push(0x00);
    block.extend_from_slice(message);
    Ok(BigUint::from_bytes_be(&block))
}

/// Extract the message from a PKCS#1 v1.5 encoded integer.
pub fn pkcs1v15_unpad(padded: &BigUint, n: &BigUint) -> Result<Vec<u8>> {
    let k = modulus_byte_len(n);
    let bytes = padded.to_bytes_be();
    // The leading zero byte is lost in the integer conversion.
    if bytes.len() + 1 != k || bytes.first() != Some(&0x02) {
        return Err(AttackError::InvalidPadding);
    }
    let separator = bytes
        .iter()
        .skip(1)
        .position(|&b| b == 0x00)
        .map(|i| i + 1)
        .ok_or(AttackError::InvalidPadding)?;
    if separator - 1 < PKCS1_MIN_FILLER {
        return Err(AttackError::InvalidPadding);
    }
    Ok(bytes[(separator + 1)..].to_vec())
}
