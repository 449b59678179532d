// Bit-flipping payload injection
//
// Flipping a bit of CBC ciphertext block C_{i-1} flips the same bit of
// plaintext block P_i (and garbles P_{i-1}). Flipping a bit of CTR ciphertext
// flips the same plaintext bit and nothing else. If we know what the
// plaintext at some offset is, XORing `known ⊕ wanted` into the right
// ciphertext bytes turns it into anything we like.

use crate::{AttackError, Result};

/// Rewrite a CBC ciphertext so that `known`, located at plaintext `offset`,
/// decrypts to `wanted`.
///
/// The block before the payload is destroyed in the process. Pass the IV to
/// inject into the first block; it is returned, altered, alongside the new
/// ciphertext.
pub fn cbc_inject(
    ciphertext: &[u8],
    offset: usize,
    known: &[u8],
    wanted: &[u8],
    iv: Option<&[u8]>,
    block_size: usize,
) -> Result<(Option<Vec<u8>>, Vec<u8>)> {
    if known.len() != wanted.len() {
        return Err(AttackError::PayloadLengthMismatch {
            known: known.len(),
            wanted: wanted.len(),
        });
    }
    if block_size == 0 {
        return Err(AttackError::UnsupportedBlockSize(block_size));
    }
    if let Some(iv) = iv {
        if iv.len() != block_size {
            return Err(AttackError::InvalidIvLength {
                len: iv.len(),
                block_size,
            });
        }
    }
    if offset < block_size && iv.is_none() {
        return Err(AttackError::PayloadBeforeFirstBlock(offset));
    }

    let max = block_size - (offset % block_size);
    if wanted.len() > max {
        return Err(AttackError::PayloadTooLong {
            len: wanted.len(),
            max,
        });
    }

    let iv_len = iv.map_or(0, <[u8]>::len);
    let mut buffer = [iv.unwrap_or_default(), ciphertext].concat();
    let start = iv_len + offset - block_size;
    if start + wanted.len() > buffer.len() {
        return Err(AttackError::PayloadTooLong {
            len: wanted.len(),
            max: buffer.len().saturating_sub(start),
        });
    }
    flip(&mut buffer[start..], known, wanted);

    let new_ciphertext = buffer.split_off(iv_len);
    Ok((iv.map(|_| buffer), new_ciphertext))
}

/// Rewrite a stream cipher ciphertext so that `known`, located at `offset`,
/// decrypts to `wanted`.
pub fn ctr_inject(
    ciphertext: &[u8],
    offset: usize,
    known: &[u8],
    wanted: &[u8],
) -> Result<Vec<u8>> {
    if known.len() != wanted.len() {
        return Err(AttackError::PayloadLengthMismatch {
            known: known.len(),
            wanted: wanted.len(),
        });
    }
    let max = ciphertext.len().saturating_sub(offset);
    if offset > ciphertext.len() || wanted.len() > max {
        return Err(AttackError::PayloadTooLong {
            len: wanted.len(),
            max,
        });
    }

    let mut new_ciphertext = ciphertext.to_vec();
    flip(&mut new_ciphertext[offset..], known, wanted);
    Ok(new_ciphertext)
}

fn flip(target: &mut [u8], known: &[u8], wanted: &[u8]) {
    target
        .iter_mut()
        .zip(known.iter().zip(wanted))
        .for_each(|(c, (k, w))| *c ^= k ^ w);
}
