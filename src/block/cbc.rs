// CBC padding oracle attack.
//
// CBC decryption computes
//
//                 P_i = D(C_i) ⊕ C_{i-1}.
//
// If we send the oracle a two block ciphertext X | C_i, where X is a block we
// control, the victim decrypts the second block to
//
//                 P'_i = D(C_i) ⊕ X = P_i ⊕ C_{i-1} ⊕ X.
//
// Writing X = C_{i-1} ⊕ M for some mask M gives P'_i = P_i ⊕ M, so the mask
// flips plaintext bits directly. We walk the block from its last byte to its
// first. At position j we want P'_i to end in `block_size - j` copies of the
// value `block_size - j`. The bytes after j are already known, so the mask
// forces them to that value, and we try every mask byte at j until the oracle
// reports valid padding. Then P_i[j] = M[j] ⊕ (block_size - j).
//
// A hit is not always the one we want. For the last byte, a mask that leaves
// the plaintext ending in e.g. '\x02\x02' is valid too, although we forced
// nothing. Such a false positive shows up one position later, where no mask
// byte works. Every hit therefore records where its search stopped, and when
// a position runs dry we pop the latest hit and continue its search from the
// next candidate.
//
// The IV acts as the "previous block" of the first ciphertext block. Without
// it the first block cannot be recovered, and the plaintext starts at the
// second block.
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::oracle::Metered;
use crate::{AttackError, CbcConfig, PaddingOracle, QueryBudget, Result};

/// A tentatively resolved byte and where to resume its search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Decision {
    index: usize,
    next_candidate: u16,
}

/// Plaintext recovered from one block pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRecovery {
    pub plaintext: Vec<u8>,
    /// How many times a false positive had to be undone.
    pub backtracks: usize,
}

/// Decrypt `ciphertext` with the help of a padding oracle.
///
/// The result still carries its padding. If `iv` is `None`, the first
/// ciphertext block only serves as the IV of the second and is not part of
/// the output.
pub fn cbc_padding_oracle_attack<O>(
    oracle: &O,
    ciphertext: &[u8],
    iv: Option<&[u8]>,
    config: &CbcConfig,
) -> Result<Vec<u8>>
where
    O: PaddingOracle + ?Sized,
{
    let budget = config.budget();
    let blocks = chained_blocks(ciphertext, iv, config.block_size)?;

    let mut plaintext = Vec::with_capacity(ciphertext.len());
    for (block_idx, pair) in blocks.windows(2).enumerate() {
        let recovery = recover_block(oracle, pair[0], pair[1], block_idx, &budget)?;
        plaintext.extend_from_slice(&recovery.plaintext);
    }
    debug!(
        blocks = blocks.len().saturating_sub(1),
        queries = budget.spent(),
        "cbc padding oracle attack finished"
    );
    Ok(plaintext)
}

/// Same as [`cbc_padding_oracle_attack`], but decrypts all block pairs
/// concurrently.
///
/// Each pair only depends on its own two ciphertext blocks, so the result is
/// identical to the sequential attack. The query budget is shared by all
/// workers.
pub fn cbc_padding_oracle_attack_parallel<O>(
    oracle: &O,
    ciphertext: &[u8],
    iv: Option<&[u8]>,
    config: &CbcConfig,
) -> Result<Vec<u8>>
where
    O: PaddingOracle + Sync + ?Sized,
{
    let budget = config.budget();
    let blocks = chained_blocks(ciphertext, iv, config.block_size)?;

    let recoveries = blocks
        .par_windows(2)
        .enumerate()
        .map(|(block_idx, pair)| recover_block(oracle, pair[0], pair[1], block_idx, &budget))
        .collect::<Result<Vec<_>>>()?;

    Ok(recoveries
        .into_iter()
        .flat_map(|recovery| recovery.plaintext)
        .collect())
}

/// Recover the plaintext of `block`, using `prev_block` as its IV.
pub fn decrypt_block_pair<O>(
    oracle: &O,
    prev_block: &[u8],
    block: &[u8],
    budget: &QueryBudget,
) -> Result<BlockRecovery>
where
    O: PaddingOracle + ?Sized,
{
    validate_block_size(block.len())?;
    if prev_block.len() != block.len() {
        return Err(AttackError::InvalidIvLength {
            len: prev_block.len(),
            block_size: block.len(),
        });
    }
    recover_block(oracle, prev_block, block, 0, budget)
}

fn chained_blocks<'a>(
    ciphertext: &'a [u8],
    iv: Option<&'a [u8]>,
    block_size: usize,
) -> Result<Vec<&'a [u8]>> {
    validate_block_size(block_size)?;
    if ciphertext.len() % block_size != 0 {
        return Err(AttackError::MisalignedCiphertext {
            len: ciphertext.len(),
            block_size,
        });
    }
    if let Some(iv) = iv {
        if iv.len() != block_size {
            return Err(AttackError::InvalidIvLength {
                len: iv.len(),
                block_size,
            });
        }
    }
    Ok(iv
        .into_iter()
        .chain(ciphertext.chunks(block_size))
        .collect())
}

fn validate_block_size(block_size: usize) -> Result<()> {
    // Padding values are single bytes, so a block can hold at most 255 of
    // them.
    if block_size == 0 || block_size > u8::MAX as usize {
        return Err(AttackError::UnsupportedBlockSize(block_size));
    }
    Ok(())
}

fn recover_block<O>(
    oracle: &O,
    prev_block: &[u8],
    block: &[u8],
    block_idx: usize,
    budget: &QueryBudget,
) -> Result<BlockRecovery>
where
    O: PaddingOracle + ?Sized,
{
    let oracle = Metered::new(oracle, budget);
    let block_size = block.len();

    let mut decrypted = vec![0u8; block_size];
    let mut backtrace: Vec<Decision> = Vec::with_capacity(block_size);
    let mut backtracks = 0;

    // Bytes at and after `resolved` are known.
    let mut resolved = block_size;
    let mut first_candidate = 0u16;
    let mut query = [prev_block, block].concat();

    while resolved > 0 {
        let index = resolved - 1;
        let target = (block_size - index) as u8;

        for k in (index + 1)..block_size {
            query[k] = prev_block[k] ^ decrypted[k] ^ target;
        }

        let mut found = false;
        for candidate in first_candidate..=u8::MAX as u16 {
            query[index] = prev_block[index] ^ candidate as u8;
            if oracle.padding_valid(&query)? {
                decrypted[index] = candidate as u8 ^ target;
                backtrace.push(Decision {
                    index,
                    next_candidate: candidate + 1,
                });
                found = true;
                break;
            }
        }

        if found {
            trace!(block = block_idx, index, byte = decrypted[index], "recovered byte");
            resolved = index;
            first_candidate = 0;
            continue;
        }

        let decision = backtrace.pop().ok_or(AttackError::BacktraceExhausted {
            block: block_idx,
            byte: index,
        })?;
        debug!(
            block = block_idx,
            from = index,
            to = decision.index,
            "false positive, backtracking"
        );
        decrypted[..decision.index].fill(0);
        query[..block_size].copy_from_slice(prev_block);
        resolved = decision.index + 1;
        first_candidate = decision.next_candidate;
        backtracks += 1;
    }

    Ok(BlockRecovery {
        plaintext: decrypted,
        backtracks,
    })
}
