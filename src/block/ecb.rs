// Byte-at-a-time ECB decryption
//
// The victim encrypts `head | prefix | tail` with a fixed key, where we pick
// the prefix. ECB encrypts equal blocks to equal ciphertext, so we can learn
// where our bytes end up and then read the tail one byte at a time.
//
//    <- block_size ->
//    H H H H H H H H | H H H H A A A A | A A A A A A A A | T T ...
//    0                 1                 2
//                              ^         ^
//            padding_offset ---'         '--- block_offset
//
// The layout is found by inserting filler bytes and watching which
// ciphertext blocks change. Once it's known, we pad the partially owned block
// and line up the unknown tail byte at the end of a block we control.
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

use tracing::{debug, trace, warn};

use crate::oracle::Metered;
use crate::{AttackError, EcbConfig, EncryptionOracle, LayoutFailure, QueryBudget, Result};

/// Where attacker controlled bytes land in the encrypted output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockLayout {
    pub block_size: usize,
    /// Index of the first block made up of attacker bytes only.
    pub block_offset: usize,
    /// Number of foreign bytes sharing a block with the first attacker byte.
    pub padding_offset: usize,
}

/// Wraps an encryption oracle so every query starts with a fixed prefix.
struct PrefixedOracle<'a, O: ?Sized> {
    oracle: Metered<'a, O>,
    prefix: Vec<u8>,
}

impl<'a, O: EncryptionOracle + ?Sized> PrefixedOracle<'a, O> {
    fn new(oracle: &'a O, budget: &'a QueryBudget, prefix: &[u8]) -> Self {
        Self {
            oracle: Metered::new(oracle, budget),
            prefix: prefix.to_vec(),
        }
    }

    fn ask(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.oracle.encrypt(&[self.prefix.as_slice(), data].concat())
    }
}

/// Find the first run of elements where `b` departs from `a`.
///
/// Elements are matched greedily from the start. At the first mismatch, the
/// indices of `b` are collected until `b` lines up with `a` again. Anything
/// after that is assumed to match.
///
/// ```
/// use oracle_attacks::infix_block_diffs;
///
/// let a = [1, 2, 3, 6, 7, 8];
/// let b = [1, 2, 4, 5, 6, 7, 8];
/// assert_eq!(infix_block_diffs(&a, &b), vec![2, 3]);
/// ```
pub fn infix_block_diffs<T: Eq + Hash>(a: &[T], b: &[T]) -> Vec<usize> {
    let mut positions: HashMap<&T, VecDeque<usize>> = HashMap::new();
    for (i, x) in a.iter().enumerate() {
        positions.entry(x).or_default().push_back(i);
    }

    let mut b_iter = b.iter().enumerate();
    let first_miss = loop {
        let Some((i, x)) = b_iter.next() else {
            return Vec::new();
        };
        match positions.get_mut(x) {
            Some(indices) if indices.front() == Some(&i) => {
                indices.pop_front();
            }
            _ => break i,
        }
    };

    let mut diffs = vec![first_miss];
    for (i, x) in b_iter {
        let realigned = positions
            .get(x)
            .and_then(|indices| indices.front())
            .is_some_and(|&j| j == first_miss || j == first_miss + 1);
        if realigned {
            break;
        }
        diffs.push(i);
    }
    diffs
}

/// Work out the block size and the alignment of attacker bytes behind an
/// ECB encryption oracle.
///
/// Fails with a recoverable error if the hidden text confuses the probe,
/// e.g. because it contains a whole block of the filler byte. Retrying with
/// another filler usually helps.
pub fn guess_block_layout<O>(oracle: &O, config: &EcbConfig) -> Result<BlockLayout>
where
    O: EncryptionOracle + ?Sized,
{
    let budget = config.budget();
    let oracle = PrefixedOracle::new(oracle, &budget, &config.default_prefix);
    probe_layout(&oracle, config)
}

fn probe_layout<O>(oracle: &PrefixedOracle<O>, config: &EcbConfig) -> Result<BlockLayout>
where
    O: EncryptionOracle + ?Sized,
{
    let baseline = oracle.ask(&[])?;

    for size in 2..config.max_block_size {
        if baseline.len() % size != 0 {
            continue;
        }

        let probe = oracle.ask(&vec![config.filler; size])?;
        let base_blocks: Vec<_> = baseline.chunks(size).collect();
        let probe_blocks: Vec<_> = probe.chunks(size).collect();

        let layout = match infix_block_diffs(&base_blocks, &probe_blocks).as_slice() {
            // The filler starts on a block boundary and fills exactly one
            // block.
            &[block_offset] => BlockLayout {
                block_size: size,
                block_offset,
                padding_offset: 0,
            },
            // The filler straddles two blocks.
            &[first, block_offset] => BlockLayout {
                block_size: size,
                block_offset,
                padding_offset: find_padding_offset(
                    oracle,
                    config,
                    size,
                    first,
                    probe_blocks[first],
                )?,
            },
            _ => continue,
        };
        debug!(?layout, "found block layout");
        return Ok(layout);
    }

    let failure = LayoutFailure::BlockSize {
        max_block_size: config.max_block_size,
    };
    warn!(%failure, filler = config.filler, "block layout detection failed");
    Err(AttackError::LayoutDetectionFailed(failure))
}

/// Shrink the filler until the first block it touched changes. At that point
/// the first byte of the following text has moved into that block.
fn find_padding_offset<O>(
    oracle: &PrefixedOracle<O>,
    config: &EcbConfig,
    block_size: usize,
    first_diff: usize,
    reference: &[u8],
) -> Result<usize>
where
    O: EncryptionOracle + ?Sized,
{
    for shrink in 1..=block_size {
        let ciphertext = oracle.ask(&vec![config.filler; block_size - shrink])?;
        if ciphertext.chunks(block_size).nth(first_diff) != Some(reference) {
            return Ok(shrink - 1);
        }
    }

    let failure = LayoutFailure::PaddingOffset { block_size };
    warn!(%failure, filler = config.filler, "block layout detection failed");
    Err(AttackError::LayoutDetectionFailed(failure))
}

/// Recover the text the oracle appends after the attacker's bytes.
///
/// The layout is probed first if not given. The result ends with whatever
/// padding byte could still be matched, typically `\x01`.
pub fn decrypt_tail<O>(
    oracle: &O,
    config: &EcbConfig,
    layout: Option<BlockLayout>,
) -> Result<(Vec<u8>, BlockLayout)>
where
    O: EncryptionOracle + ?Sized,
{
    let budget = config.budget();
    let mut oracle = PrefixedOracle::new(oracle, &budget, &config.default_prefix);
    let cipher_len = oracle.ask(&[])?.len();

    let layout = match layout {
        Some(layout) => layout,
        None => probe_layout(&oracle, config)?,
    };
    let BlockLayout {
        block_size,
        block_offset,
        padding_offset,
    } = layout;
    if block_size == 0 {
        return Err(AttackError::UnsupportedBlockSize(block_size));
    }
    if padding_offset > 0 {
        oracle
            .prefix
            .resize(oracle.prefix.len() + block_size.saturating_sub(padding_offset), config.filler);
    }

    // Start off with a dummy block of filler so there is always a full
    // block's worth of known bytes to shift in front of the unknown one.
    let mut decrypted = vec![config.filler; block_size];
    let base_offset = block_offset * block_size;

    let mut block_idx = 0;
    'blocks: while base_offset + block_idx * block_size <= cipher_len {
        let offset = base_offset + block_idx * block_size;
        for n in 0..block_size {
            let known = decrypted[(decrypted.len() + 1 - block_size)..].to_vec();

            // Trim the known bytes so the unknown byte is the last one in the
            // block under attack.
            let ciphertext = oracle.ask(&known[..(block_size - 1 - n)])?;
            let Some(reference) = ciphertext.get(offset..(offset + block_size)) else {
                break 'blocks;
            };

            match crack_byte(&oracle, &known, base_offset, block_size, reference)? {
                Some(byte) => {
                    trace!(index = decrypted.len() - block_size, byte, "recovered byte");
                    decrypted.push(byte);
                }
                // Happens once we reach the padding, which changes with the
                // length of our input.
                None => break 'blocks,
            }
        }
        block_idx += 1;
    }

    decrypted.drain(..block_size);
    debug!(
        recovered = decrypted.len(),
        queries = budget.spent(),
        "ecb tail decryption finished"
    );
    Ok((decrypted, layout))
}

fn crack_byte<O>(
    oracle: &PrefixedOracle<O>,
    known: &[u8],
    base_offset: usize,
    block_size: usize,
    reference: &[u8],
) -> Result<Option<u8>>
where
    O: EncryptionOracle + ?Sized,
{
    let mut candidate_msg = [known, &[0]].concat();
    for candidate in 0..=u8::MAX {
        if let Some(last) = candidate_msg.last_mut() {
            *last = candidate;
        }
        let ciphertext = oracle.ask(&candidate_msg)?;
        if ciphertext.get(base_offset..(base_offset + block_size)) == Some(reference) {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}
