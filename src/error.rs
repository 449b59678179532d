// Errors surfaced by the attack engines.
//
// Local retries (backtracking, range re-scans, filler offset searches) never
// leave an engine. Only states the engine cannot get out of on its own are
// reported here.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AttackError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttackError {
    #[error("ciphertext length {len} is not a multiple of the block size {block_size}")]
    MisalignedCiphertext { len: usize, block_size: usize },

    #[error("block size {0} is not supported")]
    UnsupportedBlockSize(usize),

    #[error("initialisation vector has length {len}, expected {block_size}")]
    InvalidIvLength { len: usize, block_size: usize },

    #[error("padding oracle is inconsistent: no candidate left for byte {byte} of block {block}")]
    BacktraceExhausted { block: usize, byte: usize },

    #[error("block layout detection failed: {0}")]
    LayoutDetectionFailed(LayoutFailure),

    #[error("oracle query budget of {0} queries exhausted")]
    QueryBudgetExhausted(u64),

    #[error("no interval is consistent with the oracle answers")]
    IntervalsExhausted,

    #[error("invalid padding")]
    InvalidPadding,

    #[error("message of {len} bytes is too long, at most {max} bytes fit")]
    MessageTooLong { len: usize, max: usize },

    #[error("known and wanted payloads differ in length ({known} != {wanted})")]
    PayloadLengthMismatch { known: usize, wanted: usize },

    #[error("payload of {len} bytes does not fit, at most {max} bytes can be injected at this offset")]
    PayloadTooLong { len: usize, max: usize },

    #[error("cannot inject at offset {0} without a preceding ciphertext block or IV")]
    PayloadBeforeFirstBlock(usize),

    #[error("decryption oracle refused the query")]
    DecryptionRefused,

    #[error("value has no inverse modulo n")]
    NotInvertible,
}

/// The reason the block layout prober gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LayoutFailure {
    #[error("no block size up to {max_block_size} produced a one or two block difference")]
    BlockSize { max_block_size: usize },

    #[error("could not find the padding offset for block size {block_size}")]
    PaddingOffset { block_size: usize },
}

impl AttackError {
    /// Whether retrying the attack with different parameters (e.g. another
    /// filler byte) may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AttackError::LayoutDetectionFailed(_))
    }
}
