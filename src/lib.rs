mod block;
mod config;
mod error;
mod oracle;
mod padding;
mod rsa;
#[cfg(test)]
mod testing;

pub use block::cbc::{
    cbc_padding_oracle_attack, cbc_padding_oracle_attack_parallel, decrypt_block_pair,
    BlockRecovery,
};
pub use block::ecb::{decrypt_tail, guess_block_layout, infix_block_diffs, BlockLayout};
pub use block::inject::{cbc_inject, ctr_inject};
pub use config::{
    BleichenbacherConfig, CbcConfig, EcbConfig, DEFAULT_BLOCK_SIZE, DEFAULT_FILLER,
    DEFAULT_MAX_BLOCK_SIZE,
};
pub use error::{AttackError, LayoutFailure, Result};
pub use oracle::{
    EncryptionOracle, PaddingOracle, QueryBudget, RsaDecryptionOracle, RsaPaddingOracle,
};
pub use padding::{pkcs1v15_pad, pkcs1v15_unpad, pkcs7_pad, pkcs7_padding_len, pkcs7_unpad};
pub use rsa::bleichenbacher::{bleichenbacher_decrypt, BleichenbacherAttack};
pub use rsa::interval::{Interval, IntervalSet};
pub use rsa::unpadded::recover_unpadded;
pub use rsa::RsaPublicKey;
