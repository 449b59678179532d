// Attacks on block cipher modes.

pub mod cbc;
pub mod ecb;
pub mod inject;
