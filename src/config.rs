// Tunables for the attack engines.

use crate::QueryBudget;

pub const DEFAULT_BLOCK_SIZE: usize = 16;
pub const DEFAULT_FILLER: u8 = 0x01;
pub const DEFAULT_MAX_BLOCK_SIZE: usize = 3 * 512;

/// Settings for the CBC padding oracle attack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CbcConfig {
    pub block_size: usize,
    pub max_queries: Option<u64>,
}

impl Default for CbcConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            max_queries: None,
        }
    }
}

impl CbcConfig {
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_max_queries(mut self, max_queries: u64) -> Self {
        self.max_queries = Some(max_queries);
        self
    }

    pub fn budget(&self) -> QueryBudget {
        QueryBudget::new(self.max_queries)
    }
}

/// Settings for the byte-at-a-time ECB attacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcbConfig {
    /// Byte used to fill and align attacker controlled data. If the hidden
    /// text starts with a whole block of this byte, layout detection fails
    /// and a different filler should be tried.
    pub filler: u8,
    /// Largest block size the layout prober will try.
    pub max_block_size: usize,
    /// Bytes prepended to every query before any attack data.
    pub default_prefix: Vec<u8>,
    pub max_queries: Option<u64>,
}

impl Default for EcbConfig {
    fn default() -> Self {
        Self {
            filler: DEFAULT_FILLER,
            max_block_size: DEFAULT_MAX_BLOCK_SIZE,
            default_prefix: Vec::new(),
            max_queries: None,
        }
    }
}

impl EcbConfig {
    pub fn with_filler(mut self, filler: u8) -> Self {
        self.filler = filler;
        self
    }

    pub fn with_max_block_size(mut self, max_block_size: usize) -> Self {
        self.max_block_size = max_block_size;
        self
    }

    pub fn with_default_prefix(mut self, default_prefix: &[u8]) -> Self {
        self.default_prefix = default_prefix.to_vec();
        self
    }

    pub fn with_max_queries(mut self, max_queries: u64) -> Self {
        self.max_queries = Some(max_queries);
        self
    }

    pub fn budget(&self) -> QueryBudget {
        QueryBudget::new(self.max_queries)
    }
}

/// Settings for Bleichenbacher's PKCS#1 v1.5 attack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BleichenbacherConfig {
    pub max_queries: Option<u64>,
}

impl BleichenbacherConfig {
    pub fn with_max_queries(mut self, max_queries: u64) -> Self {
        self.max_queries = Some(max_queries);
        self
    }

    pub fn budget(&self) -> QueryBudget {
        QueryBudget::new(self.max_queries)
    }
}
