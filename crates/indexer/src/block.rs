use bitcoin::{block::Header, Transaction};

/// A confirmed block as delivered by the scanner.
///
/// Blocks arrive in strictly non-decreasing height order; the scanner
/// guarantees finality by confirmation depth.
#[derive(Clone, Debug)]
pub struct IndexedBlock {
    pub height: u64,
    pub header: Header,
    pub txs: Vec<Transaction>,
}

impl IndexedBlock {
    pub fn new(height: u64, header: Header, txs: Vec<Transaction>) -> Self {
        Self {
            height,
            header,
            txs,
        }
    }

    /// Header timestamp of the block.
    pub fn block_time(&self) -> u32 {
        self.header.time
    }
}
