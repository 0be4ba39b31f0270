use tokio::sync::mpsc;

use crate::block::IndexedBlock;

/// Upstream source of confirmed blocks.
///
/// The scanner owns confirmation-depth tracking; the indexer only consumes
/// the ordered channel it exposes. The channel is bounded, so a slow
/// indexer backpressures the scanner.
pub trait BtcScanner: Send + 'static {
    /// Begins scanning from the given height.
    fn start(&mut self, from_height: u64) -> anyhow::Result<()>;

    /// Stops the scanner. Idempotent.
    fn stop(&mut self) -> anyhow::Result<()>;

    /// The stream of confirmed blocks, in non-decreasing height order.
    fn confirmed_blocks(&mut self) -> &mut mpsc::Receiver<IndexedBlock>;
}
