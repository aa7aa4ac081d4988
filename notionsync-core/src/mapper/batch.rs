use crate::remote::RemoteBlock;

/// Default number of top-level blocks per append request.
pub const DEFAULT_BATCH_LIMIT: usize = 100;

/// Upper bound on blocks, counting descendants, in one append request.
pub const MAX_BLOCKS_PER_REQUEST: usize = 1000;

/// Splits top-level blocks into ordered batches of at most `limit` blocks.
///
/// A block always travels with its children. A batch is also closed early
/// when its total block count would exceed [`MAX_BLOCKS_PER_REQUEST`].
pub fn partition_batches(blocks: Vec<RemoteBlock>, limit: usize) -> Vec<Vec<RemoteBlock>> {
    let limit = limit.max(1);
    let mut batches = Vec::new();
    let mut current: Vec<RemoteBlock> = Vec::new();
    let mut current_size = 0;

    for block in blocks {
        let size = block.tree_size();
        let full = current.len() >= limit || current_size + size > MAX_BLOCKS_PER_REQUEST;
        if full && !current.is_empty() {
            batches.push(std::mem::take(&mut current));
            current_size = 0;
        }
        current_size += size;
        current.push(block);
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}
