/*!
 * Block-aligned batching of subtitle documents.
 *
 * A batch is a contiguous run of blocks serialized as SRT text. Batches are
 * cut only at block headers, so an index, its timing line and its text always
 * travel together in one request.
 */

use log::{debug, warn};

use crate::subtitle_processor::{block_spans, canonical_text, serialize_blocks, SubtitleDocument};

/// Default number of blocks sent in one request
pub const DEFAULT_MAX_BLOCKS_PER_BATCH: usize = 200;

/// One request's worth of subtitle text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// 1-based position in the run
    pub number: usize,
    /// Number of blocks in this batch
    pub block_count: usize,
    /// Serialized SRT, ending with exactly one newline
    pub text: String,
}

/// Splits documents into bounded batches
#[derive(Debug, Clone, Copy)]
pub struct Batcher {
    max_blocks_per_batch: usize,
}

impl Default for Batcher {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BLOCKS_PER_BATCH)
    }
}

impl Batcher {
    /// Create a batcher. A limit of zero is raised to one block per batch.
    pub fn new(max_blocks_per_batch: usize) -> Self {
        if max_blocks_per_batch == 0 {
            warn!("Batch size of 0 is not usable, sending one block per batch");
        }
        Self {
            max_blocks_per_batch: max_blocks_per_batch.max(1),
        }
    }

    pub fn max_blocks_per_batch(&self) -> usize {
        self.max_blocks_per_batch
    }

    /// Split a parsed document, preserving block order.
    ///
    /// The last batch may hold fewer blocks; it is never merged backward.
    pub fn split(&self, doc: &SubtitleDocument) -> Vec<Batch> {
        let batches: Vec<Batch> = doc
            .blocks
            .chunks(self.max_blocks_per_batch)
            .enumerate()
            .map(|(i, chunk)| {
                let mut text = serialize_blocks(chunk);
                ensure_single_trailing_newline(&mut text);
                Batch {
                    number: i + 1,
                    block_count: chunk.len(),
                    text,
                }
            })
            .collect();

        self.log_batches(&batches, doc.len());
        batches
    }

    /// Split raw SRT text on block headers without building a document.
    ///
    /// Blocks keep their original text verbatim; only the spacing between
    /// blocks is made canonical. Lines before the first header are dropped.
    pub fn split_text(&self, content: &str) -> Vec<Batch> {
        let content = canonical_text(content.trim());
        let lines: Vec<&str> = content.split('\n').collect();
        let spans = block_spans(&lines);

        let blocks: Vec<String> = spans
            .into_iter()
            .map(|span| {
                let mut block_lines = &lines[span];
                while let Some((last, rest)) = block_lines.split_last() {
                    if !last.is_empty() {
                        break;
                    }
                    block_lines = rest;
                }
                block_lines.join("\n")
            })
            .collect();

        let total_blocks = blocks.len();
        let batches: Vec<Batch> = blocks
            .chunks(self.max_blocks_per_batch)
            .enumerate()
            .map(|(i, chunk)| Batch {
                number: i + 1,
                block_count: chunk.len(),
                text: format!("{}\n", chunk.join("\n\n")),
            })
            .collect();

        self.log_batches(&batches, total_blocks);
        batches
    }

    fn log_batches(&self, batches: &[Batch], total_blocks: usize) {
        // Every block must land in exactly one batch
        let batched: usize = batches.iter().map(|b| b.block_count).sum();
        debug_assert_eq!(batched, total_blocks);

        if log::max_level() >= log::LevelFilter::Debug {
            for batch in batches {
                debug!(
                    "Batch {}: {} blocks, {} chars",
                    batch.number,
                    batch.block_count,
                    batch.text.len()
                );
            }
        }
        debug!(
            "Split {} blocks into {} batches of at most {}",
            total_blocks,
            batches.len(),
            self.max_blocks_per_batch
        );
    }
}

/// Join translated batch texts in batch order with a single newline
pub fn concatenate<S: AsRef<str>>(parts: &[S]) -> String {
    parts.iter().map(|p| p.as_ref()).collect::<Vec<_>>().join("\n")
}

fn ensure_single_trailing_newline(text: &mut String) {
    while text.ends_with('\n') {
        text.pop();
    }
    text.push('\n');
}
