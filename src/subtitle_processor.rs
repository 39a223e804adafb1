use std::fmt;
use std::fs;
use std::ops::Range;
use std::path::Path;
use std::str::FromStr;
use regex::Regex;
use once_cell::sync::Lazy;
use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::errors::SubtitleError;

// @module: SRT parsing, serialization and line-break normalization

// @const: SRT timing line prefix, ASCII digits only
static TIMING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]{2}):([0-9]{2}):([0-9]{2}),([0-9]{3}) --> ([0-9]{2}):([0-9]{2}):([0-9]{2}),([0-9]{3})").unwrap()
});

/// Returns true when `index_line` and `timing_line` open a subtitle block.
///
/// This is the only boundary rule in the crate: the parser, the normalizer
/// and the batcher all segment text through it.
pub fn is_block_header(index_line: &str, timing_line: &str) -> bool {
    !index_line.is_empty()
        && index_line.bytes().all(|b| b.is_ascii_digit())
        && TIMING_REGEX.is_match(timing_line)
}

/// Strip a UTF-8 BOM and fold CRLF and lone CR line endings to LF
pub(crate) fn canonical_text(content: &str) -> String {
    content
        .trim_start_matches('\u{feff}')
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}

fn starts_block(lines: &[&str], i: usize) -> bool {
    i + 1 < lines.len() && is_block_header(lines[i], lines[i + 1])
}

/// Line ranges of every block in `lines`, in order.
///
/// A block runs from its index line up to (not including) the next header.
/// Lines before the first header belong to no block.
pub fn block_spans(lines: &[&str]) -> Vec<Range<usize>> {
    let starts: Vec<usize> = (0..lines.len()).filter(|&i| starts_block(lines, i)).collect();

    starts
        .iter()
        .enumerate()
        .map(|(n, &start)| {
            let end = starts.get(n + 1).copied().unwrap_or(lines.len());
            start..end
        })
        .collect()
}

/// Number of block headers in raw SRT text
pub fn count_blocks(content: &str) -> usize {
    let content = canonical_text(content);
    let lines: Vec<&str> = content.split('\n').collect();
    block_spans(&lines).len()
}

/// Repair block spacing in raw SRT text.
///
/// Runs of blank lines before a header collapse to one blank line, a missing
/// blank line before a header is inserted, surrounding whitespace is trimmed
/// and exactly one trailing newline is kept. Text inside blocks is untouched.
pub fn normalize(content: &str) -> String {
    let content = canonical_text(content);
    let trimmed = content.trim();
    let lines: Vec<&str> = trimmed.split('\n').collect();

    let mut out: Vec<&str> = Vec::with_capacity(lines.len() + lines.len() / 3);
    for (i, &line) in lines.iter().enumerate() {
        if i > 0 && starts_block(&lines, i) {
            while out.last().is_some_and(|l| l.is_empty()) {
                out.pop();
            }
            if !out.is_empty() {
                out.push("");
            }
        }
        out.push(line);
    }

    let mut result = out.join("\n");
    result.push('\n');
    result
}

/// Normalize an SRT file in place. Returns whether the content changed.
pub fn normalize_file<P: AsRef<Path>>(path: P) -> Result<bool> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read subtitle file: {}", path.display()))?;

    let fixed = normalize(&content);
    if fixed == content {
        debug!("Line breaks already normalized in: {}", path.display());
        return Ok(false);
    }

    fs::write(path, &fixed)
        .with_context(|| format!("Failed to write subtitle file: {}", path.display()))?;
    info!("Normalized line breaks in: {}", path.display());
    Ok(true)
}

/// SRT timestamp, stored as milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Largest value representable with a two-digit hour field
    pub const MAX_MILLIS: u64 = 99 * 3_600_000 + 59 * 60_000 + 59 * 1_000 + 999;

    pub fn from_millis(ms: u64) -> Self {
        Timestamp(ms.min(Self::MAX_MILLIS))
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Build from separate fields, enforcing MM,SS < 60 and mmm < 1000
    pub fn from_parts(hours: u64, minutes: u64, seconds: u64, millis: u64) -> Result<Self, SubtitleError> {
        if hours > 99 || minutes >= 60 || seconds >= 60 || millis >= 1000 {
            return Err(SubtitleError::InvalidTimestamp(format!(
                "{:02}:{:02}:{:02},{:03}",
                hours, minutes, seconds, millis
            )));
        }
        Ok(Timestamp(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis))
    }

    /// Parse `HH:MM:SS,mmm`
    pub fn parse(text: &str) -> Result<Self, SubtitleError> {
        let invalid = || SubtitleError::InvalidTimestamp(text.to_string());
        let bytes = text.as_bytes();
        if bytes.len() != 12 || bytes[2] != b':' || bytes[5] != b':' || bytes[8] != b',' {
            return Err(invalid());
        }

        let field = |range: Range<usize>| -> Result<u64, SubtitleError> {
            let part = &text[range];
            if !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse().map_err(|_| invalid())
        };

        Self::from_parts(field(0..2)?, field(3..5)?, field(6..8)?, field(9..12)?)
    }

    fn from_captures(caps: &regex::Captures, start_idx: usize) -> Result<Self, SubtitleError> {
        let mut fields = [0u64; 4];
        for (offset, slot) in fields.iter_mut().enumerate() {
            *slot = caps
                .get(start_idx + offset)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0);
        }
        Self::from_parts(fields[0], fields[1], fields[2], fields[3])
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let ms = self.0;
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        write!(f, "{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }
}

impl FromStr for Timestamp {
    type Err = SubtitleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// @struct: Single subtitle block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleBlock {
    // @field: Display index as written in the file
    pub index: usize,

    // @field: Start time
    pub start: Timestamp,

    // @field: End time
    pub end: Timestamp,

    // @field: Text lines, first and last never blank
    pub text: Vec<String>,
}

impl SubtitleBlock {
    /// Creates a block, enforcing start <= end and non-empty text
    pub fn new(index: usize, start: Timestamp, end: Timestamp, text: Vec<String>) -> Result<Self, SubtitleError> {
        if end < start {
            return Err(SubtitleError::InvalidTimeRange {
                index,
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        if text.iter().all(|line| line.trim().is_empty()) {
            return Err(SubtitleError::EmptyText { index });
        }

        Ok(SubtitleBlock { index, start, end, text })
    }

    /// Build a block from the lines of one span (index line, timing line, text)
    fn from_lines(lines: &[&str]) -> Result<Self, SubtitleError> {
        let index: usize = lines[0]
            .parse()
            .map_err(|_| SubtitleError::InvalidIndex(lines[0].to_string()))?;

        let caps = TIMING_REGEX
            .captures(lines[1])
            .ok_or_else(|| SubtitleError::InvalidTimestamp(lines[1].to_string()))?;
        let start = Timestamp::from_captures(&caps, 1)?;
        let end = Timestamp::from_captures(&caps, 5)?;

        if caps.get(0).map_or(0, |m| m.end()) < lines[1].len() {
            debug!("Ignoring trailing data on timing line of block {}: {}", index, lines[1]);
        }

        let body = &lines[2..];
        let first = body.iter().position(|l| !l.trim().is_empty());
        let last = body.iter().rposition(|l| !l.trim().is_empty());
        let text = match (first, last) {
            (Some(first), Some(last)) => body[first..=last].iter().map(|l| l.to_string()).collect(),
            _ => Vec::new(),
        };

        Self::new(index, start, end, text)
    }
}

impl fmt::Display for SubtitleBlock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.index)?;
        writeln!(f, "{} --> {}", self.start, self.end)?;
        for line in &self.text {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// Ordered subtitle blocks in presentation order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtitleDocument {
    /// Blocks exactly as they appear in the source; never reordered
    pub blocks: Vec<SubtitleBlock>,
}

impl SubtitleDocument {
    pub fn new(blocks: Vec<SubtitleBlock>) -> Self {
        SubtitleDocument { blocks }
    }

    /// Parse SRT text into blocks.
    ///
    /// Headers whose block is invalid (out-of-range timestamp, end before
    /// start, no text) are skipped with a warning. Fails only when no block
    /// survives.
    pub fn parse(content: &str) -> Result<Self, SubtitleError> {
        let content = canonical_text(content);
        let lines: Vec<&str> = content.split('\n').collect();
        let spans = block_spans(&lines);

        let Some(first) = spans.first() else {
            warn!("No subtitle header found in content");
            return Err(SubtitleError::NoBlocks);
        };

        if lines[..first.start].iter().any(|l| !l.trim().is_empty()) {
            warn!("Ignoring {} line(s) before the first subtitle block", first.start);
        }

        let mut blocks = Vec::with_capacity(spans.len());
        for span in spans {
            let line_no = span.start + 1;
            match SubtitleBlock::from_lines(&lines[span]) {
                Ok(block) => blocks.push(block),
                Err(e) => warn!("Skipping invalid subtitle block at line {}: {}", line_no, e),
            }
        }

        if blocks.is_empty() {
            return Err(SubtitleError::NoBlocks);
        }

        let overlaps = blocks.windows(2).filter(|w| w[0].end > w[1].start).count();
        if overlaps > 0 {
            debug!("Found {} overlapping or out-of-order subtitle blocks", overlaps);
        }

        Ok(SubtitleDocument { blocks })
    }

    /// Serialize with one blank line between blocks and a trailing newline
    pub fn serialize(&self) -> String {
        serialize_blocks(&self.blocks)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SubtitleBlock> {
        self.blocks.iter()
    }
}

/// Serialize a run of blocks in canonical SRT spacing
pub fn serialize_blocks(blocks: &[SubtitleBlock]) -> String {
    blocks
        .iter()
        .map(|block| block.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

impl fmt::Display for SubtitleDocument {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

impl FromStr for SubtitleDocument {
    type Err = SubtitleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'a> IntoIterator for &'a SubtitleDocument {
    type Item = &'a SubtitleBlock;
    type IntoIter = std::slice::Iter<'a, SubtitleBlock>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}
