//! Trace segmentation
//!
//! Splits a line stream into event blocks. A block is a maximal run of
//! non-blank lines; blank lines end the current block and are dropped.

use std::iter::Fuse;

/// Lazy iterator over the event blocks of a line stream
///
/// Never yields an empty block. A trailing block without a terminating blank
/// line is still yielded at end of input.
pub struct LogSegmenter<I> {
    lines: Fuse<I>,
}

impl<I, S> LogSegmenter<I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    /// Create a segmenter over any sequence of lines
    pub fn new<T>(lines: T) -> Self
    where
        T: IntoIterator<IntoIter = I>,
    {
        Self {
            lines: lines.into_iter().fuse(),
        }
    }
}

/// True for lines made only of whitespace
pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

impl<I, S> Iterator for LogSegmenter<I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut block = Vec::new();

        for line in self.lines.by_ref() {
            let line = line.as_ref();
            if is_blank(line) {
                if !block.is_empty() {
                    return Some(block);
                }
            } else {
                // Line terminators are not part of the content
                block.push(line.trim_end_matches(&['\r', '\n'][..]).to_string());
            }
        }

        if block.is_empty() {
            None
        } else {
            Some(block)
        }
    }
}
