//! Deferred insertion of literal `add_block` content into translated documents.

use log::{info, warn};

use crate::{error::Error, special_cases::AddBlock};

/// Result of applying blocks to one document.
#[derive(Debug, Default)]
pub struct BlockOutcome {
    pub text: String,
    pub applied: usize,
    pub issues: Vec<Error>,
}

/// Inserts each block's content, plus a newline, right before the last `</` in `text`.
///
/// Runs on already-translated output, so inserted content is never translated. The
/// insertion point is recomputed after every block. A document without any closing
/// tag gets an [`Error::UnmatchedInsertionPoint`] per block instead.
pub fn apply_blocks<'a, I>(text: String, blocks: I, path: &str) -> BlockOutcome
where
    I: IntoIterator<Item = &'a AddBlock>,
{
    let mut outcome = BlockOutcome {
        text,
        ..Default::default()
    };

    for block in blocks {
        if block.content.is_empty() {
            continue;
        }
        let Some(pos) = outcome.text.rfind("</") else {
            warn!("Error: closing tag not found to add block in {}", path);
            outcome
                .issues
                .push(Error::UnmatchedInsertionPoint(path.to_string()));
            continue;
        };
        outcome.text.insert_str(pos, &format!("{}\n", block.content));
        outcome.applied += 1;
        info!(
            "Added block to file {}: {} ({} characters)",
            path,
            block.reason.as_deref().unwrap_or("Block addition"),
            block.content.len()
        );
    }
    outcome
}
