//! Undo/redo history of document states
//!
//! Each entry is a zstd-compressed JSON snapshot of a [`DocumentState`].
//! Callers checkpoint the state *before* a mutation; undoing trades the
//! current state for the most recent checkpoint and keeps the current one
//! for redo. Snapshots carry the ordinal counter as it was; callers that
//! must never reuse an ordinal advance it after restoring.

use std::collections::VecDeque;

use crate::constants::defaults;
use crate::document::DocumentState;
use crate::error::{CompilerError, Result};

const COMPRESSION_LEVEL: i32 = 3;

/// Bounded undo/redo stacks of compressed snapshots
pub struct UndoStack {
    past: VecDeque<Vec<u8>>,
    future: Vec<Vec<u8>>,
    depth: usize,
}

impl UndoStack {
    /// Create a stack keeping at most `depth` undo steps
    pub fn new(depth: usize) -> Self {
        Self {
            past: VecDeque::new(),
            future: Vec::new(),
            depth: depth.max(1),
        }
    }

    /// Record the state about to be changed; clears redo history
    pub fn checkpoint(&mut self, document: &DocumentState) -> Result<()> {
        let snapshot = compress(document)?;
        self.past.push_back(snapshot);
        while self.past.len() > self.depth {
            self.past.pop_front();
        }
        self.future.clear();
        Ok(())
    }

    /// Step back, returning the state to restore
    ///
    /// `current` is kept for redo. Returns `None` when there is nothing to undo.
    pub fn undo(&mut self, current: &DocumentState) -> Option<Result<DocumentState>> {
        let snapshot = self.past.pop_back()?;
        Some(compress(current).and_then(|kept| {
            self.future.push(kept);
            decompress(&snapshot)
        }))
    }

    /// Step forward again after an undo
    pub fn redo(&mut self, current: &DocumentState) -> Option<Result<DocumentState>> {
        let snapshot = self.future.pop()?;
        Some(compress(current).and_then(|kept| {
            self.past.push_back(kept);
            decompress(&snapshot)
        }))
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }

    /// Total compressed size of all snapshots
    pub fn compressed_size(&self) -> usize {
        self.past.iter().chain(self.future.iter()).map(Vec::len).sum()
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(defaults::HISTORY_DEPTH)
    }
}

fn compress(document: &DocumentState) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(document)?;
    zstd::encode_all(&json[..], COMPRESSION_LEVEL).map_err(|e| CompilerError::Compression(e.to_string()))
}

fn decompress(snapshot: &[u8]) -> Result<DocumentState> {
    let json = zstd::decode_all(snapshot).map_err(|e| CompilerError::Compression(e.to_string()))?;
    Ok(serde_json::from_slice(&json)?)
}
