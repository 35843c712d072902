use crate::error::{LoadError, Result};

/// Splits an iterator into consecutive chunks of `size` items.
///
/// Only the chunk being built is buffered. The last chunk holds the remainder
/// and no empty chunk is ever produced.
pub struct Batches<I> {
    iter: I,
    size: usize,
}

/// Rejects a chunk size of zero.
pub fn batch_size(size: usize) -> Result<usize> {
    if size == 0 {
        return Err(LoadError::InvalidConfiguration(
            "batch size must be positive".to_string(),
        ));
    }
    Ok(size)
}

pub fn batched<I: Iterator>(iter: I, size: usize) -> Result<Batches<I>> {
    let size = batch_size(size)?;
    Ok(Batches { iter, size })
}

impl<I> Batches<I> {
    pub fn size(&self) -> usize {
        self.size
    }

    /// The wrapped iterator, e.g. to read a source's counters after draining.
    pub fn get_ref(&self) -> &I {
        &self.iter
    }

    pub fn get_mut(&mut self) -> &mut I {
        &mut self.iter
    }
}

impl<I: Iterator> Iterator for Batches<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk: Vec<I::Item> = self.iter.by_ref().take(self.size).collect();
        if chunk.is_empty() {
            None
        } else {
            Some(chunk)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (lo, hi) = self.iter.size_hint();
        (lo.div_ceil(self.size), hi.map(|h| h.div_ceil(self.size)))
    }
}
