//! Memory arena backing cache values
//!
//! Each grid node owns one fixed-capacity arena. Cache entries keep only an
//! offset and length into it, so the arena bounds how much value data the node
//! will hold.

use crate::error::{GridError, Result};
use std::collections::BTreeMap;

/// Configuration for the memory arena
#[derive(Clone, Debug)]
pub struct ArenaConfig {
    /// Total size of the arena in bytes
    pub size: usize,
    /// Alignment for allocations, must be a power of two
    pub alignment: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            size: 64 * 1024 * 1024, // 64MB default
            alignment: 8,
        }
    }
}

/// Bump allocator with a coalescing free list
struct BlockAllocator {
    /// High-water mark of the bump region
    offset: usize,
    capacity: usize,
    alignment: usize,
    /// Free blocks: offset -> size, never adjacent to each other
    free_list: BTreeMap<usize, usize>,
    /// Bytes currently handed out
    in_use: usize,
}

impl BlockAllocator {
    fn new(capacity: usize, alignment: usize) -> Self {
        Self {
            offset: 0,
            capacity,
            alignment,
            free_list: BTreeMap::new(),
            in_use: 0,
        }
    }

    fn align(&self, size: usize) -> usize {
        (size + self.alignment - 1) & !(self.alignment - 1)
    }

    fn allocate(&mut self, size: usize) -> Option<usize> {
        let size = self.align(size.max(1));

        // First fit from the free list
        let found = self
            .free_list
            .iter()
            .find(|(_, block_size)| **block_size >= size)
            .map(|(&offset, &block_size)| (offset, block_size));

        if let Some((offset, block_size)) = found {
            self.free_list.remove(&offset);
            if block_size > size {
                self.free_list.insert(offset + size, block_size - size);
            }
            self.in_use += size;
            return Some(offset);
        }

        if self.offset + size > self.capacity {
            return None;
        }
        let offset = self.offset;
        self.offset += size;
        self.in_use += size;
        Some(offset)
    }

    fn deallocate(&mut self, offset: usize, size: usize) {
        let mut offset = offset;
        let mut size = self.align(size.max(1));
        self.in_use = self.in_use.saturating_sub(size);

        // Merge with the preceding block
        if let Some((&prev, &prev_size)) = self.free_list.range(..offset).next_back() {
            if prev + prev_size == offset {
                self.free_list.remove(&prev);
                offset = prev;
                size += prev_size;
            }
        }
        // Merge with the following block
        if let Some(&next_size) = self.free_list.get(&(offset + size)) {
            self.free_list.remove(&(offset + size));
            size += next_size;
        }

        if offset + size == self.offset {
            // Block touches the bump region, give it back
            self.offset = offset;
        } else {
            self.free_list.insert(offset, size);
        }
    }

    /// Take back a block freed by `deallocate` that has not been handed out since
    fn reclaim(&mut self, offset: usize, size: usize) {
        let size = self.align(size.max(1));
        let end = offset + size;

        if offset >= self.offset {
            // Block went back to the bump region
            if offset > self.offset {
                self.free_list.insert(self.offset, offset - self.offset);
            }
            self.offset = self.offset.max(end);
        } else if let Some((&start, &len)) = self.free_list.range(..=offset).next_back() {
            self.free_list.remove(&start);
            if start < offset {
                self.free_list.insert(start, offset - start);
            }
            if end < start + len {
                self.free_list.insert(end, start + len - end);
            }
        }
        self.in_use += size;
    }

    fn available(&self) -> usize {
        self.capacity - self.offset + self.free_list.values().sum::<usize>()
    }

    fn reset(&mut self) {
        self.offset = 0;
        self.in_use = 0;
        self.free_list.clear();
    }
}

/// A reserved region of the arena
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArenaSlot {
    pub offset: usize,
    pub len: usize,
}

/// Fixed-capacity byte arena
pub struct MemoryArena {
    buffer: Vec<u8>,
    allocator: BlockAllocator,
}

impl MemoryArena {
    pub fn new(config: ArenaConfig) -> Result<Self> {
        if config.size == 0 {
            return Err(GridError::config("memory arena size must be non-zero"));
        }
        if !config.alignment.is_power_of_two() {
            return Err(GridError::config(format!(
                "arena alignment {} is not a power of two",
                config.alignment
            )));
        }
        Ok(Self {
            buffer: vec![0u8; config.size],
            allocator: BlockAllocator::new(config.size, config.alignment),
        })
    }

    /// Copy `data` into a freshly allocated slot
    pub fn store(&mut self, data: &[u8]) -> Result<ArenaSlot> {
        let offset = self
            .allocator
            .allocate(data.len())
            .ok_or_else(|| GridError::MemoryExhausted {
                requested: data.len(),
                available: self.allocator.available(),
            })?;
        self.buffer[offset..offset + data.len()].copy_from_slice(data);
        Ok(ArenaSlot {
            offset,
            len: data.len(),
        })
    }

    /// Release a slot previously returned by `store`
    pub fn release(&mut self, slot: ArenaSlot) {
        self.allocator.deallocate(slot.offset, slot.len);
    }

    /// Undo a `release` when nothing was stored in between
    pub fn reclaim(&mut self, slot: ArenaSlot) {
        self.allocator.reclaim(slot.offset, slot.len);
    }

    pub fn read(&self, slot: ArenaSlot) -> Result<&[u8]> {
        self.buffer
            .get(slot.offset..slot.offset + slot.len)
            .ok_or_else(|| GridError::binary("arena read exceeds bounds"))
    }

    /// Drop every allocation at once
    pub fn reset(&mut self) {
        self.allocator.reset();
    }

    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            total: self.buffer.len(),
            used: self.allocator.in_use,
            available: self.allocator.available(),
        }
    }
}

/// Arena statistics
#[derive(Clone, Debug)]
pub struct ArenaStats {
    pub total: usize,
    pub used: usize,
    pub available: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena(size: usize) -> MemoryArena {
        MemoryArena::new(ArenaConfig {
            size,
            alignment: 8,
        })
        .unwrap()
    }

    #[test]
    fn test_store_and_read() {
        let mut arena = arena(4096);

        let slot = arena.store(b"Hello, grid!").unwrap();
        assert_eq!(slot.offset, 0);
        assert_eq!(arena.read(slot).unwrap(), b"Hello, grid!");

        let second = arena.store(b"second").unwrap();
        assert_eq!(second.offset, 16);
    }

    #[test]
    fn test_exhaustion() {
        let mut arena = arena(64);
        arena.store(&[1u8; 48]).unwrap();
        let err = arena.store(&[2u8; 32]).unwrap_err();
        assert!(matches!(
            err,
            GridError::MemoryExhausted {
                requested: 32,
                available: 16
            }
        ));
    }

    #[test]
    fn test_release_coalesces_blocks() {
        let mut arena = arena(64);
        let a = arena.store(&[1u8; 16]).unwrap();
        let b = arena.store(&[2u8; 16]).unwrap();
        let c = arena.store(&[3u8; 16]).unwrap();
        let _d = arena.store(&[4u8; 16]).unwrap();
        assert_eq!(arena.stats().available, 0);

        arena.release(a);
        arena.release(c);
        arena.release(b);

        // a, b and c merged into one 48 byte block
        let big = arena.store(&[5u8; 48]).unwrap();
        assert_eq!(big.offset, 0);
    }

    #[test]
    fn test_release_tail_returns_to_bump_region() {
        let mut arena = arena(64);
        let a = arena.store(&[1u8; 8]).unwrap();
        let b = arena.store(&[2u8; 8]).unwrap();
        arena.release(b);
        arena.release(a);

        let stats = arena.stats();
        assert_eq!(stats.used, 0);
        assert_eq!(stats.available, 64);
    }

    #[test]
    fn test_reset_frees_everything() {
        let mut arena = arena(64);
        arena.store(&[1u8; 40]).unwrap();
        arena.store(&[2u8; 8]).unwrap();
        arena.reset();

        let stats = arena.stats();
        assert_eq!(stats.used, 0);
        assert_eq!(stats.available, stats.total);
        assert_eq!(arena.store(&[3u8; 64]).unwrap().offset, 0);
    }

    #[test]
    fn test_reclaim_undoes_release() {
        let mut arena = arena(64);
        let a = arena.store(&[1u8; 16]).unwrap();
        let b = arena.store(&[2u8; 16]).unwrap();
        let _c = arena.store(&[3u8; 16]).unwrap();

        // b sits between live blocks, so it lands on the free list
        arena.release(b);
        arena.reclaim(b);
        assert_eq!(arena.stats().used, 48);
        assert_eq!(arena.store(&[4u8; 16]).unwrap().offset, 48);

        // a merges with nothing and stays on the free list too
        arena.release(a);
        arena.reclaim(a);
        assert_eq!(arena.read(a).unwrap(), &[1u8; 16]);
        assert_eq!(arena.stats().available, 0);
    }

    #[test]
    fn test_reclaim_from_bump_region() {
        let mut arena = arena(64);
        let a = arena.store(&[1u8; 8]).unwrap();
        let b = arena.store(&[2u8; 8]).unwrap();
        arena.release(a);
        // b touches the bump region and pulls a back with it
        arena.release(b);
        arena.reclaim(b);

        let stats = arena.stats();
        assert_eq!(stats.used, 8);
        assert_eq!(stats.available, 56);
        assert_eq!(arena.store(&[3u8; 8]).unwrap().offset, 0);
        assert_eq!(arena.read(b).unwrap(), &[2u8; 8]);
    }

    #[test]
    fn test_rejects_bad_alignment() {
        let result = MemoryArena::new(ArenaConfig {
            size: 64,
            alignment: 3,
        });
        assert!(result.is_err());
    }
}
