//! Byte-addressable, zero-initialized memory that grows on demand.
//!
//! Reads never allocate: any address past the current capacity reads as 0.
//! Writes grow the backing storage first, to at least 1.5x the current size
//! (or exactly the requested size when that is larger), zero-filling the new
//! region.

/// The interpreter's memory tape.
#[derive(Debug, Default, Clone)]
pub struct Tape {
    cells: Vec<u8>,
    growths: usize,
}

impl Tape {
    /// Create an empty tape. No storage is allocated until the first write.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the cell at `index`. Never grows the tape.
    pub fn get(&self, index: usize) -> u8 {
        self.cells.get(index).copied().unwrap_or(0)
    }

    /// Mutable access to the cell at `index`, growing the tape to cover it.
    pub fn cell_mut(&mut self, index: usize) -> &mut u8 {
        self.reserve_cell(index);
        &mut self.cells[index]
    }

    /// Write `value` to the cell at `index`, growing the tape to cover it.
    pub fn set(&mut self, index: usize, value: u8) {
        *self.cell_mut(index) = value;
    }

    /// Current physical capacity in cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// How many times the backing storage has been resized.
    pub fn growth_count(&self) -> usize {
        self.growths
    }

    fn reserve_cell(&mut self, index: usize) {
        // Growing to cover usize::MAX is impossible anyway; let the allocator abort.
        let needed = index.saturating_add(1);
        let current = self.cells.len();
        if current >= needed {
            return;
        }

        let geometric = current.saturating_mul(3) / 2;
        let new_size = geometric.max(needed);
        self.cells.resize(new_size, 0);
        self.growths += 1;
        log::trace!("tape grew from {current} to {new_size} cells");
    }
}
