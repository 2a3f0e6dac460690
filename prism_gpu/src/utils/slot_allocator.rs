/// Allocates and recycles unique `u32` indices.
///
/// Backs the texture id space of a device context: every texture gets a
/// stable slot usable as an index into shader-visible descriptor tables.
/// The first `reserved` indices are never handed out (slot 0 is the "no
/// texture" id). Freed indices are recycled on subsequent allocations.
///
/// # Example
///
/// ```ignore
/// let mut alloc = SlotAllocator::with_reserved(1);
/// let a = alloc.alloc();  // 1
/// let b = alloc.alloc();  // 2
/// alloc.free(a);          // 1 is now available
/// let c = alloc.alloc();  // 1 (recycled)
/// ```
pub struct SlotAllocator {
    free_list: Vec<u32>,
    live: Vec<bool>,
    reserved: u32,
    len: u32,
}

impl SlotAllocator {
    /// Create a new empty allocator starting at index 0
    pub fn new() -> Self {
        Self::with_reserved(0)
    }

    /// Create an allocator whose first `reserved` indices are never allocated
    pub fn with_reserved(reserved: u32) -> Self {
        Self {
            free_list: Vec::new(),
            live: vec![false; reserved as usize],
            reserved,
            len: 0,
        }
    }

    /// Allocate the next available slot index
    pub fn alloc(&mut self) -> u32 {
        self.len += 1;
        let id = self.free_list.pop().unwrap_or_else(|| {
            self.live.push(false);
            self.live.len() as u32 - 1
        });
        self.live[id as usize] = true;
        id
    }

    /// Return a slot index to the pool for reuse
    ///
    /// Returns false (and changes nothing) for reserved, unknown or already
    /// freed indices.
    pub fn free(&mut self, id: u32) -> bool {
        if id < self.reserved || !self.is_live(id) {
            return false;
        }
        self.live[id as usize] = false;
        self.len -= 1;
        self.free_list.push(id);
        true
    }

    /// Whether `id` is currently allocated
    pub fn is_live(&self, id: u32) -> bool {
        self.live.get(id as usize).copied().unwrap_or(false)
    }

    /// Highest index ever allocated + 1 (reserved indices included).
    ///
    /// This is the minimum capacity the backing table must have
    /// to accommodate all allocated indices.
    pub fn high_water_mark(&self) -> u32 {
        self.live.len() as u32
    }

    /// Number of currently allocated slots
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Whether no slots are currently allocated
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for SlotAllocator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "slot_allocator_tests.rs"]
mod tests;
