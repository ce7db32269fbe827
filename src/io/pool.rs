/// Fixed-capacity slot arena keyed by index
///
/// All storage is reserved up front, so allocating and releasing entries never touches the heap.
/// This keeps it usable from the tick path.
pub(crate) struct Pool<T> {
    slots: Vec<Option<T>>,
    free: Vec<usize>,
}

impl<T> Pool<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Pool {
            slots: (0..capacity).map(|_| None).collect(),
            // lowest index is handed out first
            free: (0..capacity).rev().collect(),
        }
    }

    /// Stores `item` in a free slot, handing it back when the pool is exhausted
    pub fn allocate(&mut self, item: T) -> Result<usize, T> {
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(item);
                Ok(index)
            }
            None => Err(item),
        }
    }

    /// Takes the entry out of its slot and returns the slot to the free list
    pub fn release(&mut self, index: usize) -> Option<T> {
        let item = self.slots.get_mut(index)?.take()?;
        self.free.push(index);
        Some(item)
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index)?.as_ref()
    }

    pub fn in_use(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}
