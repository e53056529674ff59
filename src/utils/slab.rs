/// Slot storage with stable keys and slot reuse.
pub(crate) struct Slab<T> {
    items: Vec<Option<T>>,
    free: Vec<usize>,
}

impl<T> Slab<T> {
    pub(crate) const fn new() -> Self {
        Self {
            items: Vec::new(),
            free: Vec::new(),
        }
    }

    pub(crate) fn insert(&mut self, item: T) -> usize {
        let index = if let Some(i) = self.free.pop() {
            self.items[i] = Some(item);
            i
        } else {
            self.items.push(Some(item));
            self.items.len() - 1
        };

        index
    }

    /// Removes the item at `index`. Returns `None` for a vacant or unknown key.
    pub(crate) fn try_remove(&mut self, index: usize) -> Option<T> {
        let item = self.items.get_mut(index)?.take()?;

        self.free.push(index);

        Some(item)
    }

    /// Removes every item, in key order.
    pub(crate) fn drain(&mut self) -> Vec<T> {
        self.free.clear();

        self.items.drain(..).flatten().collect()
    }
}

impl<T> Default for Slab<T> {
    fn default() -> Self {
        Self::new()
    }
}
