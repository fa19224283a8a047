use tracing::{debug, trace};

/// Fixed-capacity circular buffer that overwrites its oldest entry when full
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    /// Entry slots, `None` until first written
    slots: Vec<Option<T>>,
    /// Total number of pushes; the next write goes to `write_index % capacity`
    write_index: usize,
    /// Total capacity of the buffer
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// Create a new ring buffer; a zero capacity is raised to one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);

        debug!("Created ring buffer with capacity {}", capacity);

        Self {
            slots,
            write_index: 0,
            capacity,
        }
    }

    /// Push an entry, overwriting the oldest one when full
    pub fn push(&mut self, entry: T) {
        let index = self.write_index % self.capacity;
        if self.slots[index].is_some() {
            trace!("Ring buffer overwriting slot {}", index);
        }
        self.slots[index] = Some(entry);
        self.write_index += 1;
    }

    /// Most recently pushed entry
    pub fn latest(&self) -> Option<&T> {
        if self.write_index == 0 {
            return None;
        }
        self.slots[(self.write_index - 1) % self.capacity].as_ref()
    }

    /// Entries ordered oldest first
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let start = if self.write_index > self.capacity {
            self.write_index % self.capacity
        } else {
            0
        };
        (0..self.capacity)
            .map(move |offset| (start + offset) % self.capacity)
            .filter_map(move |index| self.slots[index].as_ref())
    }

    pub fn len(&self) -> usize {
        self.write_index.min(self.capacity)
    }

    pub fn is_empty(&self) -> bool {
        self.write_index == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.write_index = 0;
        trace!("Ring buffer cleared");
    }
}
