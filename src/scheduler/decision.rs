/// Channel choices made by one assignment pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// (index into the queued pool, channel), in the order they were placed
    pub assignments: Vec<(usize, usize)>,

    /// Round-robin cursor to use on the next pass
    pub next_cursor: usize,
}

impl Placement {
    pub fn new(next_cursor: usize) -> Self {
        Self {
            assignments: Vec::new(),
            next_cursor,
        }
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// What happened during one scheduler step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Decode cycles simulated in this step
    pub cycles: u64,

    /// Requests that reached their output target and left the batch
    pub completed: usize,

    /// Requests drawn from the template pool and placed on channels
    pub admitted: usize,
}
