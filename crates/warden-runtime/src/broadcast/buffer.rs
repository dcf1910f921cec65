//! Pending debug lines awaiting a flush.

/// Ordered lines plus a generation counter.
///
/// The generation advances every time the buffer is drained, so a delayed
/// flush scheduled for an earlier batch can tell that its batch is gone.
#[derive(Debug, Default)]
pub struct LogBuffer {
    lines: Vec<String>,
    generation: u64,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line and return the new length.
    pub fn push(&mut self, line: String) -> usize {
        self.lines.push(line);
        self.lines.len()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Drain the buffer, returning the lines joined with newlines.
    ///
    /// Returns `None` (and leaves the generation alone) when empty.
    pub fn take(&mut self) -> Option<String> {
        if self.lines.is_empty() {
            return None;
        }
        self.generation = self.generation.wrapping_add(1);
        Some(std::mem::take(&mut self.lines).join("\n"))
    }

    /// Drain only if no flush happened since `generation` was observed.
    pub fn take_if_generation(&mut self, generation: u64) -> Option<String> {
        if self.generation == generation {
            self.take()
        } else {
            None
        }
    }
}
