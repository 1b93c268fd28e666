// Circular back-reference history for the ShadeLz decoder.
//
// Every byte the decoder emits is fed into this ring; match instructions
// read back through it at a given displacement. The write cursor is logical
// and monotonic, mapped modulo the capacity on access, so the displacement
// arithmetic stays explicit instead of hiding behind wrap-around indexing.

/// Ring capacity in bytes. Displacements are encoded in 13 bits
/// (`(flag & 0x1F) << 8 | next`), so the window never exceeds 0x1FFF.
pub const HISTORY_CAPACITY: usize = 0x1FFF;

pub struct CircularHistory {
    buf: Box<[u8; HISTORY_CAPACITY]>,
    /// Logical write position; total bytes pushed so far.
    cursor: usize,
}

impl CircularHistory {
    pub fn new() -> Self {
        Self {
            buf: Box::new([0u8; HISTORY_CAPACITY]),
            cursor: 0,
        }
    }

    /// Total bytes pushed (not clamped to capacity).
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Record one emitted byte.
    #[inline]
    pub fn push(&mut self, byte: u8) {
        self.buf[self.cursor % HISTORY_CAPACITY] = byte;
        self.cursor += 1;
    }

    /// Read the byte `displacement` positions behind the write cursor.
    ///
    /// Positions that were never written read as zero (the ring starts
    /// zero-initialized); observed streams never reference them.
    #[inline]
    pub fn read_back(&self, displacement: usize) -> u8 {
        let idx = (self.cursor + HISTORY_CAPACITY - (displacement % HISTORY_CAPACITY))
            % HISTORY_CAPACITY;
        self.buf[idx]
    }

    /// Copy `length` bytes from `displacement` behind the cursor into `out`,
    /// feeding each copied byte back into the ring one at a time.
    ///
    /// The per-byte feedback is what makes self-overlapping copies work:
    /// once `length > displacement`, later reads observe bytes written by
    /// earlier iterations of the same copy.
    pub fn copy(&mut self, displacement: usize, length: usize, out: &mut Vec<u8>) {
        for _ in 0..length {
            let byte = self.read_back(displacement);
            out.push(byte);
            self.push(byte);
        }
    }
}

impl Default for CircularHistory {
    fn default() -> Self {
        Self::new()
    }
}
