/// Data did not fit in the staging buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct BufferOverflow {
    /// Number of bytes that were offered.
    pub requested: usize,
    /// Buffer capacity.
    pub capacity: usize,
}

/// Fixed-capacity staging buffer for the data stage of a control transfer.
///
/// The same buffer carries block-0 commands, download blocks and, for
/// memories that cannot hand out a direct view, upload data.
pub struct TransferBuffer<const N: usize> {
    data: [u8; N],
}

impl<const N: usize> TransferBuffer<N> {
    /// Buffer capacity, equal to the transfer size.
    pub const CAPACITY: usize = N;

    /// Creates a zero-filled buffer.
    pub const fn new() -> Self {
        Self { data: [0; N] }
    }

    /// Copies `src` to the start of the buffer.
    pub fn stage(&mut self, src: &[u8]) -> Result<(), BufferOverflow> {
        if src.len() > N {
            return Err(BufferOverflow {
                requested: src.len(),
                capacity: N,
            });
        }
        self.data[..src.len()].copy_from_slice(src);
        Ok(())
    }

    /// First `len` staged bytes, clamped to the capacity.
    pub fn staged(&self, len: usize) -> &[u8] {
        &self.data[..len.min(N)]
    }

    /// Whole buffer, for memories that read into it.
    pub fn scratch(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Zero the contents.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }
}

impl<const N: usize> Default for TransferBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}
