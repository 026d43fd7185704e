//! Byte ranges into source text.

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ByteIndex(pub u32);

/// Half-open byte range `start..end`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: ByteIndex,
    pub end: ByteIndex,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self {
            start: ByteIndex(start),
            end: ByteIndex(end),
        }
    }

    /// Empty span at `at`, used for end-of-input positions.
    pub fn point(at: u32) -> Self {
        Self::new(at, at)
    }

    /// Moves the range `by` bytes forward; spans from an interpolated
    /// snippet are relative to the snippet.
    pub fn shifted(self, by: u32) -> Self {
        Self::new(self.start.0 + by, self.end.0 + by)
    }
}
