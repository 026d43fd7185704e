//! Line lookup for byte offsets.

/// Offsets of every line start in a script.
#[derive(Clone, Debug)]
pub struct SourceText {
    line_starts: Vec<u32>,
    len: u32,
}

impl SourceText {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0u32];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| (i + 1) as u32),
        );
        Self {
            line_starts,
            len: text.len() as u32,
        }
    }

    /// One-based line containing `byte`; offsets past the end fall on the
    /// last line.
    pub fn line_of(&self, byte: u32) -> u32 {
        match self.line_starts.binary_search(&byte.min(self.len)) {
            Ok(i) => i as u32 + 1,
            Err(i) => i as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_one_based() {
        let src = SourceText::new("a = 1\nb = 2\n\nc");
        assert_eq!(src.line_of(0), 1);
        assert_eq!(src.line_of(5), 1);
        assert_eq!(src.line_of(6), 2);
        assert_eq!(src.line_of(12), 3);
        assert_eq!(src.line_of(13), 4);
        assert_eq!(src.line_of(999), 4);
    }
}
