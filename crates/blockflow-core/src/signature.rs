use crate::error::SignatureError;

/// Descriptor for how many streams a block's input or output side accepts,
/// and the size of one item on those streams.
///
/// Immutable once constructed. `max_streams` of `None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSignature {
    min_streams: usize,
    max_streams: Option<usize>,
    item_size_bytes: usize,
}

impl StreamSignature {
    /// Constructs a signature, validating `min ≤ max` and `item_size > 0`.
    pub fn new(
        min_streams: usize,
        max_streams: Option<usize>,
        item_size_bytes: usize,
    ) -> Result<Self, SignatureError> {
        if let Some(max) = max_streams {
            if min_streams > max {
                return Err(SignatureError::MinExceedsMax {
                    min: min_streams,
                    max,
                });
            }
        }
        if item_size_bytes == 0 {
            return Err(SignatureError::ZeroItemSize);
        }
        Ok(Self {
            min_streams,
            max_streams,
            item_size_bytes,
        })
    }

    /// A signature requiring exactly `n` streams of `item_size_bytes` each.
    pub fn exact(n: usize, item_size_bytes: usize) -> Result<Self, SignatureError> {
        Self::new(n, Some(n), item_size_bytes)
    }

    /// A signature sized for a Rust type `T`, requiring exactly `n` streams.
    pub fn for_type<T>(n: usize) -> Result<Self, SignatureError> {
        Self::exact(n, std::mem::size_of::<T>())
    }

    #[must_use]
    pub fn min_streams(&self) -> usize {
        self.min_streams
    }

    #[must_use]
    pub fn max_streams(&self) -> Option<usize> {
        self.max_streams
    }

    #[must_use]
    pub fn item_size_bytes(&self) -> usize {
        self.item_size_bytes
    }

    /// Returns `true` if `actual` stream count satisfies `min ≤ actual ≤ max`.
    #[must_use]
    pub fn accepts(&self, actual: usize) -> bool {
        actual >= self.min_streams && self.max_streams.map_or(true, |max| actual <= max)
    }

    /// Validates a connection with `other` (the peer's signature), checking
    /// item-size compatibility. Stream-count validation happens at the
    /// graph level, where the actual fan-out/fan-in is known.
    pub fn check_compatible(&self, other: &Self) -> Result<(), SignatureError> {
        if self.item_size_bytes != other.item_size_bytes {
            return Err(SignatureError::ItemSizeMismatch {
                expected: self.item_size_bytes,
                found: other.item_size_bytes,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_within_bounds() {
        let sig = StreamSignature::new(1, Some(4), 8).unwrap();
        assert!(!sig.accepts(0));
        assert!(sig.accepts(1));
        assert!(sig.accepts(4));
        assert!(!sig.accepts(5));
    }

    #[test]
    fn unbounded_max_accepts_anything_above_min() {
        let sig = StreamSignature::new(1, None, 4).unwrap();
        assert!(sig.accepts(1_000));
    }

    #[test]
    fn rejects_min_above_max() {
        assert!(matches!(
            StreamSignature::new(5, Some(2), 4),
            Err(SignatureError::MinExceedsMax { min: 5, max: 2 })
        ));
    }

    #[test]
    fn rejects_zero_item_size() {
        assert!(matches!(
            StreamSignature::new(0, None, 0),
            Err(SignatureError::ZeroItemSize)
        ));
    }

    #[test]
    fn for_type_matches_size_of() {
        let sig = StreamSignature::for_type::<f32>(1).unwrap();
        assert_eq!(sig.item_size_bytes(), 4);
    }
}
