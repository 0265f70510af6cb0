//! Flush policy for write operations.

/// Controls whether a write invalidates the decorator's namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushPolicy {
    /// Flush after the write. When false, nothing is ever flushed.
    pub flush_cache: bool,
    /// Flush even if the write did not succeed.
    pub force_flush: bool,
}

impl Default for FlushPolicy {
    fn default() -> Self {
        Self {
            flush_cache: true,
            force_flush: false,
        }
    }
}

impl FlushPolicy {
    /// Never flush.
    pub fn keep() -> Self {
        Self {
            flush_cache: false,
            force_flush: false,
        }
    }

    /// Flush whatever the outcome.
    pub fn force() -> Self {
        Self {
            flush_cache: true,
            force_flush: true,
        }
    }

    pub fn should_flush(&self, succeeded: bool) -> bool {
        self.flush_cache && (succeeded || self.force_flush)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_flush() {
        assert!(FlushPolicy::default().should_flush(true));
        assert!(!FlushPolicy::default().should_flush(false));
        assert!(FlushPolicy::force().should_flush(false));
        assert!(!FlushPolicy::keep().should_flush(true));

        let forced_but_disabled = FlushPolicy {
            flush_cache: false,
            force_flush: true,
        };
        assert!(!forced_but_disabled.should_flush(true));
    }
}
