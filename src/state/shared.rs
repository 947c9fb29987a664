use dashmap::DashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// URLs claimed by crawl tasks during the current run
///
/// Shared by every site; `claim` is the only dedup gate.
#[derive(Debug, Default)]
pub struct SeenUrls {
    urls: DashSet<String>,
}

impl SeenUrls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically inserts `url`; returns false if it was already claimed
    pub fn claim(&self, url: &str) -> bool {
        self.urls.insert(url.to_string())
    }

    pub fn clear(&self) {
        self.urls.clear();
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// Process-wide cancellation flag
///
/// Set once by a stop request and cleared only by the next start.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    flag: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// The underlying atomic, for code that only needs to observe it
    pub fn as_atomic(&self) -> &AtomicBool {
        &self.flag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_is_exclusive() {
        let seen = SeenUrls::new();
        assert!(seen.claim("https://example.com/a"));
        assert!(!seen.claim("https://example.com/a"));
        assert_eq!(seen.len(), 1);

        seen.clear();
        assert!(seen.is_empty());
        assert!(seen.claim("https://example.com/a"));
    }

    #[test]
    fn test_concurrent_claims() {
        let seen = Arc::new(SeenUrls::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let seen = Arc::clone(&seen);
                std::thread::spawn(move || {
                    (0..100)
                        .filter(|i| seen.claim(&format!("https://example.com/{}", i)))
                        .count()
                })
            })
            .collect();

        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn test_cancel_flag_shared_between_clones() {
        let flag = CancelFlag::new();
        let clone = flag.clone();

        clone.set();
        assert!(flag.is_set());
        assert!(flag.as_atomic().load(Ordering::SeqCst));

        flag.reset();
        assert!(!clone.is_set());
    }
}
