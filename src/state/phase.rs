/// Lifecycle of a full indexing run
///
/// ```text
/// Idle -> Crawling { remaining } -> Finalizing -> Idle
///            \____ stop ______________________/
/// ```
///
/// `remaining` counts the site crawls that have not reported completion.
/// The site that brings it to zero moves the run to `Finalizing` and is the
/// only one that runs reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexingPhase {
    Idle,
    Crawling { remaining: usize },
    Finalizing,
}

impl IndexingPhase {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Records that one site crawl finished
    ///
    /// Returns true exactly once per run: for the call that enters
    /// `Finalizing`. Calls in any other phase are ignored.
    pub fn complete_site(&mut self) -> bool {
        match *self {
            Self::Crawling { remaining } if remaining <= 1 => {
                *self = Self::Finalizing;
                true
            }
            Self::Crawling { remaining } => {
                *self = Self::Crawling {
                    remaining: remaining - 1,
                };
                false
            }
            Self::Idle | Self::Finalizing => false,
        }
    }
}

impl Default for IndexingPhase {
    fn default() -> Self {
        Self::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_site_enters_finalizing() {
        let mut phase = IndexingPhase::Crawling { remaining: 3 };

        assert!(!phase.complete_site());
        assert!(!phase.complete_site());
        assert!(phase.complete_site());
        assert_eq!(phase, IndexingPhase::Finalizing);
    }

    #[test]
    fn test_completion_after_stop_is_ignored() {
        let mut phase = IndexingPhase::Idle;
        assert!(!phase.complete_site());
        assert_eq!(phase, IndexingPhase::Idle);
    }

    #[test]
    fn test_finalizing_is_entered_once() {
        let mut phase = IndexingPhase::Crawling { remaining: 1 };
        assert!(phase.complete_site());
        assert!(!phase.complete_site());
    }
}
