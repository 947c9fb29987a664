use parking_lot::Mutex;
use std::sync::Arc;

/// One URL in a site's crawl tree
///
/// Children are attached by the task that discovered them, so the finished
/// tree mirrors the order in which links were first claimed.
#[derive(Debug)]
pub struct CrawlNode {
    url: String,
    children: Mutex<Vec<Arc<CrawlNode>>>,
}

impl CrawlNode {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            children: Mutex::new(Vec::new()),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Creates a child for `url` and returns it
    pub fn add_child(&self, url: impl Into<String>) -> Arc<CrawlNode> {
        let child = Arc::new(CrawlNode::new(url));
        self.children.lock().push(Arc::clone(&child));
        child
    }

    /// Snapshot of the current children
    pub fn children(&self) -> Vec<Arc<CrawlNode>> {
        self.children.lock().clone()
    }

    /// Number of nodes below this one
    pub fn descendant_count(&self) -> usize {
        self.children()
            .iter()
            .map(|child| 1 + child.descendant_count())
            .sum()
    }
}
