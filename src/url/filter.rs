use regex::Regex;

/// Links to binary documents that are never worth fetching
const FORBIDDEN_EXTENSIONS: &str = r"(?i).+\.(jpg|jpeg|png|gif|bmp|pdf)(\?.*)?$";

/// Static checks a discovered link must pass before it becomes a crawl task
///
/// The checks here are the ones that only depend on the link itself. The
/// seen-set claim and the cancel flag are consulted by the crawl task, after
/// these checks pass.
#[derive(Debug, Clone)]
pub struct LinkFilter {
    forbidden: Regex,
}

impl LinkFilter {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            forbidden: Regex::new(FORBIDDEN_EXTENSIONS)?,
        })
    }

    /// Returns true if `link` belongs to the site, has no fragment and does
    /// not point at a forbidden file type
    pub fn accepts(&self, link: &str, site_url: &str) -> bool {
        link.starts_with(site_url) && !link.contains('#') && !self.forbidden.is_match(link)
    }
}
