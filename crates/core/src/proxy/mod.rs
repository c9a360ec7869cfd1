//! Upstream proxy rotation.
//!
//! The [`ProxyList`] is loaded once at startup and shared read-only by every
//! job. Each worker takes its own [`ProxyCursor`], starting at a random
//! offset, and advances it only after a failed fetch. Cursors are not
//! coordinated, so two workers may use the same endpoint at the same time.

use std::path::Path;
use std::sync::Arc;

use rand::Rng;
use tracing::{debug, info};

/// Immutable list of proxy endpoints.
#[derive(Debug, Clone, Default)]
pub struct ProxyList {
    endpoints: Arc<[String]>,
}

impl ProxyList {
    /// Creates a list from endpoints, dropping blanks and comment lines.
    pub fn new<I, S>(endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let endpoints: Vec<String> = endpoints
            .into_iter()
            .map(|p| p.as_ref().trim().to_string())
            .filter(|p| !p.is_empty() && !p.starts_with('#'))
            .collect();
        Self {
            endpoints: endpoints.into(),
        }
    }

    /// An empty list; fetches go out directly and failures back off instead.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses the contents of a proxy file (one endpoint per line).
    pub fn parse(contents: &str) -> Self {
        Self::new(contents.lines())
    }

    /// Loads the proxy file if it exists. A missing file yields an empty list.
    pub async fn load(path: &Path) -> std::io::Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => {
                let list = Self::parse(&contents);
                info!("Loaded {} proxies from {:?}", list.len(), path);
                Ok(list)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No proxy file at {:?}, fetching without proxies", path);
                Ok(Self::empty())
            }
            Err(e) => Err(e),
        }
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.endpoints.get(index).map(String::as_str)
    }

    /// A private cursor for one worker, starting at a random endpoint.
    pub fn cursor(&self) -> ProxyCursor {
        let index = if self.is_empty() {
            None
        } else {
            Some(rand::thread_rng().gen_range(0..self.len()))
        };
        ProxyCursor {
            list: self.clone(),
            index,
        }
    }

    /// A cursor starting at a fixed endpoint.
    pub fn cursor_at(&self, start: usize) -> ProxyCursor {
        let index = if self.is_empty() {
            None
        } else {
            Some(start % self.len())
        };
        ProxyCursor {
            list: self.clone(),
            index,
        }
    }
}

/// Per-worker rotation cursor over a [`ProxyList`].
#[derive(Debug, Clone)]
pub struct ProxyCursor {
    list: ProxyList,
    index: Option<usize>,
}

impl ProxyCursor {
    /// Whether there is anything to rotate through.
    pub fn has_proxies(&self) -> bool {
        self.index.is_some()
    }

    /// The endpoint to use for the next attempt.
    pub fn current(&self) -> Option<&str> {
        self.index.and_then(|i| self.list.get(i))
    }

    /// Moves to the next endpoint, wrapping around.
    pub fn advance(&mut self) {
        if let Some(i) = self.index {
            self.index = Some((i + 1) % self.list.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_skips_blank_and_comment_lines() {
        let list = ProxyList::parse(
            "http://a:8080\n\n  # a comment\n  socks5://b:1080  \n#http://c\nhttp://d\n",
        );
        assert_eq!(list.len(), 3);
        assert_eq!(list.get(0), Some("http://a:8080"));
        assert_eq!(list.get(1), Some("socks5://b:1080"));
        assert_eq!(list.get(2), Some("http://d"));
    }

    #[test]
    fn test_empty_list_cursor() {
        let list = ProxyList::empty();
        let mut cursor = list.cursor();
        assert!(!cursor.has_proxies());
        assert_eq!(cursor.current(), None);
        cursor.advance();
        assert_eq!(cursor.current(), None);
    }

    #[test]
    fn test_cursor_wraps_around() {
        let list = ProxyList::new(["p0", "p1", "p2"]);
        let mut cursor = list.cursor_at(1);
        assert_eq!(cursor.current(), Some("p1"));
        cursor.advance();
        assert_eq!(cursor.current(), Some("p2"));
        cursor.advance();
        assert_eq!(cursor.current(), Some("p0"));
    }

    #[test]
    fn test_random_cursor_starts_in_range() {
        let list = ProxyList::new(["p0", "p1", "p2", "p3"]);
        for _ in 0..50 {
            let cursor = list.cursor();
            assert!(cursor.current().is_some());
        }
    }

    #[test]
    fn test_cursors_are_independent() {
        let list = ProxyList::new(["p0", "p1"]);
        let mut a = list.cursor_at(0);
        let b = list.cursor_at(0);
        a.advance();
        assert_eq!(a.current(), Some("p1"));
        assert_eq!(b.current(), Some("p0"));
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let list = ProxyList::load(&dir.path().join("proxies.txt")).await.unwrap();
        assert!(list.is_empty());
    }

    #[tokio::test]
    async fn test_load_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("proxies.txt");
        std::fs::write(&path, "http://one\n# skip\nhttp://two\n").unwrap();
        let list = ProxyList::load(&path).await.unwrap();
        assert_eq!(list.len(), 2);
    }
}
