//! Breadth-first crawl frontier: a FIFO of pending URLs plus the visited set.

use std::collections::{HashSet, VecDeque};

use crate::filter::NormalizedUrl;

/// Pending and visited URLs for a single crawl run
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<NormalizedUrl>,
    queued: HashSet<NormalizedUrl>,
    visited: HashSet<NormalizedUrl>,
}

impl Frontier {
    /// Constructs a new, empty frontier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a URL unless it is missing, already visited or already queued.
    ///
    /// Returns whether the URL was added.
    pub fn enqueue(&mut self, url: Option<NormalizedUrl>) -> bool {
        let Some(url) = url else {
            return false;
        };
        if self.visited.contains(&url) || self.queued.contains(&url) {
            return false;
        }
        self.queued.insert(url.clone());
        self.queue.push_back(url);
        true
    }

    /// Pops the next unvisited URL and marks it visited immediately, so a URL
    /// rediscovered while its capture is in flight is never captured twice.
    pub fn dequeue(&mut self) -> Option<NormalizedUrl> {
        while let Some(url) = self.queue.pop_front() {
            self.queued.remove(&url);
            if self.visited.insert(url.clone()) {
                return Some(url);
            }
            ::log::trace!("Skipping already visited: {}", url);
        }
        None
    }

    /// Stop condition of the crawl loop
    pub fn is_exhausted_or_bounded(&self, max_pages: usize, captured: usize) -> bool {
        self.queue.is_empty() || captured >= max_pages
    }

    /// Number of URLs waiting in the queue
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Whether the URL is queued or was already handed out
    pub fn contains(&self, url: &NormalizedUrl) -> bool {
        self.queued.contains(url) || self.visited.contains(url)
    }
}
