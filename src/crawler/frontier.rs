//! Breadth-first crawl frontier
//!
//! This module owns the queue of URLs still to visit and the visited set:
//! - FIFO order, so every depth-d page is dequeued before any depth-(d+1) page
//! - A URL is marked visited when it is enqueued, never twice per run
//! - Links beyond the depth bound are counted and dropped

use crate::state::Termination;
use std::collections::{HashSet, VecDeque};
use url::Url;

/// A URL waiting to be fetched, with its link depth from the seed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// Normalized URL
    pub url: Url,

    /// Number of link hops from the seed (seed is 0)
    pub depth: u32,
}

/// What happened to a URL offered to the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// URL was new and is now queued
    Enqueued,
    /// URL was already queued or visited
    Duplicate,
    /// URL was new but its depth exceeds the bound
    TooDeep,
}

/// FIFO frontier with a visited set keyed by normalized URL
#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<FrontierEntry>,
    visited: HashSet<String>,
    max_depth: u32,
    pruned_by_depth: u64,
}

impl Frontier {
    /// Creates a frontier seeded with `(seed, 0)`
    ///
    /// The seed is expected to be normalized already.
    pub fn new(seed: Url, max_depth: u32) -> Self {
        let mut visited = HashSet::new();
        visited.insert(seed.as_str().to_string());

        let mut queue = VecDeque::new();
        queue.push_back(FrontierEntry {
            url: seed,
            depth: 0,
        });

        Self {
            queue,
            visited,
            max_depth,
            pruned_by_depth: 0,
        }
    }

    /// Removes and returns the head of the queue
    pub fn next_entry(&mut self) -> Option<FrontierEntry> {
        self.queue.pop_front()
    }

    /// Offers a discovered URL at `depth`
    ///
    /// Duplicates are reported before the depth check, so a link seen again
    /// from a deeper page never counts as pruned.
    pub fn offer(&mut self, url: Url, depth: u32) -> Offer {
        if self.visited.contains(url.as_str()) {
            return Offer::Duplicate;
        }

        if depth > self.max_depth {
            self.pruned_by_depth += 1;
            return Offer::TooDeep;
        }

        self.visited.insert(url.as_str().to_string());
        self.queue.push_back(FrontierEntry { url, depth });
        Offer::Enqueued
    }

    /// Number of queued entries
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns true if no entries are queued
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of URLs ever enqueued, including the seed
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Number of offers dropped only because of depth
    pub fn pruned_by_depth(&self) -> u64 {
        self.pruned_by_depth
    }

    /// The termination reason for an empty queue
    pub fn exhaustion(&self) -> Termination {
        if self.pruned_by_depth > 0 {
            Termination::ExhaustedByDepth
        } else {
            Termination::ExhaustedByFrontier
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_seed_is_first_at_depth_zero() {
        let mut frontier = Frontier::new(url("https://example.com/"), 2);
        assert_eq!(frontier.len(), 1);

        let entry = frontier.next_entry().unwrap();
        assert_eq!(entry.url.as_str(), "https://example.com/");
        assert_eq!(entry.depth, 0);
        assert!(frontier.is_empty());
    }

    #[test]
    fn test_seed_is_visited() {
        let mut frontier = Frontier::new(url("https://example.com/"), 2);
        assert_eq!(
            frontier.offer(url("https://example.com/"), 1),
            Offer::Duplicate
        );
    }

    #[test]
    fn test_fifo_order() {
        let mut frontier = Frontier::new(url("https://example.com/"), 3);
        frontier.next_entry();

        frontier.offer(url("https://example.com/a"), 1);
        frontier.offer(url("https://example.com/b"), 1);
        frontier.offer(url("https://example.com/a/deep"), 2);

        let order: Vec<_> = std::iter::from_fn(|| frontier.next_entry())
            .map(|e| (e.url.path().to_string(), e.depth))
            .collect();

        assert_eq!(
            order,
            vec![
                ("/a".to_string(), 1),
                ("/b".to_string(), 1),
                ("/a/deep".to_string(), 2)
            ]
        );
    }

    #[test]
    fn test_duplicate_rejected_after_dequeue() {
        let mut frontier = Frontier::new(url("https://example.com/"), 2);
        assert_eq!(frontier.offer(url("https://example.com/a"), 1), Offer::Enqueued);
        frontier.next_entry();
        frontier.next_entry();

        assert_eq!(frontier.offer(url("https://example.com/a"), 2), Offer::Duplicate);
        assert_eq!(frontier.visited_count(), 2);
    }

    #[test]
    fn test_too_deep_counted() {
        let mut frontier = Frontier::new(url("https://example.com/"), 1);

        assert_eq!(frontier.offer(url("https://example.com/a"), 1), Offer::Enqueued);
        assert_eq!(frontier.offer(url("https://example.com/b"), 2), Offer::TooDeep);
        assert_eq!(frontier.pruned_by_depth(), 1);

        // A pruned link is not marked visited
        assert_eq!(frontier.offer(url("https://example.com/b"), 1), Offer::Enqueued);
    }

    #[test]
    fn test_max_depth_zero_only_seed() {
        let mut frontier = Frontier::new(url("https://example.com/"), 0);
        frontier.next_entry();

        assert_eq!(frontier.offer(url("https://example.com/a"), 1), Offer::TooDeep);
        assert!(frontier.is_empty());
        assert_eq!(frontier.exhaustion(), Termination::ExhaustedByDepth);
    }

    #[test]
    fn test_exhaustion_without_pruning() {
        let mut frontier = Frontier::new(url("https://example.com/"), 2);
        frontier.next_entry();
        assert_eq!(frontier.exhaustion(), Termination::ExhaustedByFrontier);
    }

    #[test]
    fn test_query_is_part_of_identity() {
        let mut frontier = Frontier::new(url("https://example.com/"), 2);
        assert_eq!(frontier.offer(url("https://example.com/?p=1"), 1), Offer::Enqueued);
        assert_eq!(frontier.offer(url("https://example.com/?p=2"), 1), Offer::Enqueued);
        assert_eq!(frontier.offer(url("https://example.com/?p=1"), 1), Offer::Duplicate);
    }
}
