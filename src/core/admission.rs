//! # Admission controller
//!
//! Bounds how many tasks run at once and holds the FIFO of deferred task ids.
//!
//! ## Rules
//! - At most `limit` ids are in the running set (`None` = unlimited).
//! - Deferred ids leave the queue strictly in submission order; priority never reorders.
//! - An id is in at most one of {running, queue}.
//!
//! ```text
//! admit(id) ──► slot free? ──yes──► running
//!                    └──no───► queue.push_back(id)
//!
//! release(id) ──► running.remove(id)
//! next()      ──► slot free && queue non-empty ──► queue.pop_front() ──► running
//! ```

use std::collections::{HashSet, VecDeque};

/// Outcome of an admission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The task entered `Running`.
    Started,
    /// The task stays `Pending`, appended to the queue at this 0-based position.
    Queued { position: usize },
}

#[derive(Debug)]
pub(crate) struct AdmissionController {
    limit: Option<usize>,
    running: HashSet<String>,
    queue: VecDeque<String>,
}

impl AdmissionController {
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            limit,
            running: HashSet::new(),
            queue: VecDeque::new(),
        }
    }

    fn has_free_slot(&self) -> bool {
        self.limit.is_none_or(|n| self.running.len() < n)
    }

    /// Admits `id` if a slot is free, otherwise queues it.
    pub fn admit(&mut self, id: &str) -> Admission {
        if self.has_free_slot() {
            self.running.insert(id.to_string());
            Admission::Started
        } else {
            self.queue.push_back(id.to_string());
            Admission::Queued {
                position: self.queue.len() - 1,
            }
        }
    }

    /// Frees the slot held by `id`. Returns `false` if `id` was not running.
    pub fn release(&mut self, id: &str) -> bool {
        self.running.remove(id)
    }

    /// Drops `id` from the queue. Returns `false` if it was not queued.
    pub fn withdraw(&mut self, id: &str) -> bool {
        match self.queue.iter().position(|q| q == id) {
            Some(pos) => {
                self.queue.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Pops the queue head into the running set when a slot is free.
    pub fn next(&mut self) -> Option<String> {
        if !self.has_free_slot() {
            return None;
        }
        let id = self.queue.pop_front()?;
        self.running.insert(id.clone());
        Some(id)
    }

    pub fn is_running(&self, id: &str) -> bool {
        self.running.contains(id)
    }

    pub fn is_queued(&self, id: &str) -> bool {
        self.queue.iter().any(|q| q == id)
    }

    pub fn running_len(&self) -> usize {
        self.running.len()
    }

    /// Queue contents, head first.
    pub fn queued(&self) -> Vec<String> {
        self.queue.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admits_until_limit_then_queues() {
        let mut ac = AdmissionController::new(Some(2));
        assert_eq!(ac.admit("a"), Admission::Started);
        assert_eq!(ac.admit("b"), Admission::Started);
        assert_eq!(ac.admit("c"), Admission::Queued { position: 0 });
        assert_eq!(ac.admit("d"), Admission::Queued { position: 1 });
        assert_eq!(ac.running_len(), 2);
        assert_eq!(ac.queued(), vec!["c".to_string(), "d".to_string()]);
    }

    #[test]
    fn test_next_is_fifo_and_respects_limit() {
        let mut ac = AdmissionController::new(Some(1));
        ac.admit("a");
        ac.admit("b");
        ac.admit("c");

        assert_eq!(ac.next(), None, "no slot while 'a' runs");
        assert!(ac.release("a"));
        assert_eq!(ac.next().as_deref(), Some("b"));
        assert_eq!(ac.next(), None);
        assert!(ac.release("b"));
        assert_eq!(ac.next().as_deref(), Some("c"));
        assert!(ac.is_running("c"));
        assert!(!ac.is_queued("c"));
    }

    #[test]
    fn test_withdraw_removes_from_queue() {
        let mut ac = AdmissionController::new(Some(1));
        ac.admit("a");
        ac.admit("b");
        ac.admit("c");
        assert!(ac.withdraw("b"));
        assert!(!ac.withdraw("b"));
        ac.release("a");
        assert_eq!(ac.next().as_deref(), Some("c"));
    }

    #[test]
    fn test_unlimited_never_queues() {
        let mut ac = AdmissionController::new(None);
        for i in 0..100 {
            assert_eq!(ac.admit(&i.to_string()), Admission::Started);
        }
        assert!(ac.queued().is_empty());
        assert!(!ac.release("unknown"));
    }
}
