//! ExpectationStore - registry of expectations and the request log.
//!
//! Expectations are scanned in registration order; the first one whose pattern
//! is satisfied and whose usage counter can still be consumed wins.

use super::times::Times;
use super::types::{Action, Expectation, ExpectationId, StoreError};
use crate::predicate::{HttpRequest, RequestMatcher};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Default number of requests kept in the log.
pub const DEFAULT_LOG_CAPACITY: usize = 1000;

/// A request received by the mock listener.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub request: HttpRequest,
    pub received_at: DateTime<Utc>,
}

/// Registry of expectations
pub struct ExpectationStore {
    expectations: RwLock<Vec<Arc<Expectation>>>,
    next_sequence: AtomicU64,
    log: RwLock<VecDeque<RecordedRequest>>,
    log_capacity: usize,
}

impl ExpectationStore {
    pub fn new() -> Self {
        Self::with_log_capacity(DEFAULT_LOG_CAPACITY)
    }

    /// Create a store keeping at most `log_capacity` requests; 0 disables the log.
    pub fn with_log_capacity(log_capacity: usize) -> Self {
        Self {
            expectations: RwLock::new(Vec::new()),
            next_sequence: AtomicU64::new(0),
            log: RwLock::new(VecDeque::new()),
            log_capacity,
        }
    }

    /// Register a pattern/action pair and return its id.
    pub fn add(
        &self,
        request: HttpRequest,
        action: impl Into<Action>,
        times: Times,
    ) -> ExpectationId {
        let mut expectations = self.expectations.write();
        self.insert(&mut expectations, Expectation::new(request, action, times))
    }

    /// Register a fully built expectation.
    ///
    /// Fails when an expectation with the same id is already present.
    pub fn add_expectation(&self, expectation: Expectation) -> Result<ExpectationId, StoreError> {
        let mut expectations = self.expectations.write();
        if expectations.iter().any(|e| e.id() == expectation.id()) {
            return Err(StoreError::DuplicateId(expectation.id().clone()));
        }
        Ok(self.insert(&mut expectations, expectation))
    }

    /// Register a batch of expectations, all or none.
    ///
    /// Fails without registering anything when an id is already present or
    /// appears twice in the batch.
    pub fn add_all(
        &self,
        batch: Vec<Expectation>,
    ) -> Result<Vec<ExpectationId>, StoreError> {
        let mut expectations = self.expectations.write();
        let mut seen: HashSet<&ExpectationId> = expectations.iter().map(|e| e.id()).collect();
        for expectation in &batch {
            if !seen.insert(expectation.id()) {
                return Err(StoreError::DuplicateId(expectation.id().clone()));
            }
        }
        drop(seen);

        Ok(batch
            .into_iter()
            .map(|expectation| self.insert(&mut expectations, expectation))
            .collect())
    }

    fn insert(
        &self,
        expectations: &mut Vec<Arc<Expectation>>,
        expectation: Expectation,
    ) -> ExpectationId {
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        let expectation = expectation.with_sequence(sequence);
        let id = expectation.id().clone();
        debug!("Registered expectation {} (#{})", id, sequence);
        expectations.push(Arc::new(expectation));
        id
    }

    /// Find the first active expectation matching `request` and consume one use.
    pub fn find_match(&self, request: &HttpRequest) -> Option<Arc<Expectation>> {
        let expectations = self.expectations.read();
        for expectation in expectations.iter() {
            if !expectation.is_active() || !expectation.request().matches(request) {
                continue;
            }
            // Another request may have taken the last use since the check above
            if expectation.times().consume() {
                return Some(Arc::clone(expectation));
            }
        }
        None
    }

    /// Same selection as [`find_match`](Self::find_match) without consuming.
    pub fn preview_match(&self, request: &HttpRequest) -> Option<Arc<Expectation>> {
        self.expectations
            .read()
            .iter()
            .find(|e| e.is_active() && e.request().matches(request))
            .cloned()
    }

    /// Remove one expectation by id.
    pub fn remove(&self, id: &ExpectationId) -> bool {
        let mut expectations = self.expectations.write();
        let before = expectations.len();
        expectations.retain(|e| e.id() != id);
        let removed = expectations.len() != before;
        if removed {
            debug!("Removed expectation {}", id);
        }
        removed
    }

    /// Remove every expectation whose pattern is matched by `pattern`.
    pub fn clear_matching(&self, pattern: &HttpRequest) -> usize {
        let mut expectations = self.expectations.write();
        let before = expectations.len();
        expectations.retain(|e| !pattern.matches(e.request()));
        let removed = before - expectations.len();
        debug!("Cleared {} expectation(s) by pattern", removed);
        removed
    }

    /// Remove all expectations and recorded requests.
    pub fn reset(&self) {
        self.expectations.write().clear();
        self.log.write().clear();
        info!("Expectation store reset");
    }

    /// Drop exhausted expectations.
    pub fn purge_expired(&self) -> usize {
        let mut expectations = self.expectations.write();
        let before = expectations.len();
        expectations.retain(|e| e.is_active());
        before - expectations.len()
    }

    /// Active expectations in registration order.
    pub fn active(&self) -> Vec<Arc<Expectation>> {
        self.expectations
            .read()
            .iter()
            .filter(|e| e.is_active())
            .cloned()
            .collect()
    }

    /// All expectations in registration order, exhausted ones included.
    pub fn all(&self) -> Vec<Arc<Expectation>> {
        self.expectations.read().clone()
    }

    pub fn get(&self, id: &ExpectationId) -> Option<Arc<Expectation>> {
        self.expectations
            .read()
            .iter()
            .find(|e| e.id() == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.expectations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.expectations.read().is_empty()
    }

    // ------------------------------------------------------------------
    // Request log
    // ------------------------------------------------------------------

    /// Append a received request, evicting the oldest when full.
    pub fn record(&self, request: &HttpRequest) {
        if self.log_capacity == 0 {
            return;
        }
        let mut log = self.log.write();
        while log.len() >= self.log_capacity {
            log.pop_front();
        }
        log.push_back(RecordedRequest {
            request: request.clone(),
            received_at: Utc::now(),
        });
    }

    /// Recorded requests, oldest first, optionally filtered by a request pattern.
    pub fn recorded(&self, filter: Option<&HttpRequest>) -> Vec<RecordedRequest> {
        let log = self.log.read();
        match filter {
            Some(pattern) => log
                .iter()
                .filter(|r| pattern.matches(&r.request))
                .cloned()
                .collect(),
            None => log.iter().cloned().collect(),
        }
    }

    pub fn clear_log(&self) {
        self.log.write().clear();
    }
}

impl Default for ExpectationStore {
    fn default() -> Self {
        Self::new()
    }
}
