//! Single-node offer store.
//!
//! Entries carry their own deadline and are dropped lazily on read. Expired
//! entries nobody reads again are swept by [`MemoryOfferStore::purge_expired`].

use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};

use super::{CacheError, Offer, OfferStore};

struct Entry {
    offer: Offer,
    deadline: Instant,
}

pub struct MemoryOfferStore {
    entries: DashMap<String, Entry>,
}

impl MemoryOfferStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Drop every expired entry; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.deadline > now);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MemoryOfferStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OfferStore for MemoryOfferStore {
    async fn put(&self, offer_id: &str, offer: &Offer, ttl: Duration) -> Result<(), CacheError> {
        let deadline = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| CacheError::Set(format!("ttl out of range: {:?}", ttl)))?;
        self.entries.insert(
            offer_id.to_string(),
            Entry {
                offer: offer.clone(),
                deadline,
            },
        );
        Ok(())
    }

    async fn get(&self, offer_id: &str) -> Result<Offer, CacheError> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(offer_id) {
            if entry.deadline > now {
                return Ok(entry.offer.clone());
            }
        }
        // Expired: evict so a later del also misses
        self.entries
            .remove_if(offer_id, |_, entry| entry.deadline <= now);
        Err(CacheError::Miss)
    }

    async fn del(&self, offer_id: &str) -> Result<(), CacheError> {
        let now = Instant::now();
        match self.entries.remove(offer_id) {
            Some((_, entry)) if entry.deadline > now => Ok(()),
            _ => Err(CacheError::Miss),
        }
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
