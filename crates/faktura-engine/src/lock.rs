//! # Per-Invoice Lock Registry
//!
//! Serializes mutations per invoice without serializing the whole engine.
//!
//! ## How It Works
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      InvoiceLocks                                       │
//! │                                                                         │
//! │  HashMap<invoice_id, Arc<tokio::Mutex<()>>>                             │
//! │                                                                         │
//! │  add_line("inv-A")  ──► lock A ──┐                                      │
//! │  remove_line("inv-A") ─► lock A ─┤ serialized                           │
//! │                                  │                                      │
//! │  add_line("inv-B")  ──► lock B ──── runs concurrently with A            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Acquisition is bounded: a caller that cannot get the lock within the
//! timeout gets `None` (surfaced by the service as a retryable conflict)
//! instead of waiting forever behind a slow writer.
//!
//! The registry entry is dropped when its invoice is deleted. Waiters that
//! still hold the old `Arc` finish normally; anyone arriving afterwards
//! gets a fresh mutex and then finds the invoice gone.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, warn};

/// Default bound on lock acquisition.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Registry of per-invoice mutation locks.
#[derive(Debug)]
pub struct InvoiceLocks {
    /// Acquisition bound.
    timeout: Duration,

    /// One async mutex per invoice that has seen a mutation.
    entries: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl InvoiceLocks {
    /// Creates a registry with the given acquisition timeout.
    pub fn new(timeout: Duration) -> Self {
        InvoiceLocks {
            timeout,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Acquires the lock for one invoice.
    ///
    /// ## Returns
    /// * `Some(guard)` - Held until dropped; all other mutations of this
    ///   invoice wait behind it
    /// * `None` - Timed out waiting for the current holder
    pub async fn acquire(&self, invoice_id: &str) -> Option<OwnedMutexGuard<()>> {
        let entry = {
            let mut map = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            map.entry(invoice_id.to_string()).or_default().clone()
        };

        match tokio::time::timeout(self.timeout, entry.lock_owned()).await {
            Ok(guard) => Some(guard),
            Err(_) => {
                warn!(invoice_id = %invoice_id, "Timed out waiting for invoice lock");
                None
            }
        }
    }

    /// Drops the registry entry for a deleted invoice.
    ///
    /// Call while still holding the invoice's guard, after the delete has
    /// committed.
    pub fn remove(&self, invoice_id: &str) {
        let mut map = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if map.remove(invoice_id).is_some() {
            debug!(invoice_id = %invoice_id, "Dropped invoice lock entry");
        }
    }

    /// Number of tracked invoices (for diagnostics).
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InvoiceLocks {
    fn default() -> Self {
        InvoiceLocks::new(DEFAULT_LOCK_TIMEOUT)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_invoice_serializes() {
        let locks = Arc::new(InvoiceLocks::new(Duration::from_millis(50)));

        let guard = locks.acquire("inv-1").await.unwrap();

        // Second acquire on the same invoice times out while held
        assert!(locks.acquire("inv-1").await.is_none());

        drop(guard);
        assert!(locks.acquire("inv-1").await.is_some());
    }

    #[tokio::test]
    async fn different_invoices_do_not_contend() {
        let locks = InvoiceLocks::new(Duration::from_millis(50));

        let _a = locks.acquire("inv-a").await.unwrap();
        let _b = locks.acquire("inv-b").await.unwrap();

        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn remove_drops_entry() {
        let locks = InvoiceLocks::default();

        let guard = locks.acquire("inv-1").await.unwrap();
        assert_eq!(locks.len(), 1);

        locks.remove("inv-1");
        drop(guard);
        assert!(locks.is_empty());
    }
}
