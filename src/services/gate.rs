use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, AppResult};

use super::cancel::cancellable;

/// Bounded admission for concurrent units of work
///
/// At most `capacity` permits are outstanding at any time. Permits release
/// their slot on drop, so a unit that fails or panics still frees it.
#[derive(Clone)]
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

/// Slot held by one admitted unit
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AdmissionGate {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Waits for a free slot, giving up if `cancel` fires first
    pub async fn acquire(&self, cancel: &CancellationToken) -> AppResult<AdmissionPermit> {
        let semaphore = Arc::clone(&self.semaphore);
        let permit = cancellable(cancel, async move {
            semaphore
                .acquire_owned()
                .await
                .map_err(|_| AppError::Internal("admission gate closed".to_string()))
        })
        .await?;

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);

        Ok(AdmissionPermit {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously admitted units so far
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}
