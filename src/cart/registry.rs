use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use parking_lot::{Mutex, MutexGuard};
use tokio::sync::watch;
use uuid::Uuid;

use crate::{
    quotes::{CancelHandle, SubmissionState},
    storage::Storage,
};

use super::{CartStore, cart_key};

/// A cart shared between request handlers, together with its submission
/// bookkeeping.
///
/// The store lock must never be held across an `.await`.
pub struct CartHandle {
    store: Mutex<CartStore>,
    submitting: AtomicBool,
    state: watch::Sender<SubmissionState>,
    pending_confirmation: Mutex<Option<CancelHandle>>,
}

impl CartHandle {
    pub fn new(store: CartStore) -> Self {
        let (state, _) = watch::channel(SubmissionState::Idle);
        Self {
            store: Mutex::new(store),
            submitting: AtomicBool::new(false),
            state,
            pending_confirmation: Mutex::new(None),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, CartStore> {
        self.store.lock()
    }

    pub fn submission_state(&self) -> SubmissionState {
        self.state.borrow().clone()
    }

    pub fn watch_submission(&self) -> watch::Receiver<SubmissionState> {
        self.state.subscribe()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    /// Claims the cart for a submission. Returns `None` while another
    /// submission of the same cart is in flight.
    pub fn try_begin_submission(&self) -> Option<SubmissionGuard<'_>> {
        self.submitting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SubmissionGuard { handle: self })
    }

    /// Registers a confirmation stage for this cart and returns the handle
    /// that cancels it. `None` while another one is pending.
    pub fn arm_confirmation(&self) -> Option<CancelHandle> {
        let mut slot = self.pending_confirmation.lock();
        if slot.is_some() {
            return None;
        }
        let cancel = CancelHandle::new();
        *slot = Some(cancel.clone());
        Some(cancel)
    }

    /// Cancels the pending confirmation, if any.
    pub fn cancel_confirmation(&self) -> bool {
        match self.pending_confirmation.lock().take() {
            Some(cancel) => {
                cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Forgets `cancel` once its submission has finished. A newer
    /// confirmation armed in the meantime is left alone.
    pub fn disarm_confirmation(&self, cancel: &CancelHandle) {
        let mut slot = self.pending_confirmation.lock();
        if slot.as_ref().is_some_and(|pending| pending.same_as(cancel)) {
            *slot = None;
        }
    }

    pub(crate) fn set_submission_state(&self, state: SubmissionState) {
        self.state.send_replace(state);
    }
}

/// Releases the submitting flag when dropped.
pub struct SubmissionGuard<'a> {
    handle: &'a CartHandle,
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        self.handle.submitting.store(false, Ordering::Release);
    }
}

/// Lazily opens one cart per user over a shared storage.
#[derive(Clone)]
pub struct CartRegistry {
    storage: Arc<dyn Storage>,
    carts: Arc<Mutex<HashMap<Uuid, Arc<CartHandle>>>>,
}

impl CartRegistry {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            carts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn storage(&self) -> Arc<dyn Storage> {
        self.storage.clone()
    }

    pub fn cart_for(&self, user_id: Uuid) -> Arc<CartHandle> {
        self.carts
            .lock()
            .entry(user_id)
            .or_insert_with(|| {
                Arc::new(CartHandle::new(CartStore::open(
                    self.storage.clone(),
                    cart_key(user_id),
                )))
            })
            .clone()
    }
}
