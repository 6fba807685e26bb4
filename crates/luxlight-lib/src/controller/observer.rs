//! Snapshot observers.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::store::DeviceSnapshot;

/// Receives every committed snapshot change. Called on the controller's
/// worker thread; calling back into the controller from here fails with
/// `DeviceError::Reentrant`.
pub trait SnapshotObserver: Send + Sync {
    fn on_snapshot_changed(&self, snapshot: &DeviceSnapshot);
}

impl<F> SnapshotObserver for F
where
    F: Fn(&DeviceSnapshot) + Send + Sync,
{
    fn on_snapshot_changed(&self, snapshot: &DeviceSnapshot) {
        self(snapshot)
    }
}

type Entry = (u64, Arc<dyn SnapshotObserver>);

#[derive(Default)]
pub(crate) struct ObserverRegistry {
    next_id: AtomicU64,
    observers: Mutex<Vec<Entry>>,
}

impl ObserverRegistry {
    fn lock(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn register(
        self: &Arc<Self>,
        observer: Arc<dyn SnapshotObserver>,
    ) -> SubscriptionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().push((id, observer));
        SubscriptionHandle {
            id,
            registry: Arc::downgrade(self),
        }
    }

    fn unregister(&self, id: u64) {
        self.lock().retain(|(i, _)| *i != id);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    /// Call every observer. The list is copied first so callbacks run
    /// without the registry lock held.
    pub(crate) fn notify(&self, snapshot: &DeviceSnapshot) {
        let observers: Vec<Arc<dyn SnapshotObserver>> =
            self.lock().iter().map(|(_, o)| o.clone()).collect();
        for observer in observers {
            let result = catch_unwind(AssertUnwindSafe(|| observer.on_snapshot_changed(snapshot)));
            if result.is_err() {
                log::warn!("snapshot observer panicked");
            }
        }
    }
}

/// Keeps an observer registered. Dropping it unsubscribes.
#[must_use = "dropping the handle unsubscribes the observer"]
pub struct SubscriptionHandle {
    id: u64,
    registry: Weak<ObserverRegistry>,
}

impl SubscriptionHandle {
    pub fn unsubscribe(self) {}
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unregister(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn notify_reaches_subscribers() {
        let reg = Arc::new(ObserverRegistry::default());
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let _sub = reg.register(Arc::new(move |_: &DeviceSnapshot| {
            h.fetch_add(1, Ordering::SeqCst);
        }));
        reg.notify(&DeviceSnapshot::default());
        reg.notify(&DeviceSnapshot::default());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn dropping_handle_unsubscribes() {
        let reg = Arc::new(ObserverRegistry::default());
        let sub = reg.register(Arc::new(|_: &DeviceSnapshot| {}));
        assert_eq!(reg.len(), 1);
        drop(sub);
        assert_eq!(reg.len(), 0);
    }

    #[test]
    fn handle_outliving_registry_is_harmless() {
        let reg = Arc::new(ObserverRegistry::default());
        let sub = reg.register(Arc::new(|_: &DeviceSnapshot| {}));
        drop(reg);
        sub.unsubscribe();
    }

    #[test]
    fn panicking_observer_does_not_stop_others() {
        let reg = Arc::new(ObserverRegistry::default());
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        fn boom(_: &DeviceSnapshot) {
            panic!("observer failure");
        }
        let _a = reg.register(Arc::new(boom));
        let _b = reg.register(Arc::new(move |_: &DeviceSnapshot| {
            h.fetch_add(1, Ordering::SeqCst);
        }));
        reg.notify(&DeviceSnapshot::default());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn observer_may_subscribe_during_notify() {
        let reg = Arc::new(ObserverRegistry::default());
        let inner_reg = reg.clone();
        let extra = Arc::new(Mutex::new(Vec::new()));
        let extra_in = extra.clone();
        let _sub = reg.register(Arc::new(move |_: &DeviceSnapshot| {
            let h = inner_reg.register(Arc::new(|_: &DeviceSnapshot| {}));
            extra_in.lock().unwrap().push(h);
        }));
        reg.notify(&DeviceSnapshot::default());
        assert_eq!(reg.len(), 2);
    }
}
