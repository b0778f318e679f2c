//! Session boundary: the current owner identity and its change watchers.
//!
//! Authentication itself happens elsewhere; this adapter only holds the
//! resolved identity (an opaque string, or absent) and fans out changes so
//! live lists can re-subscribe. Sign-out is a change to "absent" like any
//! other.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::store::{lock, Subscription};

struct Watcher {
    id: u64,
    active: AtomicBool,
    notify: Box<dyn Fn(Option<&str>) + Send + Sync>,
}

/// Holds the current owner identity and notifies watchers on every change.
#[derive(Default)]
pub struct Session {
    owner: Mutex<Option<String>>,
    watchers: Arc<Mutex<Vec<Arc<Watcher>>>>,
    next_id: AtomicU64,
}

impl Session {
    pub fn new() -> Self {
        Session::default()
    }

    /// The currently signed-in owner, if any.
    pub fn owner(&self) -> Option<String> {
        lock(&self.owner).clone()
    }

    /// Resolve the identity to `owner_id` and notify watchers.
    pub fn sign_in(&self, owner_id: impl Into<String>) {
        self.set(Some(owner_id.into()));
    }

    /// Drop the identity and notify watchers. Live lists following this
    /// session flush to empty.
    pub fn sign_out(&self) {
        self.set(None);
    }

    fn set(&self, owner: Option<String>) {
        *lock(&self.owner) = owner.clone();
        // Snapshot the watcher list so callbacks run without holding it;
        // a callback may register or drop watchers.
        let watchers: Vec<Arc<Watcher>> = lock(&self.watchers).iter().map(Arc::clone).collect();
        for watcher in watchers {
            if watcher.active.load(Ordering::SeqCst) {
                (watcher.notify)(owner.as_deref());
            }
        }
    }

    /// Register a change watcher. It is NOT called with the current value,
    /// only on subsequent changes. The returned guard deregisters on
    /// [`Subscription::unsubscribe`] or drop.
    pub fn watch(&self, notify: impl Fn(Option<&str>) + Send + Sync + 'static) -> Subscription {
        let watcher = Arc::new(Watcher {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            active: AtomicBool::new(true),
            notify: Box::new(notify),
        });
        lock(&self.watchers).push(Arc::clone(&watcher));

        let watchers = Arc::clone(&self.watchers);
        Subscription::new(move || {
            watcher.active.store(false, Ordering::SeqCst);
            lock(&watchers).retain(|w| w.id != watcher.id);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watchers_see_every_identity_change() {
        let session = Session::new();
        let seen: Arc<Mutex<Vec<Option<String>>>> = Arc::new(Mutex::new(Vec::new()));
        let seen2 = Arc::clone(&seen);
        let guard = session.watch(move |owner| {
            seen2
                .lock()
                .expect("seen lock")
                .push(owner.map(str::to_owned));
        });

        session.sign_in("alice");
        assert_eq!(session.owner(), Some("alice".to_string()));
        session.sign_out();
        assert_eq!(session.owner(), None);

        guard.unsubscribe();
        session.sign_in("bob");

        assert_eq!(
            *seen.lock().expect("seen lock"),
            vec![Some("alice".to_string()), None]
        );
    }

    #[test]
    fn watch_does_not_replay_the_current_identity() {
        let session = Session::new();
        session.sign_in("alice");
        let seen = Arc::new(Mutex::new(0usize));
        let seen2 = Arc::clone(&seen);
        let _guard = session.watch(move |_| *seen2.lock().expect("seen lock") += 1);
        assert_eq!(*seen.lock().expect("seen lock"), 0);
    }
}
