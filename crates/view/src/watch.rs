//! A watched value: read the current value, and get called back when it changes.
//!
//! [`Watched::subscribe`] fires once immediately with the current value and again,
//! synchronously inside [`Watched::set`], every time the value changes. There is no
//! debouncing. The returned [`Subscription`] unsubscribes when dropped, so a view
//! that goes away cannot be called back afterwards.
//!
//! # Example
//!
//! ```
//! use micro_view::watch::Watched;
//! use std::sync::{Arc, Mutex};
//!
//! let header = Watched::new(String::from("text/plain"));
//! let seen = Arc::new(Mutex::new(Vec::new()));
//!
//! let sink = Arc::clone(&seen);
//! let subscription = header.subscribe(move |value: &String| sink.lock().unwrap().push(value.clone()));
//!
//! header.set(String::from("application/json"));
//! drop(subscription);
//! header.set(String::from("text/html"));
//!
//! assert_eq!(*seen.lock().unwrap(), vec!["text/plain", "application/json"]);
//! ```

use arc_swap::ArcSwap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Subscribers<T> {
    next_id: u64,
    entries: Vec<(u64, Callback<T>)>,
}

struct Shared<T> {
    current: ArcSwap<T>,
    subscribers: Mutex<Subscribers<T>>,
}

impl<T> Shared<T> {
    fn subscribers(&self) -> MutexGuard<'_, Subscribers<T>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A value that can be observed for changes. Clones share the same value.
pub struct Watched<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Watched<T> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<T: fmt::Debug> fmt::Debug for Watched<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watched")
            .field("current", &self.shared.current.load())
            .field("subscribers", &self.shared.subscribers().entries.len())
            .finish()
    }
}

impl<T: Default + PartialEq + Send + Sync + 'static> Default for Watched<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: PartialEq + Send + Sync + 'static> Watched<T> {
    pub fn new(value: T) -> Self {
        let shared = Shared {
            current: ArcSwap::from_pointee(value),
            subscribers: Mutex::new(Subscribers { next_id: 0, entries: Vec::new() }),
        };
        Self { shared: Arc::new(shared) }
    }

    /// The current value.
    pub fn get(&self) -> Arc<T> {
        self.shared.current.load_full()
    }

    /// Replaces the value and notifies every subscriber if it differs from the current one.
    ///
    /// Returns whether the value changed. Subscribers are called after the new value
    /// is visible through [`Watched::get`], and without any lock held, so a callback
    /// may read or set this value itself.
    pub fn set(&self, value: T) -> bool {
        if *self.shared.current.load_full() == value {
            return false;
        }

        let value = Arc::new(value);
        self.shared.current.store(Arc::clone(&value));

        let callbacks: Vec<Callback<T>> = self.shared.subscribers().entries.iter().map(|(_, f)| Arc::clone(f)).collect();
        for callback in callbacks {
            callback(&value);
        }
        true
    }

    /// Registers `f`, calls it once right away with the current value, and again on every change.
    pub fn subscribe<F>(&self, f: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let callback: Callback<T> = Arc::new(f);

        let id = {
            let mut subscribers = self.shared.subscribers();
            let id = subscribers.next_id;
            subscribers.next_id += 1;
            subscribers.entries.push((id, Arc::clone(&callback)));
            id
        };

        callback(&self.shared.current.load_full());

        let weak: Weak<Shared<T>> = Arc::downgrade(&self.shared);
        Subscription {
            release: Some(Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.subscribers().entries.retain(|(entry_id, _)| *entry_id != id);
                }
            })),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers().entries.len()
    }
}

/// Keeps a subscription alive. Dropping it unsubscribes.
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Unsubscribes now. Same as dropping.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("active", &self.release.is_some()).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}
