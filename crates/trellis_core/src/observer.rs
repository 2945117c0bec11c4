//! Observer lists
//!
//! Subscribers are notified synchronously in registration order. Dispatch
//! iterates a snapshot, so a subscriber may add or remove subscribers while
//! being notified; changes take effect on the next notification.

use std::sync::Arc;

use smallvec::SmallVec;

/// Handle returned by [`ObserverList::subscribe`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverToken(u64);

pub type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

pub struct ObserverList<E> {
    next: u64,
    entries: Vec<(ObserverToken, Callback<E>)>,
}

impl<E> ObserverList<E> {
    pub fn new() -> Self {
        Self {
            next: 0,
            entries: Vec::new(),
        }
    }

    pub fn subscribe<F>(&mut self, callback: F) -> ObserverToken
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let token = ObserverToken(self.next);
        self.next += 1;
        self.entries.push((token, Arc::new(callback)));
        token
    }

    /// Returns `false` if the token was not subscribed
    pub fn unsubscribe(&mut self, token: ObserverToken) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(t, _)| *t != token);
        self.entries.len() != before
    }

    /// Callbacks in registration order, detached from the list
    pub fn snapshot(&self) -> SmallVec<[Callback<E>; 4]> {
        self.entries.iter().map(|(_, cb)| cb.clone()).collect()
    }

    pub fn notify(&self, event: &E) {
        for callback in self.snapshot() {
            callback(event);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<E> Default for ObserverList<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut list = ObserverList::<u32>::new();
        for tag in ["a", "b", "c"] {
            let log = log.clone();
            list.subscribe(move |v| log.lock().unwrap().push(format!("{tag}{v}")));
        }
        list.notify(&7);
        assert_eq!(*log.lock().unwrap(), vec!["a7", "b7", "c7"]);
    }

    #[test]
    fn test_unsubscribe() {
        let hits = Arc::new(Mutex::new(0));
        let mut list = ObserverList::<()>::new();
        let hits_clone = hits.clone();
        let token = list.subscribe(move |_| *hits_clone.lock().unwrap() += 1);
        list.notify(&());
        assert!(list.unsubscribe(token));
        assert!(!list.unsubscribe(token));
        list.notify(&());
        assert_eq!(*hits.lock().unwrap(), 1);
        assert!(list.is_empty());
    }
}
