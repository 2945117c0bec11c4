//! Owning-thread discipline
//!
//! A tree is bound to the thread that created it. Mutation and layout entry
//! points call [`ThreadAffinity::check`] first. Work finishing elsewhere posts
//! a closure to a [`DispatchQueue`]; the owning thread drains it.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use crate::error::{Result, TrellisError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThreadAffinity {
    owner: ThreadId,
}

impl ThreadAffinity {
    /// Bind to the calling thread
    pub fn current() -> Self {
        Self {
            owner: thread::current().id(),
        }
    }

    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    pub fn is_owner(&self) -> bool {
        thread::current().id() == self.owner
    }

    pub fn check(&self) -> Result<()> {
        let current = thread::current().id();
        if current == self.owner {
            Ok(())
        } else {
            Err(TrellisError::ThreadAffinityViolation {
                owner: self.owner,
                current,
            })
        }
    }
}

pub type Task<T> = Box<dyn FnOnce(&mut T) + Send>;

/// Closures posted from any thread, run later on the owning thread
pub struct DispatchQueue<T> {
    tasks: Arc<Mutex<VecDeque<Task<T>>>>,
}

impl<T> Clone for DispatchQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tasks: Arc::clone(&self.tasks),
        }
    }
}

impl<T> Default for DispatchQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for DispatchQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchQueue")
            .field("pending", &self.len())
            .finish()
    }
}

impl<T> DispatchQueue<T> {
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub fn post<F>(&self, task: F)
    where
        F: FnOnce(&mut T) + Send + 'static,
    {
        self.tasks.lock().unwrap().push_back(Box::new(task));
    }

    /// Take every pending task in posting order
    pub fn drain(&self) -> Vec<Task<T>> {
        self.tasks.lock().unwrap().drain(..).collect()
    }

    /// Run pending tasks against `target`. Tasks posted while running wait
    /// for the next call.
    pub fn run(&self, target: &mut T) -> usize {
        let tasks = self.drain();
        let count = tasks.len();
        if count > 0 {
            tracing::trace!(count, "running dispatched tasks");
        }
        for task in tasks {
            task(target);
        }
        count
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
