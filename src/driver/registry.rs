use crate::app::phase::Phase;
use crate::driver::{Device, DriverHandle};
use crate::error::DriverError;
use core::slice::Iter;
use std::collections::HashMap;
use std::sync::Mutex;
use std::thread::{self, ThreadId};

/// Immutable copy of one registry entry.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverEntry {
    pub name: String,
    pub phase: Phase,
    pub device: Option<Device>,
}

/// Point-in-time copy of a thread's drivers. Iterating it never observes
/// later registry changes, so callers may quit drivers while walking it.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entries: Vec<DriverEntry>,
}

impl Snapshot {
    #[inline]
    pub fn iter(&self) -> Iter<'_, DriverEntry> {
        self.entries.iter()
    }

    pub fn in_phase(&self, phase: Phase) -> impl Iterator<Item = &DriverEntry> {
        self.entries.iter().filter(move |entry| entry.phase == phase)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a DriverEntry;
    type IntoIter = Iter<'a, DriverEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Drivers opened by a single thread, keyed by name.
#[derive(Debug, Default)]
pub struct DriverRegistry {
    drivers: HashMap<String, DriverHandle>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, handle: DriverHandle) -> Result<(), DriverError> {
        if self.drivers.contains_key(name) {
            return Err(DriverError::Duplicate {
                name: name.to_owned(),
            });
        }
        self.drivers.insert(name.to_owned(), handle);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&DriverHandle, DriverError> {
        self.drivers.get(name).ok_or_else(|| DriverError::NotFound {
            name: name.to_owned(),
        })
    }

    pub fn remove(&mut self, name: &str) -> Result<DriverHandle, DriverError> {
        self.drivers.remove(name).ok_or_else(|| DriverError::NotFound {
            name: name.to_owned(),
        })
    }

    pub fn set_phase(&mut self, name: &str, phase: Phase) -> Result<(), DriverError> {
        match self.drivers.get_mut(name) {
            Some(handle) => {
                handle.set_phase(phase);
                Ok(())
            }
            None => Err(DriverError::NotFound {
                name: name.to_owned(),
            }),
        }
    }

    pub fn all_for_thread(&self) -> Snapshot {
        let entries = self
            .drivers
            .values()
            .map(|handle| DriverEntry {
                name: handle.name().to_owned(),
                phase: handle.phase(),
                device: handle.device().cloned(),
            })
            .collect();
        Snapshot { entries }
    }

    pub fn drain(&mut self) -> Vec<DriverHandle> {
        self.drivers.drain().map(|(_, handle)| handle).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}

/// Process-wide owner of every thread's registry.
///
/// Regular operations only touch the calling thread's registry; the forced
/// drain at suite end reaches all of them. Handles are handed out by clone,
/// and sessions are released by the caller after the lock is dropped.
#[derive(Debug, Default)]
pub struct DriverPool {
    threads: Mutex<HashMap<ThreadId, DriverRegistry>>,
}

impl DriverPool {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_current<R>(&self, f: impl FnOnce(&mut DriverRegistry) -> R) -> R {
        let mut threads = lock!(self.threads);
        let registry = threads.entry(thread::current().id()).or_default();
        f(registry)
    }

    pub fn register(&self, handle: DriverHandle) -> Result<(), DriverError> {
        let name = handle.name().to_owned();
        self.with_current(|registry| registry.register(&name, handle))
    }

    pub fn lookup(&self, name: &str) -> Result<DriverHandle, DriverError> {
        self.with_current(|registry| registry.lookup(name).map(Clone::clone))
    }

    pub fn remove(&self, name: &str) -> Result<DriverHandle, DriverError> {
        self.with_current(|registry| registry.remove(name))
    }

    pub fn set_phase(&self, name: &str, phase: Phase) -> Result<(), DriverError> {
        self.with_current(|registry| registry.set_phase(name, phase))
    }

    pub fn snapshot(&self) -> Snapshot {
        self.with_current(|registry| registry.all_for_thread())
    }

    pub fn drain_current(&self) -> Vec<DriverHandle> {
        self.with_current(DriverRegistry::drain)
    }

    /// Takes every handle of every thread out of the pool.
    pub fn drain_all(&self) -> Vec<DriverHandle> {
        let mut threads = lock!(self.threads);
        threads
            .drain()
            .flat_map(|(_, mut registry)| registry.drain())
            .collect()
    }

    pub fn len(&self) -> usize {
        lock!(self.threads).values().map(DriverRegistry::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        lock!(self.threads).values().all(DriverRegistry::is_empty)
    }
}
