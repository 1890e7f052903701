//! The mutable collection of candidate addresses a run draws from.
use std::net::IpAddr;

use rand::Rng;

/// Candidate addresses awaiting a probe.
///
/// The pool is filled once and then only ever shrinks. It is owned by a
/// single dispatch loop, so it needs no locking.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AddressPool {
    addrs: Vec<IpAddr>,
}

impl AddressPool {
    #[must_use]
    pub const fn new(addrs: Vec<IpAddr>) -> Self {
        Self { addrs }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }

    /// Removes and returns the address at `index`, shifting every later
    /// address down by one so survivors keep their relative order.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn remove_ordered(&mut self, index: usize) -> IpAddr {
        self.addrs.remove(index)
    }

    /// Removes and returns the address at `index` by moving the last address
    /// into its slot. Constant time, but survivors lose their order.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn remove_unordered(&mut self, index: usize) -> IpAddr {
        self.addrs.swap_remove(index)
    }

    /// Removes a uniformly chosen address, or `None` once the pool is empty.
    pub fn take_random<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<IpAddr> {
        if self.addrs.is_empty() {
            return None;
        }
        let index = rng.random_range(0..self.addrs.len());
        Some(self.remove_unordered(index))
    }

    /// Removes the tail address, or `None` once the pool is empty.
    pub fn take_last(&mut self) -> Option<IpAddr> {
        let last = self.addrs.len().checked_sub(1)?;
        Some(self.remove_unordered(last))
    }

    pub fn iter(&self) -> impl Iterator<Item = &IpAddr> {
        self.addrs.iter()
    }
}

impl From<Vec<IpAddr>> for AddressPool {
    fn from(addrs: Vec<IpAddr>) -> Self {
        Self::new(addrs)
    }
}

impl FromIterator<IpAddr> for AddressPool {
    fn from_iter<T: IntoIterator<Item = IpAddr>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
