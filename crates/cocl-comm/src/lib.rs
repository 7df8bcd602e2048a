// crates/cocl-comm/src/lib.rs

//! Blocking collective operations for SPMD worker ranks sharing one process.
//!
//! The engine runs P rank threads in lockstep at collective points; between
//! them ranks are independent. This crate provides the three primitives the
//! iteration loop is built from, with the usual collective contract: every
//! rank must invoke the same collectives in the same order, and each call
//! blocks until all ranks have entered it.
//!
//! - [`Communicator::all_reduce_sum_f64`] / [`Communicator::all_reduce_sum_u64`]:
//!   elementwise sum across ranks, result replicated into every caller's
//!   buffer. Contributions are combined in rank order, so the floating-point
//!   result is identical on every rank and reproducible for a fixed world
//!   size.
//! - [`Communicator::all_gather_varying`]: reassemble a plan-striped vector
//!   into a full copy on every rank.
//! - [`Communicator::barrier`]: plain phase boundary.
//!
//! A failing rank must not strand its peers at the next collective.
//! [`Communicator::abort`] poisons the communicator: every blocked or future
//! collective call on every rank returns [`CommError::Aborted`].

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use cocl_core::PartitionPlan;
use thiserror::Error;

/// Collective-layer failures.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum CommError {
    /// A peer rank failed; the communicator is poisoned.
    #[error("collective aborted: a peer rank failed")]
    Aborted,
}

/// Convenience alias used throughout the collective layer.
pub type Result<T> = std::result::Result<T, CommError>;

/// Lock recovery: a poisoned mutex means a peer panicked mid-critical-section;
/// shutdown is governed by the abort flag, not by lock poisoning.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct BarrierState {
    arrived: usize,
    generation: u64,
    aborted: bool,
}

/// Per-collective staging area. `contribs[rank]` holds that rank's payload
/// for the in-flight operation; `readers` counts ranks that have consumed
/// the combined result so the last one can rearm the slot.
struct SlotState<T> {
    contribs: Vec<Vec<T>>,
    readers: usize,
}

struct Slot<T>(Mutex<SlotState<T>>);

impl<T> Slot<T> {
    fn new(world: usize) -> Self {
        Self(Mutex::new(SlotState {
            contribs: (0..world).map(|_| Vec::new()).collect(),
            readers: 0,
        }))
    }
}

struct GatherState {
    buf: Vec<u32>,
    readers: usize,
}

/// Shared-memory communicator for a fixed world of ranks.
///
/// One `Communicator` is created per clustering run and shared by reference
/// across all rank threads.
pub struct Communicator {
    world: usize,
    barrier: Mutex<BarrierState>,
    barrier_cv: Condvar,
    reduce_f64: Slot<f64>,
    reduce_u64: Slot<u64>,
    gather: Mutex<GatherState>,
}

impl Communicator {
    /// Create a communicator for `world` ranks.
    ///
    /// # Panics
    /// Panics if `world == 0`.
    #[must_use]
    pub fn new(world: usize) -> Self {
        assert!(world > 0, "communicator requires at least one rank");
        Self {
            world,
            barrier: Mutex::new(BarrierState {
                arrived: 0,
                generation: 0,
                aborted: false,
            }),
            barrier_cv: Condvar::new(),
            reduce_f64: Slot::new(world),
            reduce_u64: Slot::new(world),
            gather: Mutex::new(GatherState {
                buf: Vec::new(),
                readers: 0,
            }),
        }
    }

    /// Number of ranks.
    #[inline]
    #[must_use]
    pub const fn world(&self) -> usize {
        self.world
    }

    /// Whether the communicator has been poisoned by [`Self::abort`].
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        lock(&self.barrier).aborted
    }

    /// Poison the communicator and wake every rank blocked at a barrier.
    ///
    /// Idempotent; safe to call from any thread, including one that is
    /// unwinding.
    pub fn abort(&self) {
        let mut st = lock(&self.barrier);
        st.aborted = true;
        self.barrier_cv.notify_all();
    }

    /// Block until all ranks reach the barrier.
    ///
    /// # Errors
    /// Returns [`CommError::Aborted`] if the communicator is poisoned before
    /// or while waiting.
    pub fn barrier(&self) -> Result<()> {
        let mut st = lock(&self.barrier);
        if st.aborted {
            return Err(CommError::Aborted);
        }
        let generation = st.generation;
        st.arrived += 1;
        if st.arrived == self.world {
            st.arrived = 0;
            st.generation = st.generation.wrapping_add(1);
            self.barrier_cv.notify_all();
            return Ok(());
        }
        while st.generation == generation && !st.aborted {
            st = self
                .barrier_cv
                .wait(st)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if st.aborted {
            Err(CommError::Aborted)
        } else {
            Ok(())
        }
    }

    /// Elementwise sum all-reduce over `f64` buffers.
    ///
    /// On return every rank's `buf` holds the rank-ordered sum of all
    /// contributions. The destination is always rewritten from the staged
    /// contributions, never aliased with a partially-combined source.
    ///
    /// # Errors
    /// Returns [`CommError::Aborted`] if the communicator is poisoned.
    pub fn all_reduce_sum_f64(&self, rank: usize, buf: &mut [f64]) -> Result<()> {
        self.all_reduce(rank, buf, &self.reduce_f64, |acc, v| *acc += v)
    }

    /// Elementwise sum all-reduce over `u64` buffers.
    ///
    /// # Errors
    /// Returns [`CommError::Aborted`] if the communicator is poisoned.
    pub fn all_reduce_sum_u64(&self, rank: usize, buf: &mut [u64]) -> Result<()> {
        self.all_reduce(rank, buf, &self.reduce_u64, |acc, v| *acc += v)
    }

    fn all_reduce<T: Copy>(
        &self,
        rank: usize,
        buf: &mut [T],
        slot: &Slot<T>,
        add: impl Fn(&mut T, T),
    ) -> Result<()> {
        debug_assert!(rank < self.world);
        {
            let mut st = lock(&slot.0);
            st.contribs[rank].clear();
            st.contribs[rank].extend_from_slice(buf);
        }
        // All contributions staged.
        self.barrier()?;
        {
            let mut st = lock(&slot.0);
            // Combine in rank order: every rank recomputes the same sequence
            // of operations, so results are bit-identical everywhere.
            for (r, contrib) in st.contribs.iter().enumerate() {
                assert_eq!(
                    contrib.len(),
                    buf.len(),
                    "all-reduce length mismatch across ranks"
                );
                if r == 0 {
                    buf.copy_from_slice(contrib);
                } else {
                    for (acc, &value) in buf.iter_mut().zip(contrib.iter()) {
                        add(acc, value);
                    }
                }
            }
            st.readers += 1;
            if st.readers == self.world {
                st.readers = 0;
            }
        }
        // Slot rearmed; safe to reuse in the next collective.
        self.barrier()
    }

    /// Reassemble a vector striped by `plan` into a full copy on every rank.
    ///
    /// `local` must be rank's slab (`plan.count(rank)` elements); `out` must
    /// have `plan.len()` elements and is fully rewritten.
    ///
    /// # Errors
    /// Returns [`CommError::Aborted`] if the communicator is poisoned.
    ///
    /// # Panics
    /// Panics if buffer lengths disagree with the plan or the plan does not
    /// cover this world size (a call-order bug, not a runtime condition).
    pub fn all_gather_varying(
        &self,
        rank: usize,
        local: &[u32],
        plan: &PartitionPlan,
        out: &mut [u32],
    ) -> Result<()> {
        assert_eq!(plan.parts(), self.world, "plan world size mismatch");
        assert_eq!(local.len(), plan.count(rank), "local slab length mismatch");
        assert_eq!(out.len(), plan.len(), "gather output length mismatch");
        {
            let mut st = lock(&self.gather);
            if st.buf.len() != plan.len() {
                st.buf.resize(plan.len(), 0);
            }
            st.buf[plan.slab(rank)].copy_from_slice(local);
        }
        // Every slab written.
        self.barrier()?;
        {
            let mut st = lock(&self.gather);
            out.copy_from_slice(&st.buf);
            st.readers += 1;
            if st.readers == self.world {
                st.readers = 0;
            }
        }
        self.barrier()
    }
}
