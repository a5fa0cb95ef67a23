//! Render Target Pool
//!
//! Bounded pool of per-level target sets. The recursion driver acquires a set
//! when it starts a level and returns it once the level and every descendant
//! are done with it; a returned set is reused by the next level asking for
//! the same layout and extent.
//!
//! # Design
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              RenderTargetPool (capacity N)           │
//! │                                                     │
//! │  active: SetId → PooledSet   (owned by one level)   │
//! │  free:   HashMap<Key, Vec<PooledSet>>               │
//! │                                                     │
//! │  acquire(layout, owner) → PooledLevel               │
//! │  release(set, owner)                                │
//! │  trim(max_idle_frames)                              │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Memory Strategy
//!
//! - Sets are **never** destroyed during normal rendering; released sets
//!   stay in the free lists.
//! - The pool grows on demand up to its capacity. At capacity, a free set of
//!   a different key is destroyed to make room; if nothing is free the
//!   request fails with [`RenderError::PoolExhausted`].
//! - [`RenderTargetPool::trim`] drops sets that sat idle for several frames
//!   (e.g. after a resize).
//!
//! Every acquire and release is appended to an event log so callers can
//! audit set ownership over a frame.

use rustc_hash::FxHashMap;

use super::level::{LevelTargets, SetLayout};
use crate::errors::{RenderError, Result};
use crate::renderer::core::{GpuDispatch, LevelTag};

// ─── Public Types ─────────────────────────────────────────────────────────────

/// Stable identity of one physical target set.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct SetId(u32);

/// A set handed to a level.
#[derive(Clone, Copy, Debug)]
pub struct PooledLevel {
    pub set: SetId,
    pub targets: LevelTargets,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PoolEvent {
    Created { set: SetId, layout: SetLayout },
    Acquired { set: SetId, owner: LevelTag },
    Released { set: SetId, owner: LevelTag },
    Destroyed { set: SetId },
}

// ─── Internal Types ───────────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
struct PoolKey {
    layout: SetLayout,
    width: u32,
    height: u32,
}

struct PooledSet {
    id: SetId,
    key: PoolKey,
    targets: LevelTargets,
    owner: Option<LevelTag>,
    /// Frames spent in the free list without being reused.
    idle_frames: u32,
}

// ─── Pool Implementation ──────────────────────────────────────────────────────

pub struct RenderTargetPool {
    capacity: usize,
    active: FxHashMap<SetId, PooledSet>,
    free: FxHashMap<PoolKey, Vec<PooledSet>>,
    next_id: u32,
    peak_active: usize,
    events: Vec<PoolEvent>,
}

impl RenderTargetPool {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            active: FxHashMap::default(),
            free: FxHashMap::default(),
            next_id: 0,
            peak_active: 0,
            events: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Hands a set of `layout` at `width × height` to `owner`.
    pub fn acquire<D: GpuDispatch + ?Sized>(
        &mut self,
        dispatch: &mut D,
        layout: SetLayout,
        width: u32,
        height: u32,
        owner: LevelTag,
    ) -> Result<PooledLevel> {
        let key = PoolKey {
            layout,
            width,
            height,
        };

        let mut pooled = match self.free.get_mut(&key).and_then(Vec::pop) {
            Some(set) => set,
            None => self.create(dispatch, key)?,
        };
        pooled.idle_frames = 0;
        pooled.owner = Some(owner);

        let handle = PooledLevel {
            set: pooled.id,
            targets: pooled.targets,
        };
        self.events.push(PoolEvent::Acquired {
            set: pooled.id,
            owner,
        });
        self.active.insert(pooled.id, pooled);
        self.peak_active = self.peak_active.max(self.active.len());
        Ok(handle)
    }

    fn create<D: GpuDispatch + ?Sized>(&mut self, dispatch: &mut D, key: PoolKey) -> Result<PooledSet> {
        if self.total_set_count() >= self.capacity && !self.evict_one(dispatch, key) {
            return Err(RenderError::PoolExhausted {
                capacity: self.capacity,
            });
        }

        let targets = LevelTargets::create(dispatch, key.layout, key.width, key.height)?;
        let id = SetId(self.next_id);
        self.next_id += 1;
        self.events.push(PoolEvent::Created {
            set: id,
            layout: key.layout,
        });
        log::debug!(
            "Render target pool: created set {:?} ({:?} {}x{}), {} of {}",
            id,
            key.layout,
            key.width,
            key.height,
            self.total_set_count() + 1,
            self.capacity
        );
        Ok(PooledSet {
            id,
            key,
            targets,
            owner: None,
            idle_frames: 0,
        })
    }

    /// Destroys one free set whose key differs from `wanted`.
    fn evict_one<D: GpuDispatch + ?Sized>(&mut self, dispatch: &mut D, wanted: PoolKey) -> bool {
        let victim = self
            .free
            .iter_mut()
            .filter(|(key, _)| **key != wanted)
            .find_map(|(_, bucket)| bucket.pop());
        self.free.retain(|_, bucket| !bucket.is_empty());

        match victim {
            Some(set) => {
                self.destroy(dispatch, set);
                true
            }
            None => false,
        }
    }

    fn destroy<D: GpuDispatch + ?Sized>(&mut self, dispatch: &mut D, set: PooledSet) {
        set.targets.release(dispatch);
        self.events.push(PoolEvent::Destroyed { set: set.id });
    }

    /// Returns a set to the free list.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `set` is not held by `owner`.
    pub fn release(&mut self, set: SetId, owner: LevelTag) {
        let Some(mut pooled) = self.active.remove(&set) else {
            log::warn!("Render target pool: release of inactive set {set:?}");
            return;
        };
        debug_assert_eq!(pooled.owner, Some(owner), "set released by a level that does not own it");
        pooled.owner = None;
        self.events.push(PoolEvent::Released { set, owner });
        self.free.entry(pooled.key).or_default().push(pooled);
    }

    /// Forces every active set back to the free lists. Used when a frame
    /// fails midway.
    pub fn reclaim_all(&mut self) {
        let active: Vec<_> = self.active.drain().map(|(_, set)| set).collect();
        for mut pooled in active {
            if let Some(owner) = pooled.owner.take() {
                self.events.push(PoolEvent::Released {
                    set: pooled.id,
                    owner,
                });
            }
            self.free.entry(pooled.key).or_default().push(pooled);
        }
    }

    /// Ages free sets by one frame and destroys those idle for more than
    /// `max_idle_frames`.
    pub fn trim<D: GpuDispatch + ?Sized>(&mut self, dispatch: &mut D, max_idle_frames: u32) {
        let mut stale = Vec::new();
        for bucket in self.free.values_mut() {
            for set in bucket.iter_mut() {
                set.idle_frames += 1;
            }
            let (keep, drop): (Vec<_>, Vec<_>) = bucket
                .drain(..)
                .partition(|set| set.idle_frames <= max_idle_frames);
            *bucket = keep;
            stale.extend(drop);
        }
        self.free.retain(|_, bucket| !bucket.is_empty());
        for set in stale {
            self.destroy(dispatch, set);
        }
    }

    /// Destroys every free set.
    pub fn clear_free<D: GpuDispatch + ?Sized>(&mut self, dispatch: &mut D) {
        let sets: Vec<_> = self.free.drain().flat_map(|(_, bucket)| bucket).collect();
        for set in sets {
            self.destroy(dispatch, set);
        }
    }

    /// Starts a new event log and peak measurement.
    pub fn begin_frame(&mut self) {
        self.events.clear();
        self.peak_active = self.active.len();
    }

    #[must_use]
    pub fn events(&self) -> &[PoolEvent] {
        &self.events
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Most sets held at once since [`begin_frame`](Self::begin_frame).
    #[must_use]
    pub fn peak_active(&self) -> usize {
        self.peak_active
    }

    /// Sets managed by the pool, active and free.
    #[must_use]
    pub fn total_set_count(&self) -> usize {
        self.active.len() + self.free.values().map(Vec::len).sum::<usize>()
    }
}
