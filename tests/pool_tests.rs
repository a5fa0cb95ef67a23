//! Render Target Pool Tests
//!
//! Tests for:
//! - Set reuse after release
//! - Disjoint targets across simultaneously held sets
//! - Capacity enforcement and eviction of free sets
//! - Idle trimming and failure reclamation

use std::collections::HashSet;

use prism::prelude::*;
use prism::renderer::core::{BranchKind, LevelKind, LevelTag};
use prism::renderer::graph::{PoolEvent, RenderTargetPool, SetLayout};

const W: u32 = 8;
const H: u32 = 4;

fn branch(ordinal: u32, depth: u32, kind: BranchKind) -> LevelTag {
    LevelTag {
        ordinal,
        depth,
        kind: LevelKind::Branch(kind),
    }
}

fn reflection(ordinal: u32) -> LevelTag {
    branch(ordinal, ordinal, BranchKind::Reflection)
}

// ============================================================================
// Reuse
// ============================================================================

#[test]
fn released_set_is_handed_out_again() {
    let mut dispatch = SoftwareDispatch::new();
    let mut pool = RenderTargetPool::new(4);

    let first = pool
        .acquire(&mut dispatch, SetLayout::Reflective, W, H, reflection(1))
        .unwrap();
    pool.release(first.set, reflection(1));
    let second = pool
        .acquire(&mut dispatch, SetLayout::Reflective, W, H, reflection(2))
        .unwrap();

    assert_eq!(first.set, second.set);
    assert_eq!(first.targets, second.targets);
    assert_eq!(pool.total_set_count(), 1);
    let created = pool
        .events()
        .iter()
        .filter(|e| matches!(e, PoolEvent::Created { .. }))
        .count();
    assert_eq!(created, 1, "reuse must not create a second set");
}

#[test]
fn layouts_are_pooled_separately() {
    let mut dispatch = SoftwareDispatch::new();
    let mut pool = RenderTargetPool::new(4);

    let root = pool
        .acquire(&mut dispatch, SetLayout::Transmissive, W, H, LevelTag::ROOT)
        .unwrap();
    pool.release(root.set, LevelTag::ROOT);
    let reflective = pool
        .acquire(&mut dispatch, SetLayout::Reflective, W, H, reflection(1))
        .unwrap();

    assert_ne!(root.set, reflective.set);
    assert!(root.targets.ior_stack.is_some());
    assert!(reflective.targets.ior_stack.is_none());
    assert_eq!(root.targets.ids().len(), 9);
    assert_eq!(reflective.targets.ids().len(), 8);
}

#[test]
fn held_sets_never_share_targets() {
    let mut dispatch = SoftwareDispatch::new();
    let mut pool = RenderTargetPool::new(4);

    let held: Vec<_> = (0..4)
        .map(|i| {
            let tag = branch(i + 1, i + 1, BranchKind::Refraction);
            pool.acquire(&mut dispatch, SetLayout::Transmissive, W, H, tag)
                .unwrap()
        })
        .collect();

    let mut seen = HashSet::new();
    for level in &held {
        for id in level.targets.ids() {
            assert!(seen.insert(id), "target {id:?} handed to two live levels");
        }
    }
    assert_eq!(pool.active_count(), 4);
    assert_eq!(pool.peak_active(), 4);
    assert_eq!(dispatch.target_count(), 4 * 9);
}

// ============================================================================
// Capacity
// ============================================================================

#[test]
fn acquire_beyond_capacity_fails() {
    let mut dispatch = SoftwareDispatch::new();
    let mut pool = RenderTargetPool::new(2);

    pool.acquire(&mut dispatch, SetLayout::Reflective, W, H, reflection(1))
        .unwrap();
    pool.acquire(&mut dispatch, SetLayout::Reflective, W, H, reflection(2))
        .unwrap();
    let err = pool
        .acquire(&mut dispatch, SetLayout::Reflective, W, H, reflection(3))
        .unwrap_err();

    assert!(
        matches!(err, RenderError::PoolExhausted { capacity: 2 }),
        "unexpected error: {err}"
    );
    assert_eq!(pool.active_count(), 2);
}

#[test]
fn full_pool_evicts_a_free_set_of_another_shape() {
    let mut dispatch = SoftwareDispatch::new();
    let mut pool = RenderTargetPool::new(1);

    let small = pool
        .acquire(&mut dispatch, SetLayout::Reflective, W, H, reflection(1))
        .unwrap();
    pool.release(small.set, reflection(1));
    let large = pool
        .acquire(&mut dispatch, SetLayout::Reflective, W * 2, H * 2, reflection(2))
        .unwrap();

    assert_ne!(small.set, large.set);
    assert_eq!(pool.total_set_count(), 1);
    assert!(
        pool.events()
            .contains(&PoolEvent::Destroyed { set: small.set }),
        "the idle set should have been destroyed to make room"
    );
    assert!(dispatch.image(small.targets.contribution).is_none());
    assert_eq!(dispatch.target_count(), 8);
}

// ============================================================================
// Trim & reclaim
// ============================================================================

#[test]
fn trim_destroys_sets_idle_too_long() {
    let mut dispatch = SoftwareDispatch::new();
    let mut pool = RenderTargetPool::new(4);

    let level = pool
        .acquire(&mut dispatch, SetLayout::Reflective, W, H, reflection(1))
        .unwrap();
    pool.release(level.set, reflection(1));

    pool.trim(&mut dispatch, 2);
    pool.trim(&mut dispatch, 2);
    assert_eq!(pool.total_set_count(), 1, "still within the idle budget");

    pool.trim(&mut dispatch, 2);
    assert_eq!(pool.total_set_count(), 0);
    assert_eq!(dispatch.target_count(), 0);
}

#[test]
fn trim_leaves_active_sets_alone() {
    let mut dispatch = SoftwareDispatch::new();
    let mut pool = RenderTargetPool::new(4);

    pool.acquire(&mut dispatch, SetLayout::Transmissive, W, H, LevelTag::ROOT)
        .unwrap();
    for _ in 0..5 {
        pool.trim(&mut dispatch, 0);
    }
    assert_eq!(pool.active_count(), 1);
    assert_eq!(dispatch.target_count(), 9);
}

#[test]
fn reclaim_all_returns_every_active_set() {
    let mut dispatch = SoftwareDispatch::new();
    let mut pool = RenderTargetPool::new(3);

    let tags = [LevelTag::ROOT, reflection(1), reflection(2)];
    for tag in tags {
        pool.acquire(&mut dispatch, SetLayout::for_level(tag.kind), W, H, tag)
            .unwrap();
    }
    pool.reclaim_all();

    assert_eq!(pool.active_count(), 0);
    assert_eq!(pool.total_set_count(), 3);
    let released = pool
        .events()
        .iter()
        .filter(|e| matches!(e, PoolEvent::Released { .. }))
        .count();
    assert_eq!(released, 3);

    // A reclaimed pool serves a new frame without growing.
    pool.begin_frame();
    pool.acquire(&mut dispatch, SetLayout::Transmissive, W, H, LevelTag::ROOT)
        .unwrap();
    assert_eq!(pool.total_set_count(), 3);
    assert_eq!(pool.peak_active(), 1);
}
