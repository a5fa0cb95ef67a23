//! Frame Orchestration
//!
//! Provides:
//! - `RenderTargetPool`: bounded reuse of per-level target sets
//! - `LevelTargets` / `LevelView`: one level's buffers as the stages see them
//! - `FrameTargets` / `FrameContext`: persistent targets and the per-frame snapshot
//! - `run_pass`: the single bind → dispatch → unbind path every stage uses
//! - `passes`: one module per stage
//! - `RecursionDriver`: the depth-first level walk

pub mod driver;
pub mod frame;
pub mod level;
pub mod pass;
pub mod passes;
pub mod target_pool;

pub use driver::{FrameStats, RecursionDriver, ViewExport};
pub use frame::{FrameContext, FrameTargets, ShadingTargets};
pub use level::{HitTargets, LevelTargets, LevelView, RayTargets, SetLayout};
pub use pass::run_pass;
pub use target_pool::{PoolEvent, PooledLevel, RenderTargetPool, SetId};
