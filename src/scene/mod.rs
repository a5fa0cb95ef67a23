//! Scene Collaborators
//!
//! What the compositor consumes from the scene side, read-only, once per frame:
//! - Camera: position, orientation and field of view
//! - Light: directional and point lights
//! - Actor: a model (mesh + material) with a precomputed bounding box
//!
//! Scene-graph management stays outside the compositor; callers hand over
//! plain slices.

pub mod actor;
pub mod camera;
pub mod light;
pub mod presets;

pub use actor::{Actor, Model};
pub use camera::Camera;
pub use light::{DirectionalLight, Light, LightKind, PointLight};
pub use presets::ScenePreset;
