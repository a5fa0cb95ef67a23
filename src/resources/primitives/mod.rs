pub mod sphere;
pub mod plane;
pub mod box_shape;

pub use box_shape::{create_box, BoxShape};
pub use sphere::{create_sphere, Sphere, SphereOptions};
pub use plane::{create_plane, Plane, PlaneOptions};
