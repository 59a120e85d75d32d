// MODEL: scene data and interactive state
pub mod assets;
pub mod camera;
pub mod scene;
pub mod transform;

pub use assets::{AssetError, Model};
pub use camera::Camera;
pub use scene::Scene;
pub use transform::{Rotation, TransformState, ViewToggles};
