/// I3D Core Library - model viewer engine shared by every host
///
/// This library provides STL parsing, geometry and transformation math, the
/// camera and orbit controls, a software rasterizer, and the lifecycle that
/// keeps exactly one loaded model in the scene.

pub mod config;
pub mod controls;
pub mod error;
pub mod geometry;
pub mod lifecycle;
pub mod loader;
pub mod material;
pub mod model;
pub mod projection;
pub mod raster;
pub mod scene;
pub mod snapshot;
pub mod stats;
pub mod stl;
pub mod transform;
pub mod viewer;

// Re-export commonly used types
pub use config::ViewerConfig;
pub use controls::OrbitControls;
pub use error::{ControlsError, LoadError, StlError, ViewerError};
pub use geometry::{BoundingBox, Mesh, Triangle, Vertex};
pub use lifecycle::{LoadOutcome, LoadState, ModelManager, PendingLoad, RequestId};
pub use loader::{
    DeferredBytes, FormatLoader, LoaderLookup, LoaderRegistry, ModelSource, StlLoader,
};
pub use material::{Color, Material};
pub use model::{MeasuredSize, Model};
pub use projection::Camera;
pub use raster::{Framebuffer, Rasterizer, RenderSurface};
pub use scene::{Node, NodeId, Scene, SceneHost};
pub use snapshot::Snapshot;
pub use stats::{FrameStats, Telemetry};
pub use transform::{ModelTransform, RotationState, Transform};
pub use viewer::{dispatch_load, load_model, OnComplete, Viewer};
