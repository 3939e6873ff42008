/// Replace-and-dispose lifecycle of the single active model.
///
/// A load is split in two halves so hosts can drive it from any executor:
/// [`ModelManager::begin_load`] disposes the previous model and dispatches the
/// loader, [`ModelManager::finish_load`] applies the loader's result. Every
/// dispatch gets a fresh [`RequestId`]; only the completion carrying the most
/// recent id may populate the scene, so overlapping loads settle on the last
/// one requested.
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::LocalBoxFuture;

use crate::config::NormalizeConfig;
use crate::error::{LoadError, ViewerError};
use crate::geometry::Mesh;
use crate::loader::{LoaderLookup, LoaderRegistry, ModelSource};
use crate::material::Material;
use crate::model::{MeasuredSize, Model};
use crate::scene::{Node, NodeId, SceneHost};
use crate::transform::{ModelTransform, RotationState};

/// Monotonically increasing id of a dispatched load
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Empty,
    Loading(RequestId),
    Populated,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadOutcome {
    /// The model is in the scene
    Loaded(MeasuredSize),
    /// A newer request superseded this one; its result was dropped
    Stale,
}

/// A dispatched load waiting for its loader
pub struct PendingLoad {
    request: RequestId,
    future: LocalBoxFuture<'static, Result<Mesh, LoadError>>,
}

impl PendingLoad {
    pub fn request(&self) -> RequestId {
        self.request
    }
}

impl Future for PendingLoad {
    type Output = (RequestId, Result<Mesh, LoadError>);

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let request = self.request;
        self.future.as_mut().poll(cx).map(|result| (request, result))
    }
}

#[derive(Debug, Clone, Copy)]
struct ActiveModel {
    node: NodeId,
    size: MeasuredSize,
}

/// Owner of the single active model
pub struct ModelManager {
    registry: LoaderRegistry,
    normalize: NormalizeConfig,
    active: Option<ActiveModel>,
    state: LoadState,
    last_request: u64,
}

impl ModelManager {
    pub fn new(registry: LoaderRegistry, normalize: NormalizeConfig) -> Self {
        Self {
            registry,
            normalize,
            active: None,
            state: LoadState::Empty,
            last_request: 0,
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Measured size of the live model
    pub fn size(&self) -> Option<MeasuredSize> {
        self.active.map(|active| active.size)
    }

    pub fn active_node(&self) -> Option<NodeId> {
        self.active.map(|active| active.node)
    }

    pub fn registry(&self) -> &LoaderRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut LoaderRegistry {
        &mut self.registry
    }

    /// Dispose the active model, if any, and dispatch a load of `source`.
    ///
    /// An unknown `format` fails before anything is disposed.
    pub fn begin_load(
        &mut self,
        scene: &mut dyn SceneHost,
        source: ModelSource,
        format: &str,
    ) -> Result<PendingLoad, ViewerError> {
        let loader = match self.registry.lookup(format) {
            LoaderLookup::Found(loader) => loader,
            LoaderLookup::Unsupported => {
                log::warn!("no loader registered for {format:?}");
                return Err(ViewerError::UnsupportedFormat(format.to_string()));
            }
        };

        dispose_active(&mut self.active, scene);

        self.last_request += 1;
        let request = RequestId(self.last_request);
        self.state = LoadState::Loading(request);
        log::debug!("dispatching {request:?} for {}", source.name());

        Ok(PendingLoad {
            request,
            future: loader.load(source),
        })
    }

    /// Apply the loader result of `request`.
    ///
    /// Results of superseded requests are dropped without touching the scene.
    pub fn finish_load(
        &mut self,
        scene: &mut dyn SceneHost,
        request: RequestId,
        result: Result<Mesh, LoadError>,
    ) -> Result<LoadOutcome, ViewerError> {
        if self.state != LoadState::Loading(request) {
            log::debug!("discarding stale completion of {request:?}");
            return Ok(LoadOutcome::Stale);
        }

        match result.and_then(|mesh| self.normalize(mesh)) {
            Ok((model, size)) => {
                let node = scene.add(Node::Model(model));
                self.active = Some(ActiveModel { node, size });
                self.state = LoadState::Populated;
                log::info!("model loaded: {size}");
                Ok(LoadOutcome::Loaded(size))
            }
            Err(err) => {
                self.state = LoadState::Empty;
                log::warn!("{request:?} failed: {err}");
                Err(err.into())
            }
        }
    }

    /// Orient, measure, scale and center a freshly loaded mesh.
    ///
    /// The size is taken after the up-axis rotation and before scaling.
    fn normalize(&self, mut mesh: Mesh) -> Result<(Model, MeasuredSize), LoadError> {
        let mut transform = ModelTransform {
            rotation: RotationState::new(self.normalize.up_axis_rotation, 0.0, 0.0),
            ..ModelTransform::identity()
        };

        let bbox = mesh
            .transformed_bounding_box(&transform.matrix())
            .ok_or(LoadError::EmptyMesh)?;
        let size = MeasuredSize::from(bbox.size());

        transform.scale = self.normalize.scale;
        mesh.center();

        let material = Material::lambert(self.normalize.color);
        Ok((Model::new(mesh, material, transform), size))
    }
}

impl Default for ModelManager {
    fn default() -> Self {
        Self::new(LoaderRegistry::default(), NormalizeConfig::default())
    }
}

fn dispose_active(active: &mut Option<ActiveModel>, scene: &mut dyn SceneHost) {
    let Some(active) = active.take() else {
        return;
    };
    match scene.remove(active.node) {
        Some(Node::Model(model)) => model.dispose(),
        Some(other) => log::warn!("node {:?} was not a model: {other:?}", active.node),
        None => log::warn!("model node {:?} already left the scene", active.node),
    }
}
