/// The viewer context handed to every host integration.
///
/// A [`Viewer`] owns the scene, camera, controls, telemetry and the model
/// lifecycle. Hosts share it as `Rc<RefCell<Viewer>>` and drive it from a
/// single thread: [`Viewer::frame`] once per redraw, [`load_model`] whenever a
/// file arrives.
use std::cell::RefCell;
use std::fmt::Display;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};

use crate::config::ViewerConfig;
use crate::controls::OrbitControls;
use crate::error::{LoadError, ViewerError};
use crate::geometry::Mesh;
use crate::lifecycle::{LoadOutcome, ModelManager, PendingLoad, RequestId};
use crate::loader::{LoaderRegistry, ModelSource};
use crate::material::{AmbientLight, PointLight};
use crate::model::MeasuredSize;
use crate::projection::Camera;
use crate::raster::RenderSurface;
use crate::scene::{Node, Scene, SceneHost};
use crate::stats::Telemetry;

/// Zero-argument completion callback of [`load_model`]
pub type OnComplete = Box<dyn FnOnce()>;

pub struct Viewer {
    scene: Scene,
    camera: Camera,
    controls: Option<OrbitControls>,
    telemetry: Option<Box<dyn Telemetry>>,
    models: ModelManager,
    thumbnail_requested: bool,
}

impl Viewer {
    pub fn new(config: &ViewerConfig, width: u32, height: u32) -> Self {
        Self::with_loaders(config, LoaderRegistry::default(), width, height)
    }

    pub fn with_loaders(
        config: &ViewerConfig,
        loaders: LoaderRegistry,
        width: u32,
        height: u32,
    ) -> Self {
        let mut scene = Scene::new(config.clear_color);
        let lighting = &config.lighting;
        scene.add(Node::AmbientLight(AmbientLight {
            color: lighting.ambient,
        }));
        scene.add(Node::PointLight(PointLight {
            color: lighting.point,
            position: lighting.point_position,
            cast_shadow: lighting.cast_shadow,
        }));

        let camera = Camera::from_config(&config.camera, width, height);
        let controls = match OrbitControls::new(&camera, config.controls.clone()) {
            Ok(controls) => Some(controls),
            Err(err) => {
                log::warn!("orbit controls disabled: {err}");
                None
            }
        };

        Self {
            scene,
            camera,
            controls,
            telemetry: None,
            models: ModelManager::new(loaders, config.normalize.clone()),
            thumbnail_requested: false,
        }
    }

    /// Attach optional telemetry; a failing `init` is logged and ignored
    pub fn init_telemetry<F, E>(&mut self, init: F)
    where
        F: FnOnce() -> Result<Box<dyn Telemetry>, E>,
        E: Display,
    {
        match init() {
            Ok(telemetry) => self.telemetry = Some(telemetry),
            Err(err) => log::warn!("telemetry unavailable: {err}"),
        }
    }

    pub fn has_telemetry(&self) -> bool {
        self.telemetry.is_some()
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn controls_mut(&mut self) -> Option<&mut OrbitControls> {
        self.controls.as_mut()
    }

    pub fn models(&self) -> &ModelManager {
        &self.models
    }

    pub fn models_mut(&mut self) -> &mut ModelManager {
        &mut self.models
    }

    /// Measured size of the live model
    pub fn size(&self) -> Option<MeasuredSize> {
        self.models.size()
    }

    /// Follow a resize of the host surface
    pub fn resize<S: RenderSurface + ?Sized>(&mut self, surface: &mut S, width: u32, height: u32) {
        self.camera.resize(width, height);
        surface.resize(width, height);
    }

    pub fn begin_load(
        &mut self,
        source: ModelSource,
        format: &str,
    ) -> Result<PendingLoad, ViewerError> {
        self.models.begin_load(&mut self.scene, source, format)
    }

    pub fn finish_load(
        &mut self,
        request: RequestId,
        result: Result<Mesh, LoadError>,
    ) -> Result<LoadOutcome, ViewerError> {
        self.models.finish_load(&mut self.scene, request, result)
    }

    /// One tick of the frame driver: render, advance controls, advance telemetry.
    ///
    /// A render failure is returned after the other two steps have run.
    pub fn frame<S: RenderSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        now_ms: f64,
    ) -> Result<(), S::Error> {
        let rendered = surface.draw_frame(&self.scene, &self.camera);
        if let Some(controls) = self.controls.as_mut() {
            controls.tick(&mut self.camera);
        }
        if let Some(telemetry) = self.telemetry.as_mut() {
            telemetry.update(now_ms);
        }
        rendered
    }

    /// Ask the host to snapshot the surface after the next frame
    pub fn request_thumbnail(&mut self) {
        self.thumbnail_requested = true;
    }

    pub fn take_thumbnail_request(&mut self) -> bool {
        std::mem::take(&mut self.thumbnail_requested)
    }
}

/// Replace the viewer's model with the one at `source`.
///
/// Disposal of the current model and dispatch of the loader happen before the
/// first await. `on_complete` runs only when this request populated the scene,
/// with the viewer no longer borrowed.
pub async fn load_model(
    viewer: &RefCell<Viewer>,
    source: ModelSource,
    format: &str,
    on_complete: Option<OnComplete>,
) -> Result<LoadOutcome, ViewerError> {
    let pending = viewer.borrow_mut().begin_load(source, format)?;
    complete_load(viewer, pending, on_complete).await
}

/// Like [`load_model`], but disposal and dispatch happen right now.
///
/// The returned future only waits for the loader and applies its result, so
/// the order of `dispatch_load` calls decides which request wins, whenever the
/// futures get polled.
pub fn dispatch_load(
    viewer: &Rc<RefCell<Viewer>>,
    source: ModelSource,
    format: &str,
    on_complete: Option<OnComplete>,
) -> Result<LocalBoxFuture<'static, Result<LoadOutcome, ViewerError>>, ViewerError> {
    let pending = viewer.borrow_mut().begin_load(source, format)?;
    let viewer = Rc::clone(viewer);
    Ok(async move { complete_load(&viewer, pending, on_complete).await }.boxed_local())
}

async fn complete_load(
    viewer: &RefCell<Viewer>,
    pending: PendingLoad,
    on_complete: Option<OnComplete>,
) -> Result<LoadOutcome, ViewerError> {
    let (request, result) = pending.await;
    let outcome = viewer.borrow_mut().finish_load(request, result)?;

    if let (LoadOutcome::Loaded(_), Some(callback)) = (outcome, on_complete) {
        callback();
    }
    Ok(outcome)
}
