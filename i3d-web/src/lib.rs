/// i3d Web - browser host for the model viewer
///
/// Renders through the core software rasterizer into a 2D canvas created inside
/// the viewer container. Files picked through a file input replace the current
/// model; once loaded, the measured size is written to `#size` and a thumbnail
/// of the next frame is put into `img#thumbnail`. Both are created when the
/// page does not have them.
use std::cell::RefCell;
use std::f32::consts::PI;
use std::rc::Rc;

use i3d_core::{
    dispatch_load, Camera, FrameStats, LoadOutcome, ModelSource, OnComplete, Rasterizer,
    RenderSurface, Scene, Telemetry, Viewer, ViewerConfig,
};
use js_sys::Uint8Array;
use wasm_bindgen::prelude::*;
use wasm_bindgen::{Clamped, JsCast};
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{
    CanvasRenderingContext2d, Document, Element, File, HtmlCanvasElement, HtmlElement,
    HtmlImageElement, HtmlInputElement, ImageData, Window,
};

const SIZE_ID: &str = "size";
const THUMBNAIL_ID: &str = "thumbnail";

/// Canvas-backed drawing surface
struct CanvasSurface {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    rasterizer: Rasterizer,
}

impl CanvasSurface {
    fn new(canvas: HtmlCanvasElement, context: CanvasRenderingContext2d) -> Self {
        let rasterizer = Rasterizer::new(canvas.width() as usize, canvas.height() as usize);
        Self {
            canvas,
            context,
            rasterizer,
        }
    }
}

impl RenderSurface for CanvasSurface {
    type Error = JsValue;

    fn resize(&mut self, width: u32, height: u32) {
        self.canvas.set_width(width);
        self.canvas.set_height(height);
        self.rasterizer.resize(width, height);
    }

    fn draw_frame(&mut self, scene: &Scene, camera: &Camera) -> Result<(), JsValue> {
        self.rasterizer.render(scene, camera);
        let fb = self.rasterizer.framebuffer();
        if fb.width() == 0 || fb.height() == 0 {
            return Ok(());
        }
        let pixels = fb.to_rgba8();
        let image = ImageData::new_with_u8_clamped_array_and_sh(
            Clamped(&pixels[..]),
            fb.width() as u32,
            fb.height() as u32,
        )?;
        self.context.put_image_data(&image, 0.0, 0.0)
    }
}

/// FPS readout in a corner of the viewer
struct DomStats {
    element: Element,
    stats: FrameStats,
}

impl DomStats {
    fn attach(document: &Document, container: &HtmlElement) -> Result<Self, JsValue> {
        let element = document.create_element("div")?;
        element.set_class_name("stats");
        container.append_child(&element)?;
        Ok(Self {
            element,
            stats: FrameStats::new(),
        })
    }
}

impl Telemetry for DomStats {
    fn update(&mut self, now_ms: f64) {
        self.stats.record(now_ms);
        self.element.set_text_content(Some(&self.stats.to_string()));
    }
}

/// Everything the event handlers and the frame loop share
#[derive(Clone)]
struct Shared {
    viewer: Rc<RefCell<Viewer>>,
    surface: Rc<RefCell<CanvasSurface>>,
    document: Document,
    container: HtmlElement,
    /// Click handler of the thumbnail, brings the viewer back
    show_viewer: Rc<Closure<dyn FnMut()>>,
}

impl Shared {
    fn set_size_text(&self, text: &str) {
        match self.size_element() {
            Ok(element) => element.set_text_content(Some(text)),
            Err(err) => log::warn!("could not show the model size {text:?}: {err:?}"),
        }
    }

    /// `#size`, appended to the page on first use
    fn size_element(&self) -> Result<Element, JsValue> {
        if let Some(element) = self.document.get_element_by_id(SIZE_ID) {
            return Ok(element);
        }
        let element = self.document.create_element("div")?;
        element.set_id(SIZE_ID);
        self.body()?.append_child(&element)?;
        Ok(element)
    }

    /// `img#thumbnail`, appended to the page on first use
    fn thumbnail_element(&self) -> Result<HtmlImageElement, JsValue> {
        if let Some(element) = self.document.get_element_by_id(THUMBNAIL_ID) {
            let image = element.dyn_into::<HtmlImageElement>()?;
            if image.onclick().is_none() {
                image.set_onclick(Some(self.show_viewer_callback()));
            }
            return Ok(image);
        }
        let image = self
            .document
            .create_element("img")?
            .dyn_into::<HtmlImageElement>()?;
        image.set_class_name("thumbnail");
        image.set_id(THUMBNAIL_ID);
        image.set_onclick(Some(self.show_viewer_callback()));
        self.body()?.append_child(&image)?;
        Ok(image)
    }

    fn show_viewer_callback(&self) -> &js_sys::Function {
        let callback: &JsValue = (*self.show_viewer).as_ref();
        callback.unchecked_ref()
    }

    fn body(&self) -> Result<HtmlElement, JsValue> {
        self.document.body().ok_or_else(|| missing("document body"))
    }

    fn set_visible(&self, visible: bool) {
        set_display(&self.container, visible);
    }

    /// One tick of the browser frame loop
    fn frame(&self, now_ms: f64) {
        let mut viewer = self.viewer.borrow_mut();
        let mut surface = self.surface.borrow_mut();
        if let Err(err) = viewer.frame(&mut *surface, now_ms) {
            log::error!("frame failed: {err:?}");
        }
        if viewer.take_thumbnail_request() {
            self.capture_thumbnail(&surface.canvas);
        }
    }

    fn capture_thumbnail(&self, canvas: &HtmlCanvasElement) {
        let captured = canvas.to_data_url().and_then(|url| {
            self.thumbnail_element()?.set_src(&url);
            Ok(())
        });
        if let Err(err) = captured {
            log::warn!("thumbnail capture failed: {err:?}");
        }
    }

    fn resize(&self) {
        let (width, height) = container_size(&self.container);
        let mut surface = self.surface.borrow_mut();
        self.viewer
            .borrow_mut()
            .resize(&mut *surface, width, height);
    }

    /// Replace the current model with `file`.
    ///
    /// The old model is disposed right away; the file is read by the loader.
    fn load_file(&self, file: File) {
        let name = file.name();
        let source = ModelSource::deferred(name.clone(), async move {
            read_file(&file).await.map_err(|err| format!("{err:?}"))
        });
        let format = source.format().unwrap_or_default();

        let on_complete: OnComplete = {
            let shared = self.clone();
            Box::new(move || {
                let mut viewer = shared.viewer.borrow_mut();
                if let Some(size) = viewer.size() {
                    shared.set_size_text(&size.to_string());
                }
                viewer.request_thumbnail();
            })
        };

        let task = match dispatch_load(&self.viewer, source, &format, Some(on_complete)) {
            Ok(task) => task,
            Err(err) => {
                log::error!("loading {name} failed: {err}");
                self.set_size_text(&err.to_string());
                return;
            }
        };

        let shared = self.clone();
        spawn_local(async move {
            match task.await {
                Ok(LoadOutcome::Loaded(_)) => {}
                Ok(LoadOutcome::Stale) => log::debug!("superseded load of {name} finished"),
                Err(err) => {
                    log::error!("loading {name} failed: {err}");
                    shared.set_size_text(&err.to_string());
                }
            }
        });
    }
}

async fn read_file(file: &File) -> Result<Vec<u8>, JsValue> {
    let buffer = JsFuture::from(file.array_buffer()).await?;
    Ok(Uint8Array::new(&buffer).to_vec())
}

fn set_display(element: &HtmlElement, visible: bool) {
    let display = if visible { "block" } else { "none" };
    if let Err(err) = element.style().set_property("display", display) {
        log::warn!("could not toggle the viewer: {err:?}");
    }
}

fn container_size(container: &HtmlElement) -> (u32, u32) {
    surface_size(container.client_width(), container.client_height())
}

/// Surface size for a container of `width` x `height` CSS pixels, at least 1x1
fn surface_size(width: i32, height: i32) -> (u32, u32) {
    (width.max(1) as u32, height.max(1) as u32)
}

/// Orbit angles for a pointer drag of `dx`, `dy` pixels on a surface `height` pixels tall
fn drag_angles(dx: f32, dy: f32, height: f32) -> (f32, f32) {
    let height = height.max(1.0);
    (2.0 * PI * dx / height, 2.0 * PI * dy / height)
}

/// Zoom steps for a wheel event; scrolling up moves closer
fn wheel_steps(delta_y: f64) -> f32 {
    if delta_y < 0.0 {
        1.0
    } else if delta_y > 0.0 {
        -1.0
    } else {
        0.0
    }
}

fn request_animation_frame(window: &Window, f: &Closure<dyn FnMut(f64)>) -> Result<i32, JsValue> {
    window.request_animation_frame(f.as_ref().unchecked_ref())
}

fn missing(what: &str) -> JsValue {
    JsValue::from_str(&format!("missing {what}"))
}

#[wasm_bindgen]
pub struct WebViewer {
    shared: Shared,
    file_input: HtmlInputElement,
    _on_resize: Closure<dyn FnMut()>,
    _on_change: Closure<dyn FnMut()>,
}

#[wasm_bindgen]
impl WebViewer {
    /// Attach a viewer to the element `container_id`, fed by the file input `file_input_id`
    #[wasm_bindgen(constructor)]
    pub fn new(container_id: &str, file_input_id: &str) -> Result<WebViewer, JsValue> {
        let window = web_sys::window().ok_or_else(|| missing("window"))?;
        let document = window.document().ok_or_else(|| missing("document"))?;

        let container = document
            .get_element_by_id(container_id)
            .ok_or_else(|| missing(container_id))?
            .dyn_into::<HtmlElement>()?;
        let file_input = document
            .get_element_by_id(file_input_id)
            .ok_or_else(|| missing(file_input_id))?
            .dyn_into::<HtmlInputElement>()?;
        let (width, height) = container_size(&container);
        let canvas = document
            .create_element("canvas")?
            .dyn_into::<HtmlCanvasElement>()?;
        canvas.set_width(width);
        canvas.set_height(height);
        container.append_child(&canvas)?;
        let context = canvas
            .get_context("2d")?
            .ok_or_else(|| missing("2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()?;

        let mut viewer = Viewer::new(&ViewerConfig::default(), width, height);
        viewer.init_telemetry(|| {
            DomStats::attach(&document, &container)
                .map(|stats| Box::new(stats) as Box<dyn Telemetry>)
                .map_err(|err| format!("{err:?}"))
        });

        let show_viewer = {
            let container = container.clone();
            Closure::<dyn FnMut()>::new(move || set_display(&container, true))
        };

        let shared = Shared {
            viewer: Rc::new(RefCell::new(viewer)),
            surface: Rc::new(RefCell::new(CanvasSurface::new(canvas, context))),
            document,
            container,
            show_viewer: Rc::new(show_viewer),
        };

        let on_resize = {
            let shared = shared.clone();
            Closure::<dyn FnMut()>::new(move || shared.resize())
        };
        window.set_onresize(Some(on_resize.as_ref().unchecked_ref()));

        let on_change = {
            let shared = shared.clone();
            let input = file_input.clone();
            Closure::<dyn FnMut()>::new(move || {
                if let Some(file) = input.files().and_then(|files| files.get(0)) {
                    shared.load_file(file);
                }
            })
        };
        file_input.set_onchange(Some(on_change.as_ref().unchecked_ref()));

        start_frame_loop(&window, shared.clone())?;

        Ok(WebViewer {
            shared,
            file_input,
            _on_resize: on_resize,
            _on_change: on_change,
        })
    }

    /// Open the browser's file picker
    pub fn select_file(&self) {
        self.file_input.click();
    }

    /// Replace the current model with `file`
    pub fn load_file(&self, file: File) {
        self.shared.load_file(file);
    }

    pub fn show(&self) {
        self.shared.set_visible(true);
    }

    pub fn hide(&self) {
        self.shared.set_visible(false);
    }

    /// Forward a pointer drag; the primary button orbits, any other pans
    pub fn pointer_drag(&self, dx: f32, dy: f32, primary: bool) {
        let height = self.shared.surface.borrow().canvas.height() as f32;
        let mut viewer = self.shared.viewer.borrow_mut();
        let Some(controls) = viewer.controls_mut() else {
            return;
        };
        if primary {
            let (left, up) = drag_angles(dx, dy, height);
            controls.rotate(left, up);
        } else {
            let height = height.max(1.0);
            controls.pan(dx / height, dy / height);
        }
    }

    /// Forward a wheel event
    pub fn wheel(&self, delta_y: f64) {
        if let Some(controls) = self.shared.viewer.borrow_mut().controls_mut() {
            controls.zoom(wheel_steps(delta_y));
        }
    }
}

/// Drive [`Shared::frame`] from `requestAnimationFrame` for the lifetime of the page
fn start_frame_loop(window: &Window, shared: Shared) -> Result<(), JsValue> {
    let handle: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));
    let next = handle.clone();
    let loop_window = window.clone();

    *handle.borrow_mut() = Some(Closure::new(move |now_ms: f64| {
        shared.frame(now_ms);
        if let Some(callback) = next.borrow().as_ref() {
            if let Err(err) = request_animation_frame(&loop_window, callback) {
                log::error!("frame loop stopped: {err:?}");
            }
        }
    }));

    let result = match handle.borrow().as_ref() {
        Some(callback) => request_animation_frame(window, callback).map(|_| ()),
        None => Ok(()),
    };
    result
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info)
        .map_err(|err| JsValue::from_str(&err.to_string()))?;
    Ok(())
}


#[cfg(all(test, target_arch = "wasm32"))]
mod dom_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    /// A fresh page fragment with a sized container and a file input
    fn mount(container_id: &str, width: u32, height: u32) -> (Document, WebViewer) {
        let document = web_sys::window().unwrap().document().unwrap();
        for id in [SIZE_ID, THUMBNAIL_ID] {
            if let Some(stale) = document.get_element_by_id(id) {
                stale.remove();
            }
        }
        let body = document.body().unwrap();

        let container = document.create_element("div").unwrap();
        container.set_id(container_id);
        container
            .set_attribute(
                "style",
                &format!("width: {width}px; height: {height}px; overflow: hidden"),
            )
            .unwrap();
        body.append_child(&container).unwrap();

        let input_id = format!("{container_id}-file");
        let input = document
            .create_element("input")
            .unwrap()
            .dyn_into::<HtmlInputElement>()
            .unwrap();
        input.set_type("file");
        input.set_id(&input_id);
        body.append_child(&input).unwrap();

        let viewer = WebViewer::new(container_id, &input_id).unwrap();
        (document, viewer)
    }

    #[wasm_bindgen_test]
    fn test_canvas_follows_container() {
        let (_, viewer) = mount("sized-viewer", 320, 200);
        let canvas = viewer.shared.surface.borrow().canvas.clone();
        assert_eq!((canvas.width(), canvas.height()), (320, 200));

        viewer
            .shared
            .container
            .style()
            .set_property("width", "160px")
            .unwrap();
        viewer.shared.resize();
        assert_eq!((canvas.width(), canvas.height()), (160, 200));
        let aspect = viewer.shared.viewer.borrow().camera().aspect;
        assert!((aspect - 0.8).abs() < 1e-6);
    }

    #[wasm_bindgen_test]
    fn test_size_text_creates_missing_element() {
        let (document, viewer) = mount("size-viewer", 100, 100);
        assert!(document.get_element_by_id(SIZE_ID).is_none());

        viewer.shared.set_size_text("2 x 4 x 3");
        let size = document.get_element_by_id(SIZE_ID).unwrap();
        assert_eq!(size.text_content().as_deref(), Some("2 x 4 x 3"));

        viewer.shared.set_size_text("1 x 1 x 1");
        assert_eq!(size.text_content().as_deref(), Some("1 x 1 x 1"));
    }

    #[wasm_bindgen_test]
    fn test_thumbnail_is_created_and_shows_viewer() {
        let (document, viewer) = mount("thumb-viewer", 64, 64);
        viewer.hide();

        viewer.shared.viewer.borrow_mut().request_thumbnail();
        viewer.shared.frame(0.0);

        let image = document
            .get_element_by_id(THUMBNAIL_ID)
            .unwrap()
            .dyn_into::<HtmlImageElement>()
            .unwrap();
        assert_eq!(image.class_name(), "thumbnail");
        assert!(image.src().starts_with("data:image/png"));

        image.click();
        let display = viewer
            .shared
            .container
            .style()
            .get_property_value("display")
            .unwrap();
        assert_eq!(display, "block");
    }
}
