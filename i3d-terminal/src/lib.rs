/// Terminal host for the i3d model viewer
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType},
};
use futures::executor::{LocalPool, LocalSpawner};
use futures::task::LocalSpawnExt;
use i3d_core::{
    dispatch_load, stl, FrameStats, LoadOutcome, Mesh, ModelSource, OnComplete, OrbitControls,
    Snapshot, Telemetry, Viewer, ViewerConfig,
};
use std::cell::{Cell, RefCell};
use std::io::{self, stdout, Stdout, Write};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

pub mod renderer;

pub use renderer::AsciiSurface;

const ORBIT_STEP: f32 = 0.1;
/// Keyboard pan step, in viewport heights
const PAN_STEP: f32 = 0.05;
const THUMBNAIL_SIDE: u32 = 256;
/// Edge length of the model shown when no file is given
const BUILTIN_CUBE_SIZE: f32 = 100.0;

/// What a key press asks the viewer to do
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Quit,
    Orbit { left: f32, up: f32 },
    Zoom(f32),
    Pan { dx: f32, dy: f32 },
    NextFile,
    Reload,
    Thumbnail,
    ToggleVisible,
}

impl Action {
    pub fn from_key(code: KeyCode) -> Option<Self> {
        let action = match code {
            KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
            KeyCode::Char('a') | KeyCode::Left => Action::Orbit {
                left: ORBIT_STEP,
                up: 0.0,
            },
            KeyCode::Char('d') | KeyCode::Right => Action::Orbit {
                left: -ORBIT_STEP,
                up: 0.0,
            },
            KeyCode::Char('w') | KeyCode::Up => Action::Orbit {
                left: 0.0,
                up: ORBIT_STEP,
            },
            KeyCode::Char('s') | KeyCode::Down => Action::Orbit {
                left: 0.0,
                up: -ORBIT_STEP,
            },
            KeyCode::Char('+') | KeyCode::Char('=') => Action::Zoom(1.0),
            KeyCode::Char('-') => Action::Zoom(-1.0),
            KeyCode::Char('j') => Action::Pan {
                dx: PAN_STEP,
                dy: 0.0,
            },
            KeyCode::Char('l') => Action::Pan {
                dx: -PAN_STEP,
                dy: 0.0,
            },
            KeyCode::Char('i') => Action::Pan {
                dx: 0.0,
                dy: PAN_STEP,
            },
            KeyCode::Char('k') => Action::Pan {
                dx: 0.0,
                dy: -PAN_STEP,
            },
            KeyCode::Char('n') => Action::NextFile,
            KeyCode::Char('r') => Action::Reload,
            KeyCode::Char('p') => Action::Thumbnail,
            KeyCode::Char('v') => Action::ToggleVisible,
            _ => return None,
        };
        Some(action)
    }
}

/// Startup options of [`TerminalApp`]
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    pub files: Vec<PathBuf>,
    pub thumbnail: PathBuf,
    pub config: ViewerConfig,
}

/// FPS counter feeding the status line
struct FpsOverlay {
    stats: FrameStats,
    fps: Rc<Cell<f32>>,
}

impl Telemetry for FpsOverlay {
    fn update(&mut self, now_ms: f64) {
        self.stats.record(now_ms);
        self.fps.set(self.stats.fps());
    }
}

/// Source of the model shown when no file was given
pub fn builtin_cube() -> ModelSource {
    ModelSource::bytes(
        "cube.stl",
        stl::write_binary_stl(&Mesh::cube(BUILTIN_CUBE_SIZE)),
    )
}

/// Main application struct for terminal model viewing
pub struct TerminalApp {
    viewer: Rc<RefCell<Viewer>>,
    surface: AsciiSurface<Stdout>,
    pool: LocalPool,
    spawner: LocalSpawner,
    files: Vec<PathBuf>,
    current: usize,
    status: Rc<RefCell<String>>,
    fps: Rc<Cell<f32>>,
    thumbnail: PathBuf,
    last_thumbnail: Option<PathBuf>,
    started: Instant,
    running: bool,
}

impl TerminalApp {
    pub fn new(options: AppOptions) -> io::Result<Self> {
        let (columns, rows) = terminal::size()?;
        let (width, height) = AsciiSurface::<Stdout>::pixel_size(columns, rows);
        let mut viewer = Viewer::new(&options.config, width, height);

        let fps = Rc::new(Cell::new(0.0));
        let overlay_fps = fps.clone();
        viewer.init_telemetry(move || -> io::Result<Box<dyn Telemetry>> {
            let (_, rows) = terminal::size()?;
            if rows < 2 {
                return Err(io::Error::other("terminal too small for the status line"));
            }
            Ok(Box::new(FpsOverlay {
                stats: FrameStats::new(),
                fps: overlay_fps,
            }))
        });

        let pool = LocalPool::new();
        let spawner = pool.spawner();

        Ok(Self {
            viewer: Rc::new(RefCell::new(viewer)),
            surface: AsciiSurface::new(columns, rows, stdout()),
            pool,
            spawner,
            files: options.files,
            current: 0,
            status: Rc::new(RefCell::new(String::new())),
            fps,
            thumbnail: options.thumbnail,
            last_thumbnail: None,
            started: Instant::now(),
            running: true,
        })
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        self.load_current();
        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = Duration::from_millis(1000 / 30); // 30 FPS target

        while self.running {
            let frame_start = Instant::now();

            while event::poll(Duration::ZERO)? {
                self.handle_event(event::read()?);
            }

            // Let finished loads populate the scene
            self.pool.run_until_stalled();

            self.render()?;

            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Resize(columns, rows) => {
                let (width, height) = AsciiSurface::<Stdout>::pixel_size(columns, rows);
                self.viewer
                    .borrow_mut()
                    .resize(&mut self.surface, width, height);
            }
            Event::Key(KeyEvent { code, kind, .. }) if kind != KeyEventKind::Release => {
                if let Some(action) = Action::from_key(code) {
                    self.apply(action);
                }
            }
            _ => {}
        }
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::Quit => self.running = false,
            Action::Orbit { left, up } => self.with_controls(|c| c.rotate(left, up)),
            Action::Zoom(steps) => self.with_controls(|c| c.zoom(steps)),
            Action::Pan { dx, dy } => self.with_controls(|c| c.pan(dx, dy)),
            Action::NextFile => {
                if !self.files.is_empty() {
                    self.current = (self.current + 1) % self.files.len();
                }
                self.load_current();
            }
            Action::Reload => self.load_current(),
            Action::Thumbnail => self.viewer.borrow_mut().request_thumbnail(),
            Action::ToggleVisible => {
                let visible = !self.surface.is_visible();
                self.surface.set_visible(visible);
            }
        }
    }

    fn with_controls(&self, f: impl FnOnce(&mut OrbitControls)) {
        if let Some(controls) = self.viewer.borrow_mut().controls_mut() {
            f(controls);
        }
    }

    /// Replace the viewer's model with the current file (or the built-in cube)
    fn load_current(&mut self) {
        let source = match self.files.get(self.current) {
            Some(path) => ModelSource::path(path.clone()),
            None => builtin_cube(),
        };
        let format = source.format().unwrap_or_default();
        *self.status.borrow_mut() = format!("loading {}", source.name());

        let on_complete: OnComplete = {
            let viewer = self.viewer.clone();
            let status = self.status.clone();
            Box::new(move || {
                let mut viewer = viewer.borrow_mut();
                if let Some(size) = viewer.size() {
                    *status.borrow_mut() = size.to_string();
                }
                viewer.request_thumbnail();
            })
        };

        let load = match dispatch_load(&self.viewer, source, &format, Some(on_complete)) {
            Ok(load) => load,
            Err(err) => {
                log::warn!("load failed: {err}");
                *self.status.borrow_mut() = format!("error: {err}");
                return;
            }
        };

        let status = self.status.clone();
        let task = async move {
            match load.await {
                Ok(LoadOutcome::Loaded(_)) => {}
                Ok(LoadOutcome::Stale) => log::debug!("superseded load finished"),
                Err(err) => {
                    log::warn!("load failed: {err}");
                    *status.borrow_mut() = format!("error: {err}");
                }
            }
        };
        if let Err(err) = self.spawner.spawn_local(task) {
            log::error!("could not schedule load: {err}");
        }
    }

    fn render(&mut self) -> io::Result<()> {
        let now_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let (rendered, capture) = {
            let mut viewer = self.viewer.borrow_mut();
            let rendered = viewer.frame(&mut self.surface, now_ms);
            (rendered, viewer.take_thumbnail_request())
        };
        if let Err(err) = rendered {
            log::error!("frame failed: {err}");
        }
        if capture {
            self.capture_thumbnail();
        }

        self.draw_status()?;
        self.surface.writer().flush()
    }

    fn capture_thumbnail(&mut self) {
        let snapshot = Snapshot::capture(self.surface.framebuffer()).thumbnail(THUMBNAIL_SIDE);
        match snapshot.save_png(&self.thumbnail) {
            Ok(()) => {
                log::info!("thumbnail written to {}", self.thumbnail.display());
                self.last_thumbnail = Some(self.thumbnail.clone());
            }
            Err(err) => log::warn!("thumbnail not saved: {err}"),
        }
    }

    fn draw_status(&mut self) -> io::Result<()> {
        let line = format!(
            "i3d | {} | FPS: {:.1} | WASD/Arrows=Orbit +/-=Zoom IJKL=Pan N=Next R=Reload P=Thumb V=View Q=Quit",
            self.status.borrow(),
            self.fps.get()
        );
        let out = self.surface.writer();
        queue!(
            out,
            cursor::MoveTo(0, 0),
            terminal::Clear(ClearType::CurrentLine),
            SetForegroundColor(Color::Yellow),
            Print(line),
            ResetColor
        )?;

        if !self.surface.is_visible() {
            let hint = match &self.last_thumbnail {
                Some(path) => format!("viewer hidden | thumbnail: {} | V=Show", path.display()),
                None => "viewer hidden | no thumbnail yet | V=Show".to_string(),
            };
            let out = self.surface.writer();
            queue!(out, cursor::MoveTo(0, 2), Print(hint))?;
        }
        Ok(())
    }
}
