/// i3d terminal viewer
///
/// Orbits STL models in the terminal. Without files a built-in cube is shown.
/// Controls:
///   - WASD / Arrow Keys: Orbit
///   - +/-: Zoom
///   - IJKL: Pan
///   - N/R: Next file, reload
///   - P: Write a thumbnail
///   - V: Show/hide the viewer
///   - Q/ESC: Quit
use clap::Parser;
use i3d_core::ViewerConfig;
use i3d_terminal::{AppOptions, TerminalApp};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "i3d-terminal")]
#[command(about = "Orbit STL models in the terminal", long_about = None)]
struct Cli {
    /// STL files to view, cycled with N
    files: Vec<PathBuf>,

    /// Slowly orbit the model
    #[arg(long)]
    auto_rotate: bool,

    /// Stop as soon as input stops instead of easing out
    #[arg(long)]
    no_damping: bool,

    /// Where captured thumbnails are written
    #[arg(long, default_value = "thumbnail.png")]
    thumbnail: PathBuf,
}

impl Cli {
    fn options(self) -> AppOptions {
        let mut config = ViewerConfig::default();
        config.controls.auto_rotate = self.auto_rotate;
        config.controls.enable_damping = !self.no_damping;

        AppOptions {
            files: self.files,
            thumbnail: self.thumbnail,
            config,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    }

    let mut app = TerminalApp::new(cli.options())?;
    app.run()?;

    Ok(())
}
