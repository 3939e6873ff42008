/// ASCII presentation of the software rasterizer
use crossterm::{
    cursor,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
    QueueableCommand,
};
use i3d_core::{Camera, Color as Rgb, Framebuffer, Rasterizer, RenderSurface, Scene};
use std::io::{self, Write};

/// Character luminosity ramp for shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &['.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Rows at the top of the terminal kept free for the status line
pub const STATUS_ROWS: u16 = 1;

/// Terminal drawing surface.
///
/// Each character cell covers two vertically stacked framebuffer pixels, which
/// keeps pixels roughly square on common terminal fonts.
pub struct AsciiSurface<W: Write> {
    rasterizer: Rasterizer,
    out: W,
    visible: bool,
}

impl<W: Write> AsciiSurface<W> {
    /// A surface for a terminal of `columns` x `rows` cells
    pub fn new(columns: u16, rows: u16, out: W) -> Self {
        let (width, height) = Self::pixel_size(columns, rows);
        Self {
            rasterizer: Rasterizer::new(width as usize, height as usize),
            out,
            visible: true,
        }
    }

    /// Framebuffer size backing a terminal of `columns` x `rows` cells, below the status rows
    pub fn pixel_size(columns: u16, rows: u16) -> (u32, u32) {
        (columns as u32, rows.saturating_sub(STATUS_ROWS) as u32 * 2)
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        self.rasterizer.framebuffer()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn writer(&mut self) -> &mut W {
        &mut self.out
    }

    /// Write the framebuffer as shaded characters, starting below the status rows
    fn present(&mut self) -> io::Result<()> {
        let fb = self.rasterizer.framebuffer();
        let (columns, rows) = (fb.width(), fb.height() / 2);

        for row in 0..rows {
            self.out.queue(cursor::MoveTo(0, row as u16 + STATUS_ROWS))?;
            for column in 0..columns {
                match cell(fb, column, row) {
                    Some(color) => {
                        let [r, g, b, _] = color.to_rgba8();
                        self.out
                            .queue(SetForegroundColor(Color::Rgb { r, g, b }))?
                            .queue(Print(shade_char(color)))?;
                    }
                    None => {
                        self.out.queue(Print(' '))?;
                    }
                }
            }
        }
        self.out.queue(ResetColor)?;
        Ok(())
    }
}

impl<W: Write> RenderSurface for AsciiSurface<W> {
    type Error = io::Error;

    fn resize(&mut self, width: u32, height: u32) {
        self.rasterizer.resize(width, height);
    }

    fn draw_frame(&mut self, scene: &Scene, camera: &Camera) -> io::Result<()> {
        self.rasterizer.render(scene, camera);
        if self.visible {
            self.present()
        } else {
            self.out.queue(Clear(ClearType::All))?;
            Ok(())
        }
    }
}

/// Average color of the covered pixels under one character cell
fn cell(fb: &Framebuffer, column: usize, row: usize) -> Option<Rgb> {
    let samples = [row * 2, row * 2 + 1]
        .into_iter()
        .filter(|&y| fb.covered(column, y))
        .map(|y| fb.pixel(column, y))
        .collect::<Vec<_>>();

    match samples.as_slice() {
        [one] => Some(*one),
        [a, b] => Some((*a + *b) * 0.5),
        _ => None,
    }
}

fn shade_char(color: Rgb) -> char {
    let idx = (color.luminance() * (LUMINOSITY_RAMP.len() - 1) as f32).round() as usize;
    LUMINOSITY_RAMP[idx.min(LUMINOSITY_RAMP.len() - 1)]
}
