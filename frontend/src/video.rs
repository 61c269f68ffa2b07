//! Window and renderer. Frames arrive as RGB24 at the machine's native size;
//! the renderer scales them to the window and letterboxes the remainder.

use sdl2::VideoSubsystem;
use sdl2::pixels::{Color, PixelFormatEnum};
use sdl2::render::{Canvas, TextureCreator};
use sdl2::video::{Window, WindowContext};
use tandem_core::handoff::BYTES_PER_PIXEL;
use tracing::debug;

use crate::error::FrontendError;

pub struct Video {
    canvas: Canvas<Window>,
    textures: TextureCreator<WindowContext>,
    native: (u32, u32),
}

impl Video {
    /// Open a resizable window at `scale` times the native resolution.
    pub fn open(
        sdl_video: &VideoSubsystem,
        title: &str,
        native: (u32, u32),
        scale: u32,
    ) -> Result<Self, FrontendError> {
        let (width, height) = native;
        let window = sdl_video
            .window(title, width.saturating_mul(scale), height.saturating_mul(scale))
            .position_centered()
            .resizable()
            .build()
            .map_err(FrontendError::sdl)?;

        let mut canvas = window
            .into_canvas()
            .accelerated()
            .build()
            .map_err(FrontendError::sdl)?;
        canvas
            .set_logical_size(width, height)
            .map_err(FrontendError::sdl)?;
        canvas.set_draw_color(Color::BLACK);
        debug!(width, height, scale, "window opened");

        let textures = canvas.texture_creator();
        Ok(Self {
            canvas,
            textures,
            native,
        })
    }

    pub fn set_title(&mut self, title: &str) {
        // Titles are built from our own status text; an interior NUL cannot occur.
        let _ = self.canvas.window_mut().set_title(title);
    }

    /// Draw one native-size RGB24 frame.
    pub fn present(&mut self, frame: &[u8]) -> Result<(), FrontendError> {
        let (width, height) = self.native;
        let mut texture = self
            .textures
            .create_texture_streaming(PixelFormatEnum::RGB24, width, height)
            .map_err(FrontendError::sdl)?;
        texture
            .update(None, frame, width as usize * BYTES_PER_PIXEL)
            .map_err(FrontendError::sdl)?;

        self.canvas.clear();
        self.canvas
            .copy(&texture, None, None)
            .map_err(FrontendError::sdl)?;
        self.canvas.present();
        Ok(())
    }
}
