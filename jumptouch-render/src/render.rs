use jumptouch_core::{DrawSurface, Point, Rgba};
use jumptouch_timing::Timer;
use std::time::Duration;
use thiserror::Error;
use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Rect, Transform};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cannot allocate a {width}x{height} canvas")]
    Allocation { width: u32, height: u32 },
    #[error("frame buffer holds {actual} bytes, canvas needs {expected}")]
    FrameSize { expected: usize, actual: usize },
}

pub struct FrameStats {
    pub draw: Duration,
    pub copy: Duration,
    pub total: Duration,
}

/// Offscreen RGBA canvas the trial draws into, later copied to the
/// window's frame buffer.
pub struct SkiaSurface {
    canvas: Pixmap,
    anti_alias: bool,
}

impl SkiaSurface {
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        let canvas =
            Pixmap::new(width.max(1), height.max(1)).ok_or(RenderError::Allocation { width, height })?;
        Ok(Self {
            canvas,
            anti_alias: true,
        })
    }

    pub fn with_anti_alias(mut self, on: bool) -> Self {
        self.anti_alias = on;
        self
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.canvas =
            Pixmap::new(width.max(1), height.max(1)).ok_or(RenderError::Allocation { width, height })?;
        Ok(())
    }

    pub fn data(&self) -> &[u8] {
        self.canvas.data()
    }

    /// Premultiplied pixel at `(x, y)`, `None` outside the canvas.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        self.canvas
            .pixel(x, y)
            .map(|p| Rgba([p.red(), p.green(), p.blue(), p.alpha()]))
    }

    /// Runs `draw` against the canvas and copies the result into
    /// `frame_buffer`, recording the frame cost on `timer`.
    pub fn render_frame<T, F>(
        &mut self,
        draw: F,
        frame_buffer: &mut [u8],
        timer: &mut T,
    ) -> Result<FrameStats, RenderError>
    where
        T: Timer,
        F: FnOnce(&mut Self),
    {
        let t = timer.now();
        draw(self);
        let draw = timer.elapsed(t);

        let t = timer.now();
        self.present(frame_buffer)?;
        let copy = timer.elapsed(t);

        let total = draw + copy;
        timer.record_frame(total);
        Ok(FrameStats { draw, copy, total })
    }

    pub fn present(&self, frame_buffer: &mut [u8]) -> Result<(), RenderError> {
        let src = self.canvas.data();
        if frame_buffer.len() != src.len() {
            return Err(RenderError::FrameSize {
                expected: src.len(),
                actual: frame_buffer.len(),
            });
        }
        frame_buffer.copy_from_slice(src);
        Ok(())
    }

    fn covers_canvas(&self, origin: Point, width: f32, height: f32) -> bool {
        origin.x <= 0.0
            && origin.y <= 0.0
            && origin.x + width >= self.canvas.width() as f32
            && origin.y + height >= self.canvas.height() as f32
    }

    /// Opaque whole-canvas fill without going through the rasterizer.
    fn flood(&mut self, color: Rgba) {
        let packed = u32::from_ne_bytes(color.0);
        let data = self.canvas.data_mut();
        match bytemuck::try_cast_slice_mut::<u8, u32>(data) {
            Ok(px) => px.fill(packed),
            Err(_) => data
                .chunks_exact_mut(4)
                .for_each(|p| p.copy_from_slice(&color.0)),
        }
    }

    fn paint(&self, color: Rgba) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.anti_alias = self.anti_alias;
        paint.set_color_rgba8(color.r(), color.g(), color.b(), color.a());
        paint
    }
}

impl DrawSurface for SkiaSurface {
    fn clear(&mut self) {
        self.canvas.fill(Color::TRANSPARENT);
    }

    fn fill_rect(&mut self, origin: Point, width: f32, height: f32, color: Rgba) {
        if color.is_opaque() && self.covers_canvas(origin, width, height) {
            self.flood(color);
            return;
        }
        let Some(rect) = Rect::from_xywh(origin.x, origin.y, width, height) else {
            return;
        };
        let paint = self.paint(color);
        self.canvas
            .fill_rect(rect, &paint, Transform::identity(), None);
    }

    fn fill_circle(&mut self, center: Point, radius: f32, color: Rgba) {
        let Some(path) = PathBuilder::from_circle(center.x, center.y, radius) else {
            return;
        };
        let paint = self.paint(color);
        self.canvas.fill_path(
            &path,
            &paint,
            FillRule::Winding,
            Transform::identity(),
            None,
        );
    }
}
