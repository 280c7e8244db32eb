//! Raster drawing primitives on an RGB buffer

use image::{Rgb, RgbImage};

/// White background
pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
/// Black foreground
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
/// Axis frame color
pub const FRAME: Rgb<u8> = Rgb([64, 64, 64]);
/// Contour overlay color
pub const CONTOUR: Rgb<u8> = Rgb([255, 0, 0]);

/// Pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    /// Shrink by margins (left, top, right, bottom)
    #[must_use]
    pub fn inset(self, left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            x: self.x + left,
            y: self.y + top,
            width: self.width.saturating_sub(left + right).max(1),
            height: self.height.saturating_sub(top + bottom).max(1),
        }
    }

    /// Largest centered rectangle with the aspect ratio `w:h`
    #[must_use]
    pub fn fit_aspect(self, w: usize, h: usize) -> Self {
        if w == 0 || h == 0 {
            return self;
        }
        let scale = (f64::from(self.width) / w as f64).min(f64::from(self.height) / h as f64);
        let fw = ((w as f64 * scale).floor() as u32).clamp(1, self.width);
        let fh = ((h as f64 * scale).floor() as u32).clamp(1, self.height);
        Self {
            x: self.x + (self.width - fw) / 2,
            y: self.y + (self.height - fh) / 2,
            width: fw,
            height: fh,
        }
    }
}

/// Linear mapping from data coordinates into a pixel rectangle
///
/// The y axis points up in data space.
#[derive(Debug, Clone, Copy)]
pub struct Axes {
    pub area: Rect,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
}

impl Axes {
    /// Pixel position of a data point, `None` when outside the ranges
    #[must_use]
    pub fn to_pixel(&self, x: f64, y: f64) -> Option<(i64, i64)> {
        let (x0, x1) = self.x_range;
        let (y0, y1) = self.y_range;
        if !(x.is_finite() && y.is_finite()) || x < x0 || x > x1 || y < y0 || y > y1 {
            return None;
        }
        Some(self.to_pixel_unclipped(x, y))
    }

    /// Pixel position without range checks
    #[must_use]
    pub fn to_pixel_unclipped(&self, x: f64, y: f64) -> (i64, i64) {
        let (x0, x1) = self.x_range;
        let (y0, y1) = self.y_range;
        let fx = (x - x0) / (x1 - x0);
        let fy = (y - y0) / (y1 - y0);
        let px = f64::from(self.area.x) + fx * f64::from(self.area.width - 1);
        let py = f64::from(self.area.y) + (1.0 - fy) * f64::from(self.area.height - 1);
        (px.round() as i64, py.round() as i64)
    }
}

/// Drawing surface
#[derive(Debug, Clone)]
pub struct Canvas {
    img: RgbImage,
}

impl Canvas {
    /// White canvas
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            img: RgbImage::from_pixel(width, height, WHITE),
        }
    }

    /// Canvas width
    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.img.width()
    }

    /// Canvas height
    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.img.height()
    }

    /// Finished image
    #[must_use]
    pub fn into_image(self) -> RgbImage {
        self.img
    }

    fn in_bounds(&self, x: i64, y: i64) -> Option<(u32, u32)> {
        let x = u32::try_from(x).ok()?;
        let y = u32::try_from(y).ok()?;
        (x < self.img.width() && y < self.img.height()).then_some((x, y))
    }

    /// Set one pixel, ignoring out-of-bounds coordinates
    pub fn put(&mut self, x: i64, y: i64, color: Rgb<u8>) {
        if let Some((x, y)) = self.in_bounds(x, y) {
            self.img.put_pixel(x, y, color);
        }
    }

    /// Blend one pixel toward `color` by `alpha`
    pub fn blend(&mut self, x: i64, y: i64, color: Rgb<u8>, alpha: f64) {
        if let Some((x, y)) = self.in_bounds(x, y) {
            let px = self.img.get_pixel_mut(x, y);
            for c in 0..3 {
                let mixed = f64::from(px.0[c]) * (1.0 - alpha) + f64::from(color.0[c]) * alpha;
                px.0[c] = mixed.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    /// Filled square marker of side `2 * radius + 1`
    pub fn marker(&mut self, x: i64, y: i64, radius: i64, color: Rgb<u8>) {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                self.put(x + dx, y + dy, color);
            }
        }
    }

    /// Straight line (Bresenham)
    pub fn line(&mut self, from: (i64, i64), to: (i64, i64), color: Rgb<u8>) {
        let (mut x0, mut y0) = from;
        let (x1, y1) = to;
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.put(x0, y0, color);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    /// Connected polyline
    pub fn polyline(&mut self, points: &[(i64, i64)], color: Rgb<u8>) {
        for pair in points.windows(2) {
            self.line(pair[0], pair[1], color);
        }
    }

    /// One-pixel rectangle outline
    pub fn frame(&mut self, r: Rect, color: Rgb<u8>) {
        let (x0, y0) = (i64::from(r.x), i64::from(r.y));
        let (x1, y1) = (x0 + i64::from(r.width) - 1, y0 + i64::from(r.height) - 1);
        self.polyline(&[(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)], color);
    }

    /// Grayscale raster scaled into `r` (nearest neighbor)
    pub fn blit_gray(&mut self, r: Rect, width: usize, height: usize, pixels: &[u8]) {
        if width == 0 || height == 0 {
            return;
        }
        for py in 0..r.height {
            let sy = (py as usize * height) / r.height as usize;
            for px in 0..r.width {
                let sx = (px as usize * width) / r.width as usize;
                let v = pixels[sy * width + sx];
                self.put(i64::from(r.x + px), i64::from(r.y + py), Rgb([v, v, v]));
            }
        }
    }
}

/// Color for a normalized value in `[0, 1]` on a dark-blue to yellow ramp
#[must_use]
pub fn density_color(t: f64) -> Rgb<u8> {
    const STOPS: [[f64; 3]; 5] = [
        [68.0, 1.0, 84.0],
        [59.0, 82.0, 139.0],
        [33.0, 145.0, 140.0],
        [94.0, 201.0, 98.0],
        [253.0, 231.0, 37.0],
    ];
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let pos = t * (STOPS.len() - 1) as f64;
    let i = (pos.floor() as usize).min(STOPS.len() - 2);
    let f = pos - i as f64;
    let mut out = [0u8; 3];
    for (c, slot) in out.iter_mut().enumerate() {
        *slot = (STOPS[i][c] + (STOPS[i + 1][c] - STOPS[i][c]) * f).round() as u8;
    }
    Rgb(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axes_map_corners() {
        let axes = Axes {
            area: Rect { x: 10, y: 20, width: 101, height: 51 },
            x_range: (0.0, 1.0),
            y_range: (0.0, 1.0),
        };
        assert_eq!(axes.to_pixel(0.0, 0.0), Some((10, 70)));
        assert_eq!(axes.to_pixel(1.0, 1.0), Some((110, 20)));
        assert_eq!(axes.to_pixel(1.5, 0.0), None);
    }

    #[test]
    fn fit_aspect_centers() {
        let r = Rect { x: 0, y: 0, width: 200, height: 100 }.fit_aspect(50, 50);
        assert_eq!(r, Rect { x: 50, y: 0, width: 100, height: 100 });
    }

    #[test]
    fn line_draws_endpoints_and_clips() {
        let mut c = Canvas::new(10, 10);
        c.line((-5, 0), (9, 9), BLACK);
        let img = c.into_image();
        assert_eq!(*img.get_pixel(9, 9), BLACK);
    }

    #[test]
    fn blend_mixes() {
        let mut c = Canvas::new(1, 1);
        c.blend(0, 0, BLACK, 0.2);
        assert_eq!(c.into_image().get_pixel(0, 0).0, [204, 204, 204]);
    }

    #[test]
    fn color_ramp_endpoints() {
        assert_eq!(density_color(0.0), Rgb([68, 1, 84]));
        assert_eq!(density_color(1.0), Rgb([253, 231, 37]));
        assert_eq!(density_color(f64::NAN), Rgb([68, 1, 84]));
    }
}
