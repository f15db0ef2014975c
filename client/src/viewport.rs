/// Pan/zoom transformation between world coordinates and screen pixels.
/// World space is plate-carrée degrees: x = longitude, y = negated latitude
/// (so north points up while screen y grows downward); `scale` is pixels
/// per degree.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub offset_x: f64,
    pub offset_y: f64,
    pub scale: f64,
}

const MIN_SCALE: f64 = 40.0;
const MAX_SCALE: f64 = 2_000_000.0;
const ZOOM_SENSITIVITY: f64 = 0.001;

/// Los Angeles basin, matching the original map's initial view.
pub const DEFAULT_CENTER_LON: f64 = -118.25;
pub const DEFAULT_CENTER_LAT: f64 = 34.05;
const DEFAULT_SCALE: f64 = 2_400.0;

/// Project a dataset coordinate into world space.
pub fn world_of(lon: f64, lat: f64) -> (f64, f64) {
    (lon, -lat)
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            scale: DEFAULT_SCALE,
        }
    }
}

impl Viewport {
    /// Convert world coordinates to screen coordinates.
    pub fn world_to_screen(&self, wx: f64, wy: f64) -> (f64, f64) {
        (
            wx * self.scale + self.offset_x,
            wy * self.scale + self.offset_y,
        )
    }

    /// Convert screen coordinates to world coordinates.
    pub fn screen_to_world(&self, sx: f64, sy: f64) -> (f64, f64) {
        (
            (sx - self.offset_x) / self.scale,
            (sy - self.offset_y) / self.scale,
        )
    }

    /// Zoom toward a focus point (screen coordinates).
    pub fn zoom_at(&mut self, delta: f64, screen_x: f64, screen_y: f64) {
        let factor = (-delta * ZOOM_SENSITIVITY).exp();
        let new_scale = (self.scale * factor).clamp(MIN_SCALE, MAX_SCALE);
        let ratio = new_scale / self.scale;

        // Adjust offset so the point under the cursor stays fixed
        self.offset_x = screen_x - (screen_x - self.offset_x) * ratio;
        self.offset_y = screen_y - (screen_y - self.offset_y) * ratio;
        self.scale = new_scale;
    }

    /// Pan by screen-space delta.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.offset_x += dx;
        self.offset_y += dy;
    }

    /// Center the default view (used until the dataset arrives).
    pub fn center_default(&mut self, canvas_w: f64, canvas_h: f64) {
        let (wx, wy) = world_of(DEFAULT_CENTER_LON, DEFAULT_CENTER_LAT);
        self.scale = DEFAULT_SCALE;
        self.offset_x = canvas_w / 2.0 - wx * self.scale;
        self.offset_y = canvas_h / 2.0 - wy * self.scale;
    }

    /// Fit the viewport to show the given world-coordinate bounds with padding.
    pub fn fit_bounds(
        &mut self,
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
        canvas_w: f64,
        canvas_h: f64,
    ) {
        let world_w = max_x - min_x;
        let world_h = max_y - min_y;

        if world_w <= 0.0 || world_h <= 0.0 || canvas_w <= 0.0 || canvas_h <= 0.0 {
            // Degenerate bounds (single parcel): center on the point instead.
            if world_w >= 0.0 && world_h >= 0.0 && canvas_w > 0.0 && canvas_h > 0.0 {
                self.offset_x = canvas_w / 2.0 - (min_x + max_x) / 2.0 * self.scale;
                self.offset_y = canvas_h / 2.0 - (min_y + max_y) / 2.0 * self.scale;
            }
            return;
        }

        let padding = 0.05;
        let scale_x = canvas_w / (world_w * (1.0 + padding * 2.0));
        let scale_y = canvas_h / (world_h * (1.0 + padding * 2.0));
        self.scale = scale_x.min(scale_y).clamp(MIN_SCALE, MAX_SCALE);

        let center_x = (min_x + max_x) / 2.0;
        let center_y = (min_y + max_y) / 2.0;
        self.offset_x = canvas_w / 2.0 - center_x * self.scale;
        self.offset_y = canvas_h / 2.0 - center_y * self.scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn screen_world_roundtrip() {
        let vp = Viewport {
            offset_x: 120.0,
            offset_y: -40.0,
            scale: 3_000.0,
        };
        let (wx, wy) = world_of(-118.25, 34.05);
        let (sx, sy) = vp.world_to_screen(wx, wy);
        let (bx, by) = vp.screen_to_world(sx, sy);
        assert_close(bx, wx);
        assert_close(by, wy);
    }

    #[test]
    fn zoom_keeps_focus_point_fixed() {
        let mut vp = Viewport::default();
        vp.center_default(1200.0, 800.0);
        let focus = (400.0, 300.0);
        let before = vp.screen_to_world(focus.0, focus.1);
        vp.zoom_at(-240.0, focus.0, focus.1);
        let after = vp.screen_to_world(focus.0, focus.1);
        assert_close(after.0, before.0);
        assert_close(after.1, before.1);
        assert!(vp.scale > DEFAULT_SCALE);
    }

    #[test]
    fn zoom_respects_scale_limits() {
        let mut vp = Viewport::default();
        vp.zoom_at(1.0e9, 0.0, 0.0);
        assert_close(vp.scale, MIN_SCALE);
        vp.zoom_at(-1.0e9, 0.0, 0.0);
        assert_close(vp.scale, MAX_SCALE);
    }

    #[test]
    fn fit_bounds_contains_the_bounds() {
        let mut vp = Viewport::default();
        let (min_x, min_y) = world_of(-118.4, 34.3);
        let (max_x, max_y) = world_of(-118.1, 34.0);
        vp.fit_bounds(min_x, min_y, max_x, max_y, 1200.0, 800.0);

        for (wx, wy) in [(min_x, min_y), (max_x, max_y)] {
            let (sx, sy) = vp.world_to_screen(wx, wy);
            assert!(sx >= 0.0 && sx <= 1200.0, "x out of view: {sx}");
            assert!(sy >= 0.0 && sy <= 800.0, "y out of view: {sy}");
        }
    }

    #[test]
    fn fit_bounds_centers_a_single_point() {
        let mut vp = Viewport::default();
        let (wx, wy) = world_of(-118.25, 34.05);
        vp.fit_bounds(wx, wy, wx, wy, 1200.0, 800.0);
        let (sx, sy) = vp.world_to_screen(wx, wy);
        assert_close(sx, 600.0);
        assert_close(sy, 400.0);
    }

    #[test]
    fn pan_shifts_by_screen_delta() {
        let mut vp = Viewport::default();
        let before = vp.world_to_screen(1.0, 1.0);
        vp.pan(25.0, -10.0);
        let after = vp.world_to_screen(1.0, 1.0);
        assert_close(after.0 - before.0, 25.0);
        assert_close(after.1 - before.1, -10.0);
    }
}
