use kurbo::Rect;

/// Output aspect ratio is locked to 16:9 regardless of the host container.
pub const TARGET_ASPECT: f64 = 16.0 / 9.0;

/// The render rectangle inside a host container: position of the top-left
/// corner plus surface dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewportRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ViewportRect {
    pub fn rect(self) -> Rect {
        Rect::new(
            f64::from(self.x),
            f64::from(self.y),
            f64::from(self.x + self.width),
            f64::from(self.y + self.height),
        )
    }

    pub fn aspect(self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }
}

/// Largest 16:9 rectangle that fits the container, centered inside it.
/// Taller/narrower containers letterbox, wider ones pillarbox. Degenerate
/// containers clamp to a 1x1 surface rather than producing an invalid
/// render target.
pub fn fit_viewport(container_w: u32, container_h: u32) -> ViewportRect {
    let w = f64::from(container_w.max(1));
    let h = f64::from(container_h.max(1));

    let (rw, rh) = if w / h > TARGET_ASPECT {
        (h * TARGET_ASPECT, h)
    } else {
        (w, w / TARGET_ASPECT)
    };

    let width = (rw.floor() as u32).max(1);
    let height = (rh.floor() as u32).max(1);
    let x = (container_w.saturating_sub(width)) / 2;
    let y = (container_h.saturating_sub(height)) / 2;

    ViewportRect {
        x,
        y,
        width,
        height,
    }
}
