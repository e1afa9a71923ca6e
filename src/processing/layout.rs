//! Placement of the composite canvas inside the window and the inverse
//! mapping from window pixels back to image coordinates.

/// Aspect-preserving, centered rectangle (window pixels).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

pub fn resize_to_contain(canvas_w: u32, canvas_h: u32, src_w: u32, src_h: u32) -> (f32, f32) {
    let iw = src_w.max(1) as f32;
    let ih = src_h.max(1) as f32;
    let cw = canvas_w.max(1) as f32;
    let ch = canvas_h.max(1) as f32;
    let scale = (cw / iw).min(ch / ih).max(0.0);
    let scale = if scale.is_finite() { scale } else { 1.0 };
    (iw * scale, ih * scale)
}

/// Where a `canvas_w × canvas_h` canvas lands in a `win_w × win_h` window.
pub fn letterbox(canvas_w: u32, canvas_h: u32, win_w: u32, win_h: u32) -> LetterboxRect {
    let (w, h) = resize_to_contain(win_w, win_h, canvas_w, canvas_h);
    LetterboxRect {
        x: (win_w.max(1) as f32 - w) * 0.5,
        y: (win_h.max(1) as f32 - h) * 0.5,
        w,
        h,
    }
}

/// Scale applied to a full-screen quad (NDC) so it covers `rect`.
pub fn ndc_scale(rect: &LetterboxRect, win_w: u32, win_h: u32) -> [f32; 4] {
    let ww = win_w.max(1) as f32;
    let wh = win_h.max(1) as f32;
    [rect.w / ww, rect.h / wh, 0.0, 0.0]
}

/// Map a window position to canvas pixel coordinates. Positions outside the
/// letterbox map to coordinates outside the canvas.
pub fn window_to_canvas(
    rect: &LetterboxRect,
    canvas_w: u32,
    canvas_h: u32,
    pos: (f64, f64),
) -> (i32, i32) {
    let sx = f64::from(canvas_w) / f64::from(rect.w.max(f32::EPSILON));
    let sy = f64::from(canvas_h) / f64::from(rect.h.max(f32::EPSILON));
    let cx = (pos.0 - f64::from(rect.x)) * sx;
    let cy = (pos.1 - f64::from(rect.y)) * sy;
    (cx.floor() as i32, cy.floor() as i32)
}

/// Fold a canvas position into the image coordinates of whichever quadrant
/// it falls in, so the spotlight tracks the pointer over all four views.
pub fn fold_into_image(canvas: (i32, i32), image_w: u32, image_h: u32) -> (i32, i32) {
    let w = image_w as i32;
    let h = image_h as i32;
    let x = if canvas.0 >= w { canvas.0 - w } else { canvas.0 };
    let y = if canvas.1 >= h { canvas.1 - h } else { canvas.1 };
    (x, y)
}
