use spotlight::processing::layout::{
    LetterboxRect, fold_into_image, letterbox, ndc_scale, resize_to_contain, window_to_canvas,
};

fn rect_close(a: LetterboxRect, b: (f32, f32, f32, f32), eps: f32) {
    assert!((a.x - b.0).abs() <= eps, "x mismatch: {:?} vs {:?}", a, b);
    assert!((a.y - b.1).abs() <= eps, "y mismatch: {:?} vs {:?}", a, b);
    assert!((a.w - b.2).abs() <= eps, "w mismatch: {:?} vs {:?}", a, b);
    assert!((a.h - b.3).abs() <= eps, "h mismatch: {:?} vs {:?}", a, b);
}

#[test]
fn canvas_fills_matching_window() {
    let rect = letterbox(1600, 1000, 1600, 1000);
    rect_close(rect, (0.0, 0.0, 1600.0, 1000.0), 0.001);
    assert_eq!(ndc_scale(&rect, 1600, 1000), [1.0, 1.0, 0.0, 0.0]);
}

#[test]
fn letterbox_wide_canvas_in_square_window() {
    // 1600x1000 canvas in 800x800: scale 0.5 -> 800x500, y = 150
    let rect = letterbox(1600, 1000, 800, 800);
    rect_close(rect, (0.0, 150.0, 800.0, 500.0), 0.001);
    let s = ndc_scale(&rect, 800, 800);
    assert!((s[0] - 1.0).abs() < 1e-6);
    assert!((s[1] - 0.625).abs() < 1e-6);
}

#[test]
fn pillarbox_tall_window() {
    // 1000x1000 canvas on 1920x1080: 1080x1080, x = 420
    let rect = letterbox(1000, 1000, 1920, 1080);
    rect_close(rect, (420.0, 0.0, 1080.0, 1080.0), 0.001);
}

#[test]
fn contain_preserves_aspect() {
    let (w, h) = resize_to_contain(1920, 1080, 4000, 2000);
    assert!((w - 1920.0).abs() < 0.001);
    assert!((h - 960.0).abs() < 0.001);
}

#[test]
fn window_maps_back_to_canvas() {
    let rect = letterbox(1600, 1000, 800, 800);
    assert_eq!(window_to_canvas(&rect, 1600, 1000, (0.0, 150.0)), (0, 0));
    assert_eq!(window_to_canvas(&rect, 1600, 1000, (400.0, 400.0)), (800, 500));
    assert_eq!(window_to_canvas(&rect, 1600, 1000, (799.9, 649.9)), (1599, 999));
    // Above the letterbox lands above the canvas.
    let (_, y) = window_to_canvas(&rect, 1600, 1000, (10.0, 10.0));
    assert!(y < 0);
}

#[test]
fn quadrants_fold_onto_the_image() {
    // 800x500 image, 1600x1000 canvas
    assert_eq!(fold_into_image((10, 20), 800, 500), (10, 20));
    assert_eq!(fold_into_image((810, 20), 800, 500), (10, 20));
    assert_eq!(fold_into_image((10, 520), 800, 500), (10, 20));
    assert_eq!(fold_into_image((810, 520), 800, 500), (10, 20));
    assert_eq!(fold_into_image((-5, -5), 800, 500), (-5, -5));
}
