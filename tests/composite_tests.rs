use image::{Rgb, RgbImage};
use spotlight::events::{Flow, InputEvent, Key, PointerButton};
use spotlight::input::{InputQueue, apply};
use spotlight::processing::composite::{Quadrant, composite};
use spotlight::source::SourceImage;
use spotlight::state::{Channel, EditState};

fn gray_source(w: u32, h: u32, v: u8) -> SourceImage {
    SourceImage::from_rgb(RgbImage::from_pixel(w, h, Rgb([v, v, v])))
}

fn inside(x: u32, y: u32, c: (i32, i32), r: i32) -> bool {
    let dx = i64::from(x) - i64::from(c.0);
    let dy = i64::from(y) - i64::from(c.1);
    dx * dx + dy * dy <= i64::from(r) * i64::from(r)
}

#[test]
fn gray_lightness_spotlight() {
    let source = gray_source(100, 100, 128);
    let mut state = EditState::new(100);
    state.channel_values.lightness = 200;
    state.mask_center = (50, 50);
    state.mask_radius = 20;
    state.normalize();

    let frame = composite(&source, &state);
    let edited = frame.quadrant(Quadrant::Edited);
    for (x, y, px) in edited.enumerate_pixels() {
        if inside(x, y, (50, 50), 20) {
            assert_eq!(px, &Rgb([200, 200, 200]), "inside at ({x}, {y})");
        } else {
            assert_eq!(px, &Rgb([128, 128, 128]), "outside at ({x}, {y})");
        }
    }
}

#[test]
fn canvas_is_two_by_two_tiles() {
    let source = SourceImage::from_rgb(RgbImage::from_fn(30, 20, |x, y| {
        Rgb([(x * 8) as u8, (y * 12) as u8, 90])
    }));
    let mut state = EditState::new(30);
    state.normalize();
    let frame = composite(&source, &state);
    assert_eq!(frame.dimensions(), (60, 40));
    assert_eq!(frame.tile_dimensions(), (30, 20));
    assert_eq!(&frame.quadrant(Quadrant::Original), source.pixels());
    assert_eq!(frame.to_rgba8().dimensions(), (60, 40));

    // Gray previews: equal channels in every pixel.
    for q in [Quadrant::Lightness, Quadrant::Saturation] {
        for px in frame.quadrant(q).pixels() {
            assert!(px.0[0] == px.0[1] && px.0[1] == px.0[2], "{q:?}: {px:?}");
        }
    }
}

#[test]
fn full_cover_sets_plane_everywhere() {
    let source = gray_source(24, 16, 90);
    let mut state = EditState::new(24);
    state.channel_values.lightness = 255;
    state.mask_center = (12, 8);
    state.mask_radius = 1000;
    state.normalize();
    let frame = composite(&source, &state);
    for px in frame.quadrant(Quadrant::Edited).pixels() {
        assert_eq!(px, &Rgb([255, 255, 255]));
    }
}

#[test]
fn saturation_edit_keeps_gray_gray_when_zeroed() {
    let source = SourceImage::from_rgb(RgbImage::from_pixel(20, 20, Rgb([200, 60, 60])));
    let mut state = EditState::new(20);
    assert!(state.select(Channel::Saturation));
    state.channel_values.saturation = 0;
    state.mask_center = (10, 10);
    state.mask_radius = 100;
    state.normalize();
    let frame = composite(&source, &state);
    for px in frame.quadrant(Quadrant::Edited).pixels() {
        assert!(px.0[0].abs_diff(px.0[1]) <= 1 && px.0[1].abs_diff(px.0[2]) <= 1, "{px:?}");
    }
}

#[test]
fn illumination_raises_brightness_inside_only() {
    let source = gray_source(40, 40, 60);
    let mut state = EditState::new(40);
    assert!(state.select(Channel::Illumination));
    state.channel_values.illumination = 230;
    state.mask_center = (5, 5);
    state.mask_radius = 10;
    state.normalize();
    let edited = composite(&source, &state).quadrant(Quadrant::Edited);
    assert!(edited.get_pixel(5, 5).0[0] > 60);
    let far = edited.get_pixel(35, 35);
    for c in far.0 {
        assert!(c.abs_diff(60) <= 1, "{far:?}");
    }
}

#[test]
fn events_drive_the_next_frame() {
    let source = gray_source(50, 50, 128);
    let mut state = EditState::new(50);
    state.channel_values.lightness = 0;
    let mut queue = InputQueue::new();
    queue.push(InputEvent::PointerMoved { x: 1, y: 1 });
    queue.push(InputEvent::PointerMoved { x: 25, y: 25 });
    queue.push(InputEvent::PointerPressed(PointerButton::Primary));
    queue.push(InputEvent::KeyPressed(Key::Escape));

    let mut flow = Flow::Continue;
    while let Some(event) = queue.pop() {
        state.normalize();
        flow = apply(&mut state, event);
    }
    assert_eq!(flow, Flow::Quit);
    assert_eq!(state.mask_center, (25, 25));
    assert_eq!(state.mask_radius, 20);

    state.normalize();
    let edited = composite(&source, &state).quadrant(Quadrant::Edited);
    assert_eq!(edited.get_pixel(25, 25), &Rgb([0, 0, 0]));
    assert_eq!(edited.get_pixel(25, 45), &Rgb([0, 0, 0]));
    assert_eq!(edited.get_pixel(0, 0), &Rgb([128, 128, 128]));
}
