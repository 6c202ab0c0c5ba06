use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use keypoints::HandObservation;

/// Landmark index pairs forming the hand skeleton (wrist = 0, fingertips = 4, 8, 12, 16, 20).
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    (0, 1), (1, 2), (2, 3), (3, 4),
    (0, 5), (5, 6), (6, 7), (7, 8),
    (5, 9), (9, 10), (10, 11), (11, 12),
    (9, 13), (13, 14), (14, 15), (15, 16),
    (13, 17), (0, 17), (17, 18), (18, 19), (19, 20),
];

/// Colours and sizes used when drawing landmarks onto a frame.
#[derive(Debug, Clone, Copy)]
pub struct OverlayStyle {
    pub landmark_color: Rgb<u8>,
    pub connection_color: Rgb<u8>,
    pub landmark_radius: i32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            landmark_color: Rgb([255, 0, 0]),
            connection_color: Rgb([0, 255, 0]),
            landmark_radius: 2,
        }
    }
}

fn to_pixel(point: [f64; 3], width: u32, height: u32) -> (f32, f32) {
    (
        (point[0] * width as f64) as f32,
        (point[1] * height as f64) as f32,
    )
}

/// Draw one hand's skeleton and landmarks onto `frame` in place.
///
/// Points use normalized image coordinates; anything outside the frame is clipped.
pub fn draw_landmarks(frame: &mut RgbImage, hand: &HandObservation, style: &OverlayStyle) {
    let (width, height) = frame.dimensions();

    for &(from, to) in &HAND_CONNECTIONS {
        let start = to_pixel(hand.points[from], width, height);
        let end = to_pixel(hand.points[to], width, height);
        draw_line_segment_mut(frame, start, end, style.connection_color);
    }

    for &point in &hand.points {
        let (x, y) = to_pixel(point, width, height);
        draw_filled_circle_mut(
            frame,
            (x.round() as i32, y.round() as i32),
            style.landmark_radius,
            style.landmark_color,
        );
    }
}

/// Draw every hand in `hands`.
pub fn annotate(frame: &mut RgbImage, hands: &[HandObservation], style: &OverlayStyle) {
    for hand in hands {
        draw_landmarks(frame, hand, style);
    }
}
