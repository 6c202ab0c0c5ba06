use keypoints::{KeypointsDataset, NormalizedDataset, VideoKeypoints};
use tracing::info;

/// Per-axis `(min, max)` over every point of every observation in a video.
///
/// `None` when the video holds no observation at all.
pub fn axis_bounds(video: &VideoKeypoints) -> Option<[(f64, f64); 3]> {
    let mut points = video.observations().flat_map(|hand| hand.points.iter());
    let first = points.next()?;

    let mut bounds = [(first[0], first[0]), (first[1], first[1]), (first[2], first[2])];
    for point in points {
        for (axis, (min, max)) in bounds.iter_mut().enumerate() {
            *min = min.min(point[axis]);
            *max = max.max(point[axis]);
        }
    }
    Some(bounds)
}

/// Min-max rescale one video into `[0, 1]`, independently per axis.
///
/// Bounds are taken over the whole video, not the dataset. An axis whose
/// values are all equal maps to 0. Handedness labels pass through unchanged.
pub fn normalize_video(video: &VideoKeypoints) -> VideoKeypoints {
    let mut normalized = video.clone();
    let Some(bounds) = axis_bounds(video) else {
        return normalized;
    };

    for hand in normalized.observations_mut() {
        for point in hand.points.iter_mut() {
            for (axis, &(min, max)) in bounds.iter().enumerate() {
                let range = max - min;
                point[axis] = if range > 0.0 {
                    (point[axis] - min) / range
                } else {
                    0.0
                };
            }
        }
    }
    normalized
}

/// Normalize every video of a dataset.
pub fn normalize_dataset(dataset: &KeypointsDataset) -> NormalizedDataset {
    let normalized = dataset.map(normalize_video);
    info!("Normalized {} video(s)", normalized.label_count());
    normalized
}
