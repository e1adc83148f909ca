//! Tests for landmark sampling of Gabor responses


use face_affect::constants::landmarks::{LEFT_EYE, RIGHT_EYE};
use face_affect::face::{Face, Point, Region};
use face_affect::features::{extract, extract_subset, feature_column, feature_columns};
use face_affect::gabor::{GaborBank, ResponseMap};
use face_affect::Error;
use ndarray::Array2;
use test_helpers::{synthetic_face, textured_frame};

/// Map `k` holds `k * 1_000_000 + row * 1000 + col` at every pixel
fn coded_maps(count: usize, height: usize, width: usize) -> Vec<ResponseMap> {
    (0..count)
        .map(|k| Array2::from_shape_fn((height, width), |(r, c)| (k * 1_000_000 + r * 1000 + c) as f32))
        .collect()
}

#[test]
fn test_kernel_major_order() {
    let face = synthetic_face(60, 50, true, 120, 100).unwrap();
    let maps = coded_maps(3, 100, 120);
    let features = extract(&face, &maps).unwrap();

    assert_eq!(features.len(), 3 * 68);
    for k in 0..3 {
        for (i, p) in face.landmarks().iter().enumerate() {
            let expected = (k * 1_000_000) as f64 + f64::from(p.y) * 1000.0 + f64::from(p.x);
            assert_eq!(features[k * 68 + i], expected, "kernel {k} landmark {i}");
        }
    }
}

#[test]
fn test_column_names_follow_vector_order() {
    assert_eq!(feature_column(0), "resp.0000");
    assert_eq!(feature_column(2175), "resp.2175");
    let columns = feature_columns(3 * 68);
    assert_eq!(columns.len(), 204);
    assert_eq!(columns[68], "resp.0068");
}

#[test]
fn test_subset_keeps_requested_order() {
    let face = synthetic_face(60, 50, true, 120, 100).unwrap();
    let maps = coded_maps(2, 100, 120);
    let eyes: Vec<usize> = RIGHT_EYE.chain(LEFT_EYE).collect();
    let features = extract_subset(&face, &maps, &eyes).unwrap();

    assert_eq!(features.len(), 2 * eyes.len());
    let full = extract(&face, &maps).unwrap();
    for k in 0..2 {
        for (j, &i) in eyes.iter().enumerate() {
            assert_eq!(features[k * eyes.len() + j], full[k * 68 + i]);
        }
    }
    assert!(matches!(
        extract_subset(&face, &maps, &[68]),
        Err(Error::InvalidInput(_))
    ));
}

#[test]
fn test_landmark_outside_maps_is_rejected() {
    // Landmarks near the right edge of a 120 px frame, maps only 100 px wide
    let face = synthetic_face(90, 50, true, 130, 100).unwrap();
    let maps = coded_maps(1, 100, 100);

    match extract(&face, &maps) {
        Err(Error::LandmarkOutOfBounds { width, height, x, .. }) => {
            assert_eq!((width, height), (100, 100));
            assert!(x >= 100);
        }
        other => panic!("expected LandmarkOutOfBounds, got {other:?}"),
    }
}

#[test]
fn test_negative_landmark_is_rejected() {
    let mut landmarks: Vec<Point> = (0..68).map(|i| Point::new(5 + i % 10, 5 + i / 10)).collect();
    landmarks[0] = Point::new(-3, 5);
    let face = Face::new(Region::new(0, 0, 20, 20), landmarks).unwrap();

    assert!(matches!(
        extract(&face, &coded_maps(1, 30, 30)),
        Err(Error::LandmarkOutOfBounds { index: 0, .. })
    ));
}

#[test]
fn test_mismatched_maps_are_rejected() {
    let face = synthetic_face(40, 40, true, 100, 100).unwrap();
    let mut maps = coded_maps(2, 100, 100);
    maps[1] = Array2::zeros((99, 100));

    assert!(matches!(extract(&face, &maps), Err(Error::InvalidInput(_))));
    assert!(matches!(extract(&face, &[]), Err(Error::InvalidInput(_))));
}

#[test]
fn test_crop_then_extract() {
    let image = textured_frame(160, 120, 5);
    let face = synthetic_face(80, 60, true, 160, 120).unwrap();
    let bank = GaborBank::new(&[4.0], &[0.0, std::f64::consts::FRAC_PI_2]).unwrap();

    let (crop, local) = face.crop(&image).unwrap();
    let responses = bank.filter(&crop).unwrap();
    let features = extract(&local, &responses).unwrap();

    assert_eq!(features.len(), 2 * 68);
    assert!(features.iter().all(|v| v.is_finite() && *v >= 0.0));

    // Deterministic for the same input
    assert_eq!(extract(&local, &bank.filter(&crop).unwrap()).unwrap(), features);
}
