//! Tests for BoundingBox operations.

use stac_common::bbox::BoundingBox;

// ============================================================================
// Constructor tests
// ============================================================================

#[test]
fn test_bbox_new() {
    let bbox = BoundingBox::new(-180.0, -90.0, 180.0, 90.0);
    assert_eq!(bbox.min_x, -180.0);
    assert_eq!(bbox.min_y, -90.0);
    assert_eq!(bbox.max_x, 180.0);
    assert_eq!(bbox.max_y, 90.0);
}

#[test]
fn test_bbox_array_roundtrip() {
    let bbox = BoundingBox::from_array([10.5, -20.0, 30.25, 5.0]);
    assert_eq!(bbox.to_array(), [10.5, -20.0, 30.25, 5.0]);
}

#[test]
fn test_bbox_serialization() {
    let bbox = BoundingBox::new(0.0, 1.0, 2.0, 3.0);
    let json = serde_json::to_string(&bbox).unwrap();
    assert!(json.contains("\"min_x\":0.0"));
    assert!(json.contains("\"max_y\":3.0"));
}

// ============================================================================
// Union / extension tests
// ============================================================================

#[test]
fn test_union_is_symmetric() {
    let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BoundingBox::new(-5.0, 2.0, 3.0, 20.0);
    assert_eq!(a.union(&b), b.union(&a));
}

#[test]
fn test_union_with_contained_box_is_identity() {
    let outer = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
    let inner = BoundingBox::new(25.0, 25.0, 75.0, 75.0);
    assert_eq!(outer.union(&inner), outer);
}

#[test]
fn test_extend_point_outside() {
    let mut bbox = BoundingBox::from_point(1.0, 1.0);
    bbox.extend_point(-2.0, 4.0);
    assert_eq!(bbox, BoundingBox::new(-2.0, 1.0, 1.0, 4.0));
}

#[test]
fn test_contains_edges() {
    let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    assert!(a.contains(&a));
    assert!(a.contains(&BoundingBox::from_point(10.0, 0.0)));
    assert!(!a.contains(&BoundingBox::new(0.0, 0.0, 10.1, 10.0)));
}
