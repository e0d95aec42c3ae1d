//! End-to-end recognition over the synthetic tabletop scene.
//!
//! Table at z = 0, sphere (⌀0.1 m) at (0.3, 0, 0.1), cube (0.1 m) at
//! (−0.3, 0, 0.1), seen by a camera 1 m above the table looking down.

mod common;

use approx::assert_relative_eq;
use common::Harness;

use akriti::{
    CycleError, GetObjectsRequest, ObjectInfo, SetActiveRequest, ShapeLabel, TransformError,
    io::ObjectSpec,
};

fn find(objects: &[ObjectInfo], label: ShapeLabel) -> Vec<&ObjectInfo> {
    objects.iter().filter(|o| o.shape_label == label).collect()
}

fn assert_scene(objects: &[ObjectInfo]) {
    assert_eq!(objects.len(), 2, "{:?}", objects);

    let spheres = find(objects, ShapeLabel::Sphere);
    assert_eq!(spheres.len(), 1);
    assert_relative_eq!(spheres[0].position[0], 0.3, epsilon = 0.01);
    assert_relative_eq!(spheres[0].position[1], 0.0, epsilon = 0.01);
    assert_relative_eq!(spheres[0].position[2], 0.1, epsilon = 0.01);

    let cubes = find(objects, ShapeLabel::Cube);
    assert_eq!(cubes.len(), 1);
    assert_relative_eq!(cubes[0].position[0], -0.3, epsilon = 0.01);
    assert_relative_eq!(cubes[0].position[1], 0.0, epsilon = 0.01);
    assert_relative_eq!(cubes[0].position[2], 0.1, epsilon = 0.01);

    assert!(objects.iter().all(|o| o.frame_id == "base_link"));
}

#[test]
fn test_one_cycle_finds_sphere_and_cube() {
    let h = Harness::new();
    h.publish_transform();
    h.publish_frame();

    let report = h.module.spin_once().expect("cycle ran").expect("cycle ok");
    assert_eq!(report.inserted, 2);
    assert_eq!(report.merged, 0);

    let response = h.module.get_objects(GetObjectsRequest::default());
    assert_scene(&response.objects);
}

#[test]
fn test_repeated_cycle_does_not_duplicate() {
    let h = Harness::new();
    for _ in 0..3 {
        h.publish_transform();
        h.publish_frame();
        h.module.spin_once().expect("cycle ran").expect("cycle ok");
        h.advance_ms(100);
    }

    let response = h.module.get_objects(GetObjectsRequest::default());
    assert_scene(&response.objects);

    let registry = h.module.objects(None);
    assert!(registry.iter().all(|o| o.observations == 3));
}

#[test]
fn test_disable_clears_and_reenable_repopulates() {
    let h = Harness::new();
    h.publish_transform();
    h.publish_frame();
    h.module.spin_once().expect("cycle ran").expect("cycle ok");
    assert_eq!(h.module.get_objects(GetObjectsRequest::default()).len(), 2);

    assert!(h.module.set_active(SetActiveRequest { active: false }).success);
    assert!(h.module.get_objects(GetObjectsRequest::default()).is_empty());

    // Samples while disabled never trigger a cycle
    h.publish_frame();
    assert!(h.module.spin_once().is_none());
    assert!(h.module.get_objects(GetObjectsRequest::default()).is_empty());

    assert!(h.module.set_active(SetActiveRequest { active: true }).success);
    assert!(h.module.spin_once().is_none());

    h.advance_ms(100);
    h.publish_transform();
    h.publish_frame();
    let report = h.module.spin_once().expect("cycle ran").expect("cycle ok");
    assert_eq!(report.inserted, 2);
    assert_scene(&h.module.get_objects(GetObjectsRequest::default()).objects);
}

#[test]
fn test_missing_transform_aborts_cycle() {
    let h = Harness::new();
    h.publish_frame();

    let result = h.module.spin_once().expect("cycle ran");
    assert!(matches!(
        result,
        Err(CycleError::Transform(TransformError::Unavailable { .. }))
    ));
    assert!(h.module.get_objects(GetObjectsRequest::default()).is_empty());

    // Self-healing: next trigger with a transform succeeds
    h.publish_transform();
    h.publish_frame();
    assert!(h.module.spin_once().expect("cycle ran").is_ok());
    assert_eq!(h.module.get_objects(GetObjectsRequest::default()).len(), 2);
}

#[test]
fn test_stale_transform_aborts_cycle() {
    let h = Harness::new();
    h.publish_transform();
    h.advance_ms(2_000);
    h.publish_frame();

    let result = h.module.spin_once().expect("cycle ran");
    assert!(matches!(
        result,
        Err(CycleError::Transform(TransformError::Stale { .. }))
    ));
    assert!(h.module.get_objects(GetObjectsRequest::default()).is_empty());
}

#[test]
fn test_query_by_label() {
    let h = Harness::new();
    h.publish_transform();
    h.publish_frame();
    h.module.spin_once().expect("cycle ran").expect("cycle ok");

    let cubes = h.module.get_objects(GetObjectsRequest {
        label: Some(ShapeLabel::Cube),
    });
    assert_eq!(cubes.len(), 1);
    assert_eq!(cubes.objects[0].shape_label, ShapeLabel::Cube);

    let cylinders = h.module.get_objects(GetObjectsRequest {
        label: Some(ShapeLabel::Cylinder),
    });
    assert!(cylinders.is_empty());
}

#[test]
fn test_cylinder_recognized() {
    let mut h = Harness::new();
    h.scene
        .objects
        .push(ObjectSpec::cylinder([0.0, 0.2, 0.15], 0.08, 0.2));
    h.publish_transform();
    h.publish_frame();

    let report = h.module.spin_once().expect("cycle ran").expect("cycle ok");
    assert_eq!(report.inserted, 3);

    let response = h.module.get_objects(GetObjectsRequest {
        label: Some(ShapeLabel::Cylinder),
    });
    assert_eq!(response.len(), 1);
    let cylinder = &response.objects[0];
    assert_relative_eq!(cylinder.position[1], 0.2, epsilon = 0.01);
    assert_relative_eq!(cylinder.position[2], 0.15, epsilon = 0.01);

    // Long axis is the table normal
    let mut extent = cylinder.extent;
    extent.sort_by(f32::total_cmp);
    assert_relative_eq!(extent[2], 0.2, epsilon = 0.02);
}

#[test]
fn test_noisy_scene_finds_sphere_and_cube() {
    let mut h = Harness::new();
    h.scene.noise_std = 0.001;
    h.scene.seed = 7;
    h.publish_transform();
    h.publish_frame();

    let report = h.module.spin_once().expect("cycle ran").expect("cycle ok");
    assert_eq!(report.unclassified, 0, "{:?}", report);
    assert_scene(&h.module.get_objects(GetObjectsRequest::default()).objects);
}

#[test]
fn test_camera_facing_scene_with_yawed_cube() {
    let mut h = Harness::new();
    h.scene.noise_std = 0.001;
    h.scene.seed = 7;
    h.scene.visible_only = true;
    h.scene.objects[1] = h.scene.objects[1].with_yaw(0.4);
    h.publish_transform();
    h.publish_frame();

    let report = h.module.spin_once().expect("cycle ran").expect("cycle ok");
    assert_eq!(report.inserted, 2, "{:?}", report);

    let objects = h.module.get_objects(GetObjectsRequest::default()).objects;
    let spheres = find(&objects, ShapeLabel::Sphere);
    assert_eq!(spheres.len(), 1, "{:?}", objects);
    assert_relative_eq!(spheres[0].position[0], 0.3, epsilon = 0.015);
    assert_relative_eq!(spheres[0].position[1], 0.0, epsilon = 0.015);

    let cubes = find(&objects, ShapeLabel::Cube);
    assert_eq!(cubes.len(), 1, "{:?}", objects);
    assert_relative_eq!(cubes[0].position[0], -0.3, epsilon = 0.015);
    assert_relative_eq!(cubes[0].position[1], 0.0, epsilon = 0.015);
}
