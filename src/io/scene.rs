//! Synthetic tabletop scenes.
//!
//! A [`SceneDescription`] lists a table plane and primitive objects. Sampling
//! yields surface points with optional Gaussian noise. By default every
//! closed surface is sampled whole; with `visible_only` set, only points whose
//! outward normal faces the sensor are kept, as a depth sensor would see them.
//! Occlusion between objects is not modeled. Used by the replay thread,
//! integration tests and benchmarks.
//!
//! ```toml
//! frame = "base_link"
//! spacing = 0.01
//! noise_std = 0.001
//! seed = 7
//! visible_only = true
//!
//! [table]
//! center = [0.0, 0.0, 0.0]
//! size = [1.0, 0.6]
//!
//! [sensor]
//! frame = "camera_depth_optical_frame"
//! position = [0.0, 0.0, 1.0]
//! rpy = [3.14159265, 0.0, 0.0]
//!
//! [[objects]]
//! shape = "sphere"
//! center = [0.3, 0.0, 0.1]
//! size = [0.1, 0.1, 0.1]
//! ```

use std::f32::consts::{PI, TAU};
use std::path::Path;

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::classification::ShapeLabel;
use crate::config::{ConfigError, ensure_finite, ensure_positive};
use crate::core::{FrameId, Point3D, PointCloud};

/// Rectangular table top (horizontal).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    /// Center of the top surface.
    pub center: [f32; 3],
    /// Size along x and y (meters).
    pub size: [f32; 2],
}

impl Default for TableSpec {
    fn default() -> Self {
        Self {
            center: [0.0, 0.0, 0.0],
            size: [1.0, 0.6],
        }
    }
}

/// One primitive on the table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectSpec {
    /// Shape family.
    pub shape: ShapeLabel,
    /// Center (meters).
    pub center: [f32; 3],
    /// Full size along x, y, z before yaw. Spheres use `size[0]` as the
    /// diameter; cylinders use `size[0]` as the diameter and `size[2]` as the
    /// height.
    pub size: [f32; 3],
    /// Rotation about z (radians).
    #[serde(default)]
    pub yaw: f32,
}

impl ObjectSpec {
    /// Sphere of diameter `diameter`.
    pub fn sphere(center: [f32; 3], diameter: f32) -> Self {
        Self {
            shape: ShapeLabel::Sphere,
            center,
            size: [diameter; 3],
            yaw: 0.0,
        }
    }

    /// Axis-aligned cube of side `side`.
    pub fn cube(center: [f32; 3], side: f32) -> Self {
        Self {
            shape: ShapeLabel::Cube,
            center,
            size: [side; 3],
            yaw: 0.0,
        }
    }

    /// Upright cylinder.
    pub fn cylinder(center: [f32; 3], diameter: f32, height: f32) -> Self {
        Self {
            shape: ShapeLabel::Cylinder,
            center,
            size: [diameter, diameter, height],
            yaw: 0.0,
        }
    }

    /// Same object rotated about z.
    pub fn with_yaw(mut self, yaw: f32) -> Self {
        self.yaw = yaw;
        self
    }
}

/// Pose of the depth sensor in the scene frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorMount {
    /// Sensor frame name.
    pub frame: FrameId,
    /// Sensor origin in the scene frame.
    pub position: [f32; 3],
    /// Roll, pitch, yaw (radians).
    pub rpy: [f32; 3],
}

impl Default for SensorMount {
    fn default() -> Self {
        // 1 m above the table, optical axis pointing down
        Self {
            frame: FrameId::new("camera_depth_optical_frame"),
            position: [0.0, 0.0, 1.0],
            rpy: [PI, 0.0, 0.0],
        }
    }
}

impl SensorMount {
    /// `scene_T_sensor`.
    pub fn transform(&self) -> Isometry3<f32> {
        let [x, y, z] = self.position;
        let [roll, pitch, yaw] = self.rpy;
        Isometry3::from_parts(
            Translation3::new(x, y, z),
            UnitQuaternion::from_euler_angles(roll, pitch, yaw),
        )
    }
}

fn default_spacing() -> f32 {
    0.01
}

/// A synthetic tabletop scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDescription {
    /// Frame the scene geometry is described in.
    #[serde(default = "default_frame")]
    pub frame: FrameId,
    /// Surface sampling distance (meters).
    #[serde(default = "default_spacing")]
    pub spacing: f32,
    /// Per-axis Gaussian noise standard deviation (meters).
    #[serde(default)]
    pub noise_std: f32,
    /// Noise seed; 0 draws from OS entropy.
    #[serde(default)]
    pub seed: u64,
    /// Keep only surface points facing the sensor.
    #[serde(default)]
    pub visible_only: bool,
    /// Table top, if any.
    #[serde(default)]
    pub table: Option<TableSpec>,
    /// Depth sensor pose.
    #[serde(default)]
    pub sensor: SensorMount,
    /// Objects on the table.
    #[serde(default)]
    pub objects: Vec<ObjectSpec>,
}

fn default_frame() -> FrameId {
    FrameId::new("base_link")
}

impl Default for SceneDescription {
    fn default() -> Self {
        Self {
            frame: default_frame(),
            spacing: default_spacing(),
            noise_std: 0.0,
            seed: 0,
            visible_only: false,
            table: None,
            sensor: SensorMount::default(),
            objects: Vec::new(),
        }
    }
}

impl SceneDescription {
    /// Table 1 m × 0.6 m at z = 0 with a sphere (⌀0.1 m) at (0.3, 0, 0.1)
    /// and a cube (0.1 m) at (−0.3, 0, 0.1).
    pub fn tabletop() -> Self {
        Self {
            table: Some(TableSpec::default()),
            objects: vec![
                ObjectSpec::sphere([0.3, 0.0, 0.1], 0.1),
                ObjectSpec::cube([-0.3, 0.0, 0.1], 0.1),
            ],
            ..Self::default()
        }
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let scene: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        scene.validate()?;
        Ok(scene)
    }

    /// Reject degenerate geometry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("scene.spacing", self.spacing)?;
        ensure_finite("scene.noise_std", self.noise_std)?;
        if self.noise_std < 0.0 {
            return Err(ConfigError::invalid("scene.noise_std", "must not be negative"));
        }
        if let Some(table) = &self.table {
            ensure_positive("scene.table.size", table.size[0])?;
            ensure_positive("scene.table.size", table.size[1])?;
        }
        for object in &self.objects {
            for s in object.size {
                ensure_positive("scene.objects.size", s)?;
            }
            ensure_finite("scene.objects.yaw", object.yaw)?;
        }
        Ok(())
    }

    /// Sample the scene surfaces in [`frame`](Self::frame).
    pub fn sample(&self) -> Vec<Point3D> {
        let mut surface = Vec::new();
        if let Some(table) = &self.table {
            sample_table(table, self.spacing, &mut surface);
        }
        for object in &self.objects {
            let start = surface.len();
            match object.shape {
                ShapeLabel::Sphere => {
                    sample_sphere(object.size[0] * 0.5, self.spacing, &mut surface)
                }
                ShapeLabel::Cube => sample_box(&object.size, self.spacing, &mut surface),
                ShapeLabel::Cylinder => sample_cylinder(
                    object.size[0] * 0.5,
                    object.size[2],
                    self.spacing,
                    &mut surface,
                ),
            }
            let pose = Isometry3::from_parts(
                Translation3::new(object.center[0], object.center[1], object.center[2]),
                UnitQuaternion::from_axis_angle(&Vector3::z_axis(), object.yaw),
            );
            for s in &mut surface[start..] {
                s.point = Point3D::from_point3(&(pose * s.point.to_point3()));
                s.normal = pose.rotation * s.normal;
            }
        }

        let eye = Vector3::from(self.sensor.position);
        let mut points: Vec<Point3D> = surface
            .into_iter()
            .filter(|s| !self.visible_only || s.normal.dot(&(eye - s.point.to_vector())) > 0.0)
            .map(|s| s.point)
            .collect();

        if self.noise_std > 0.0 {
            let mut rng = if self.seed == 0 {
                StdRng::from_os_rng()
            } else {
                StdRng::seed_from_u64(self.seed)
            };
            for p in &mut points {
                p.x += rng.sample::<f32, _>(StandardNormal) * self.noise_std;
                p.y += rng.sample::<f32, _>(StandardNormal) * self.noise_std;
                p.z += rng.sample::<f32, _>(StandardNormal) * self.noise_std;
            }
        }
        points
    }

    /// Scene cloud in the scene frame.
    pub fn cloud(&self, stamp_us: u64) -> PointCloud {
        PointCloud::new(self.frame.clone(), stamp_us, self.sample())
    }

    /// Scene cloud as seen by the sensor (in the sensor frame).
    pub fn sensor_cloud(&self, stamp_us: u64) -> PointCloud {
        let sensor_t_scene = self.sensor.transform().inverse();
        self.cloud(stamp_us)
            .transformed(&sensor_t_scene, &self.sensor.frame)
    }
}

/// A sampled surface point with its outward normal.
#[derive(Debug, Clone, Copy)]
struct Surfel {
    point: Point3D,
    normal: Vector3<f32>,
}

impl Surfel {
    fn new(x: f32, y: f32, z: f32, normal: Vector3<f32>) -> Self {
        Self {
            point: Point3D::new(x, y, z),
            normal,
        }
    }
}

fn grid_count(length: f32, spacing: f32) -> usize {
    ((length / spacing).round() as usize).max(1) + 1
}

fn grid_coord(i: usize, n: usize, length: f32) -> f32 {
    -0.5 * length + length * i as f32 / (n - 1) as f32
}

fn sample_table(table: &TableSpec, spacing: f32, out: &mut Vec<Surfel>) {
    let [cx, cy, cz] = table.center;
    let nx = grid_count(table.size[0], spacing);
    let ny = grid_count(table.size[1], spacing);
    for i in 0..nx {
        for j in 0..ny {
            out.push(Surfel::new(
                cx + grid_coord(i, nx, table.size[0]),
                cy + grid_coord(j, ny, table.size[1]),
                cz,
                Vector3::z(),
            ));
        }
    }
}

/// Fibonacci lattice on a sphere centered at the origin.
fn sample_sphere(radius: f32, spacing: f32, out: &mut Vec<Surfel>) {
    let area = 4.0 * PI * radius * radius;
    let n = ((area / (spacing * spacing)).ceil() as usize).max(32);
    let golden = PI * (3.0 - 5.0f32.sqrt());
    for i in 0..n {
        let z = 1.0 - 2.0 * (i as f32 + 0.5) / n as f32;
        let r = (1.0 - z * z).max(0.0).sqrt();
        let theta = golden * i as f32;
        let normal = Vector3::new(r * theta.cos(), r * theta.sin(), z);
        out.push(Surfel::new(
            radius * normal.x,
            radius * normal.y,
            radius * normal.z,
            normal,
        ));
    }
}

/// Six faces of a box centered at the origin.
fn sample_box(size: &[f32; 3], spacing: f32, out: &mut Vec<Surfel>) {
    for axis in 0..3 {
        let (u, v) = ((axis + 1) % 3, (axis + 2) % 3);
        let nu = grid_count(size[u], spacing);
        let nv = grid_count(size[v], spacing);
        for sign in [-0.5f32, 0.5] {
            let mut normal = Vector3::zeros();
            normal[axis] = sign.signum();
            for i in 0..nu {
                for j in 0..nv {
                    let mut c = [0.0f32; 3];
                    c[axis] = sign * size[axis];
                    c[u] = grid_coord(i, nu, size[u]);
                    c[v] = grid_coord(j, nv, size[v]);
                    out.push(Surfel::new(c[0], c[1], c[2], normal));
                }
            }
        }
    }
}

/// Upright cylinder (axis along z) centered at the origin, with caps.
fn sample_cylinder(radius: f32, height: f32, spacing: f32, out: &mut Vec<Surfel>) {
    let around = ((TAU * radius / spacing).round() as usize).max(8);
    let nz = grid_count(height, spacing);
    for k in 0..nz {
        let z = grid_coord(k, nz, height);
        for a in 0..around {
            let theta = TAU * a as f32 / around as f32;
            let (sin, cos) = theta.sin_cos();
            out.push(Surfel::new(
                radius * cos,
                radius * sin,
                z,
                Vector3::new(cos, sin, 0.0),
            ));
        }
    }

    let rings = (radius / spacing).round() as usize;
    for z in [-0.5 * height, 0.5 * height] {
        let normal = Vector3::new(0.0, 0.0, z.signum());
        out.push(Surfel::new(0.0, 0.0, z, normal));
        for ring in 1..rings {
            let r = radius * ring as f32 / rings as f32;
            let n = ((TAU * r / spacing).round() as usize).max(6);
            for a in 0..n {
                let theta = TAU * a as f32 / n as f32;
                out.push(Surfel::new(r * theta.cos(), r * theta.sin(), z, normal));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_tabletop_layout() {
        let scene = SceneDescription::tabletop();
        let cloud = scene.cloud(5);
        assert_eq!(cloud.frame().as_str(), "base_link");
        assert_eq!(cloud.stamp_us(), 5);

        // 101 × 61 table grid plus two objects
        let table = 101 * 61;
        assert!(cloud.len() > table);
        let above: Vec<_> = cloud.iter().filter(|p| p.z > 0.02).collect();
        assert!(above.iter().all(|p| p.z <= 0.15 + 1e-5));
        assert!(above.iter().any(|p| p.x > 0.2));
        assert!(above.iter().any(|p| p.x < -0.2));
    }

    #[test]
    fn test_sphere_points_on_surface() {
        let scene = SceneDescription {
            objects: vec![ObjectSpec::sphere([0.3, 0.0, 0.1], 0.1)],
            ..Default::default()
        };
        let center = Point3D::new(0.3, 0.0, 0.1);
        for p in scene.sample() {
            assert_relative_eq!(p.distance(&center), 0.05, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_cube_points_on_faces() {
        let scene = SceneDescription {
            objects: vec![ObjectSpec::cube([0.0, 0.0, 0.0], 0.1).with_yaw(0.3)],
            ..Default::default()
        };
        let inv = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), -0.3f32);
        for p in scene.sample() {
            let local = inv * p.to_vector();
            let linf = local.x.abs().max(local.y.abs()).max(local.z.abs());
            assert_relative_eq!(linf, 0.05, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_cylinder_points() {
        let scene = SceneDescription {
            objects: vec![ObjectSpec::cylinder([0.0, 0.0, 0.0], 0.08, 0.2)],
            ..Default::default()
        };
        let points = scene.sample();
        for p in &points {
            let r = (p.x * p.x + p.y * p.y).sqrt();
            let on_side = (r - 0.04).abs() < 1e-5;
            let on_cap = (p.z.abs() - 0.1).abs() < 1e-5 && r <= 0.04 + 1e-5;
            assert!(on_side || on_cap, "{:?}", p);
        }
        assert!(points.iter().any(|p| p.z > 0.099 && p.x.abs() < 1e-6));
    }

    #[test]
    fn test_noise_is_seeded() {
        let scene = SceneDescription {
            noise_std: 0.002,
            seed: 11,
            ..SceneDescription::tabletop()
        };
        assert_eq!(scene.sample(), scene.sample());
        let clean = SceneDescription::tabletop().sample();
        assert_ne!(scene.sample(), clean);
    }

    #[test]
    fn test_visible_only_drops_hidden_faces() {
        // Camera straight above: only the top face of an axis-aligned cube
        let scene = SceneDescription {
            visible_only: true,
            objects: vec![ObjectSpec::cube([0.0, 0.0, 0.0], 0.1)],
            ..Default::default()
        };
        let points = scene.sample();
        assert_eq!(points.len(), 11 * 11);
        for p in &points {
            assert_relative_eq!(p.z, 0.05, epsilon = 1e-6);
        }

        let full = SceneDescription {
            visible_only: false,
            ..scene
        };
        assert_eq!(full.sample().len(), 6 * 11 * 11);
    }

    #[test]
    fn test_visible_only_sphere_faces_sensor() {
        let scene = SceneDescription {
            visible_only: true,
            objects: vec![ObjectSpec::sphere([0.3, 0.0, 0.1], 0.1)],
            ..Default::default()
        };
        let center = Vector3::new(0.3, 0.0, 0.1);
        let eye = Vector3::from(scene.sensor.position);
        let points = scene.sample();

        let all = SceneDescription {
            visible_only: false,
            ..scene.clone()
        }
        .sample();
        assert!(points.len() < all.len() * 3 / 5);
        assert!(points.len() > all.len() / 3);
        for p in &points {
            let v = p.to_vector();
            assert!((v - center).dot(&(eye - v)) > 0.0);
        }
    }

    #[test]
    fn test_visible_only_keeps_table() {
        let scene = SceneDescription {
            visible_only: true,
            ..SceneDescription::tabletop()
        };
        let table = scene.sample().iter().filter(|p| p.z.abs() < 1e-6).count();
        assert_eq!(table, 101 * 61);
    }

    #[test]
    fn test_sensor_cloud_round_trip() {
        let scene = SceneDescription::tabletop();
        let sensor = scene.sensor_cloud(0);
        assert_eq!(sensor.frame().as_str(), "camera_depth_optical_frame");

        // Table is 1 m in front of a downward-looking camera
        let back = sensor.transformed(&scene.sensor.transform(), &scene.frame);
        let direct = scene.cloud(0);
        for (a, b) in back.iter().zip(direct.iter()) {
            assert!(a.distance(b) < 1e-5);
        }
        let first = sensor.points()[0];
        assert_relative_eq!(first.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_parse_scene() {
        let scene = SceneDescription::from_toml_str(
            r#"
            spacing = 0.005
            visible_only = true

            [table]
            center = [0.0, 0.0, 0.0]
            size = [0.8, 0.5]

            [[objects]]
            shape = "cylinder"
            center = [0.0, 0.2, 0.1]
            size = [0.06, 0.06, 0.2]
            yaw = 0.5

            [[objects]]
            shape = "box"
            center = [0.0, -0.2, 0.05]
            size = [0.1, 0.1, 0.1]
            "#,
        )
        .unwrap();
        assert_eq!(scene.spacing, 0.005);
        assert!(scene.visible_only);
        assert_eq!(scene.objects[0].shape, ShapeLabel::Cylinder);
        assert_eq!(scene.objects[1].shape, ShapeLabel::Cube);

        let scene = SceneDescription::from_toml_str(
            r#"
            [[objects]]
            shape = "cube"
            center = [0.0, -0.2, 0.05]
            size = [0.1, 0.1, 0.1]
            "#,
        )
        .unwrap();
        assert_eq!(scene.objects.len(), 1);
        assert_eq!(scene.objects[0].yaw, 0.0);
        assert!(!scene.visible_only);
        assert!(scene.table.is_none());
        assert_eq!(scene.spacing, 0.01);
    }

    #[test]
    fn test_invalid_scene() {
        let err = SceneDescription::from_toml_str("spacing = 0.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "scene.spacing", .. }));
    }
}
