//! CPU rasterizer used by [`super::SoftwareHost`] to turn a [`Scene`] into a
//! preview image.

use image::{Rgba, RgbaImage};
use nalgebra::{Matrix4, Perspective3, Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::HostError;
use crate::render::RenderSettings;
use crate::scene::{LightKind, ObjectData, ObjectId, Scene};
use crate::utils::{Colour, DefinedColours};

const AMBIENT: f32 = 0.15;
const NEAR: f32 = 0.01;
const FAR: f32 = 10_000.0;
const MAX_SUPERSAMPLE: u32 = 4;
/// Upper bound on supersampled canvas pixels (colour + depth is 8 bytes each).
const MAX_CANVAS_PIXELS: usize = 1 << 28;

#[derive(Debug, Clone, Copy)]
struct Light {
    kind: LightKind,
    energy: f32,
    /// Direction the light travels in, world space.
    direction: Vector3<f32>,
    position: Point3<f32>,
}

impl Light {
    /// Diffuse contribution on a surface with normal `normal` at `point`.
    fn intensity(&self, normal: &Vector3<f32>, point: &Point3<f32>) -> f32 {
        match self.kind {
            LightKind::Sun => {
                normal.dot(&-self.direction).max(0.0) * (self.energy / 3.0).min(2.0) * 0.7
            }
            LightKind::Area => {
                let to_light = (self.position - point).normalize();
                let emitter = self.direction.dot(&-to_light).max(0.0);
                normal.dot(&to_light).max(0.0) * emitter * (self.energy / 100.0).min(2.0) * 0.35
            }
        }
    }
}

/// Supersampled colour and depth buffers.
struct Canvas {
    width: u32,
    height: u32,
    colour: Vec<Colour>,
    depth: Vec<f32>,
}

impl Canvas {
    /// Callers size the canvas through [`canvas_size`], which bounds `width * height`.
    fn new(width: u32, height: u32, background: Colour) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            colour: vec![background; len],
            depth: vec![f32::INFINITY; len],
        }
    }

    /// Fills a triangle given in screen space (x, y, depth) using barycentric
    /// coordinates, keeping the nearest surface per pixel.
    fn triangle(&mut self, p: [Point3<f32>; 3], colour: Colour) {
        let [p0, p1, p2] = p;
        let area = (p1.x - p0.x) * (p2.y - p0.y) - (p2.x - p0.x) * (p1.y - p0.y);
        if area.abs() < 1e-6 {
            return;
        }

        let min_x = p0.x.min(p1.x).min(p2.x).floor().max(0.0) as i64;
        let max_x = (p0.x.max(p1.x).max(p2.x).ceil() as i64).min(self.width as i64 - 1);
        let min_y = p0.y.min(p1.y).min(p2.y).floor().max(0.0) as i64;
        let max_y = (p0.y.max(p1.y).max(p2.y).ceil() as i64).min(self.height as i64 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
                let w0 = ((p1.x - px) * (p2.y - py) - (p2.x - px) * (p1.y - py)) / area;
                let w1 = ((p2.x - px) * (p0.y - py) - (p0.x - px) * (p2.y - py)) / area;
                let w2 = ((p0.x - px) * (p1.y - py) - (p1.x - px) * (p0.y - py)) / area;

                // Check if point is inside triangle
                if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                    let z = w0 * p0.z + w1 * p1.z + w2 * p2.z;
                    let idx = y as usize * self.width as usize + x as usize;
                    if z < self.depth[idx] {
                        self.depth[idx] = z;
                        self.colour[idx] = colour;
                    }
                }
            }
        }
    }

    /// Box-filters the supersampled buffer down by `factor`.
    fn resolve(&self, factor: u32) -> RgbaImage {
        let (width, height) = (self.width / factor, self.height / factor);
        let samples = (factor * factor) as f32;
        RgbaImage::from_fn(width, height, |x, y| {
            let mut sum = [0.0f32; 4];
            for sy in 0..factor {
                for sx in 0..factor {
                    let row = (y * factor + sy) as usize;
                    let idx = row * self.width as usize + (x * factor + sx) as usize;
                    let [r, g, b, a] = self.colour[idx].to_array();
                    let a = a as f32;
                    sum[0] += r as f32 * a;
                    sum[1] += g as f32 * a;
                    sum[2] += b as f32 * a;
                    sum[3] += a;
                }
            }
            if sum[3] == 0.0 {
                return Rgba([0, 0, 0, 0]);
            }
            Rgba([
                (sum[0] / sum[3]).round() as u8,
                (sum[1] / sum[3]).round() as u8,
                (sum[2] / sum[3]).round() as u8,
                (sum[3] / samples).round() as u8,
            ])
        })
    }
}

/// Per-object base colour, stable across frames so a turntable doesn't flicker.
fn albedo(id: ObjectId) -> Colour {
    let mut rng = StdRng::seed_from_u64(id.0 as u64);
    Colour::from((
        rng.random_range(120u8..=240),
        rng.random_range(120u8..=240),
        rng.random_range(120u8..=240),
    ))
}

fn supersample_factor(samples: Option<u32>) -> u32 {
    samples
        .map(|s| (s as f32).sqrt().ceil() as u32)
        .unwrap_or(1)
        .clamp(1, MAX_SUPERSAMPLE)
}

/// Supersampled canvas dimensions and the factor actually used. The factor is
/// lowered until the canvas fits in [`MAX_CANVAS_PIXELS`].
fn canvas_size(width: u32, height: u32, factor: u32) -> Result<(u32, u32, u32), HostError> {
    (1..=factor.max(1))
        .rev()
        .find_map(|f| {
            let w = width.checked_mul(f)?;
            let h = height.checked_mul(f)?;
            let pixels = (w as usize).checked_mul(h as usize)?;
            (pixels <= MAX_CANVAS_PIXELS).then_some((w, h, f))
        })
        .ok_or(HostError::FrameTooLarge { width, height })
}

fn collect_lights(scene: &Scene) -> Vec<Light> {
    scene
        .ids()
        .filter_map(|id| {
            let object = scene.get(id)?;
            let ObjectData::Light(data) = &object.data else {
                return None;
            };
            if object.hide_render {
                return None;
            }
            let world = scene.world_matrix(id)?;
            let direction = world.transform_vector(&Vector3::new(0.0, 0.0, -1.0));
            Some(Light {
                kind: data.kind,
                energy: data.energy,
                direction: direction.try_normalize(1e-9)?,
                position: world.transform_point(&Point3::origin()),
            })
        })
        .collect()
}

/// Renders the scene from its active camera.
pub(crate) fn render_frame(
    scene: &Scene,
    settings: &RenderSettings,
) -> Result<RgbaImage, HostError> {
    let camera_id = scene.active_camera.ok_or(HostError::NoActiveCamera)?;
    let camera = scene
        .get(camera_id)
        .ok_or(HostError::UnknownObject(camera_id))?;
    let ObjectData::Camera(lens) = &camera.data else {
        return Err(HostError::NoActiveCamera);
    };
    let camera_world = scene
        .world_matrix(camera_id)
        .ok_or_else(|| HostError::BrokenHierarchy(camera.name.clone()))?;
    let view = camera_world
        .try_inverse()
        .ok_or_else(|| HostError::BrokenHierarchy(camera.name.clone()))?;
    let eye = camera_world.transform_point(&Point3::origin());

    let (width, height) = settings.output_size();
    let (canvas_w, canvas_h, factor) =
        canvas_size(width, height, supersample_factor(settings.samples))?;

    // The sensor width spans the larger image dimension
    let aspect = width as f32 / height as f32;
    let fov = lens.field_of_view();
    let fovy = if aspect >= 1.0 {
        2.0 * ((fov / 2.0).tan() / aspect).atan()
    } else {
        fov
    };
    let projection = Perspective3::new(aspect, fovy, NEAR, FAR);

    let background = if settings.film_transparent {
        DefinedColours::Transparent.colour()
    } else {
        DefinedColours::Grey.colour()
    };
    let mut canvas = Canvas::new(canvas_w, canvas_h, background);
    let lights = collect_lights(scene);

    for id in scene.ids() {
        let Some(object) = scene.get(id) else {
            continue;
        };
        let Some(mesh) = object.mesh() else {
            continue;
        };
        if object.hide_render {
            continue;
        }
        let Some(world) = scene.world_matrix(id) else {
            log::warn!("Skipping {}: broken parent chain", object.name);
            continue;
        };
        let model_view: Matrix4<f32> = view * world;
        let base = albedo(id);

        let world_points: Vec<Point3<f32>> =
            mesh.vertices.iter().map(|v| world.transform_point(v)).collect();
        let view_points: Vec<Point3<f32>> = mesh
            .vertices
            .iter()
            .map(|v| model_view.transform_point(v))
            .collect();

        for face in &mesh.faces {
            let idx = face.map(|i| i as usize);
            if idx.iter().any(|&i| i >= world_points.len()) {
                continue;
            }
            // No near plane clipping, drop anything touching it
            if idx.iter().any(|&i| view_points[i].z > -NEAR) {
                continue;
            }

            let [a, b, c] = idx.map(|i| world_points[i]);
            let Some(mut normal) = (b - a).cross(&(c - a)).try_normalize(1e-12) else {
                continue;
            };
            let centroid = Point3::from((a.coords + b.coords + c.coords) / 3.0);
            // Two sided shading
            if normal.dot(&(eye - centroid)) < 0.0 {
                normal = -normal;
            }
            let intensity = AMBIENT
                + lights
                    .iter()
                    .map(|l| l.intensity(&normal, &centroid))
                    .sum::<f32>();

            let screen = idx.map(|i| {
                let ndc = projection.project_point(&view_points[i]);
                Point3::new(
                    (ndc.x * 0.5 + 0.5) * canvas_w as f32,
                    (1.0 - (ndc.y * 0.5 + 0.5)) * canvas_h as f32,
                    ndc.z,
                )
            });
            canvas.triangle(screen, base.shade(intensity));
        }
    }

    Ok(canvas.resolve(factor))
}
