//! Basic demo: a floor, a few emissive cubes, and a fly camera.

use ember_bridge::{load_mesh, Engine, Files};
use glam::{Quat, Vec3};
use render_api::{Camera, Key, Mesh, System, SystemCtx, Transform, World};

/// Free fly camera: arrows rotate, WASD + space/shift move.
#[derive(Default)]
struct FlyCamera {
    phi: f32,
    theta: f32,
}

impl FlyCamera {
    fn new() -> Self {
        Self {
            phi: std::f32::consts::PI,
            theta: -0.15,
        }
    }
}

impl System for FlyCamera {
    fn update(&mut self, ctx: &mut SystemCtx, dt: f32) {
        let Some(camera) = ctx.active_camera else {
            return;
        };

        let rotate_speed = dt * 1.0;
        if ctx.input.is_key_held(Key::Left) {
            self.phi -= rotate_speed;
        }
        if ctx.input.is_key_held(Key::Right) {
            self.phi += rotate_speed;
        }
        if ctx.input.is_key_held(Key::Up) {
            self.theta += rotate_speed;
        }
        if ctx.input.is_key_held(Key::Down) {
            self.theta -= rotate_speed;
        }

        let Some(transform) = ctx.world.transform_mut(camera) else {
            return;
        };
        transform.rotation =
            Quat::from_rotation_y(self.phi) * Quat::from_rotation_x(self.theta);

        let forward = transform.forward();
        let up = Vec3::Y;
        let right = forward.cross(up);

        let move_speed = dt * 2.0;
        let mut step = Vec3::ZERO;
        if ctx.input.is_key_held(Key::W) {
            step += forward;
        }
        if ctx.input.is_key_held(Key::S) {
            step -= forward;
        }
        if ctx.input.is_key_held(Key::A) {
            step -= right;
        }
        if ctx.input.is_key_held(Key::D) {
            step += right;
        }
        if ctx.input.is_key_held(Key::Space) {
            step += up;
        }
        if ctx.input.is_key_held(Key::LShift) {
            step -= up;
        }
        transform.position += step * move_speed;
    }
}

/// Unit cube as a triangle soup, for when the model assets are absent.
fn unit_cube() -> Vec<[Vec3; 3]> {
    let p = [
        Vec3::new(-0.5, -0.5, -0.5),
        Vec3::new(0.5, -0.5, -0.5),
        Vec3::new(0.5, 0.5, -0.5),
        Vec3::new(-0.5, 0.5, -0.5),
        Vec3::new(-0.5, -0.5, 0.5),
        Vec3::new(0.5, -0.5, 0.5),
        Vec3::new(0.5, 0.5, 0.5),
        Vec3::new(-0.5, 0.5, 0.5),
    ];
    let faces = [
        [0, 2, 1, 0, 3, 2], // -z
        [4, 5, 6, 4, 6, 7], // +z
        [0, 1, 5, 0, 5, 4], // -y
        [3, 6, 2, 3, 7, 6], // +y
        [0, 4, 7, 0, 7, 3], // -x
        [1, 2, 6, 1, 6, 5], // +x
    ];
    faces
        .iter()
        .flat_map(|f| [[p[f[0]], p[f[1]], p[f[2]]], [p[f[3]], p[f[4]], p[f[5]]]])
        .collect()
}

fn box_mesh(files: &Files, material: Vec3) -> Mesh {
    match load_mesh(files, "assets/models/box.glb", material, 0) {
        Ok(mesh) => mesh,
        Err(err) => {
            log::warn!(target: "system", "{err}; using a procedural cube");
            Mesh::from_triangles(&unit_cube(), material)
        }
    }
}

fn add_cube(world: &mut World, files: &Files, pos: Vec3, scale: Vec3, material: Vec3, yangle: f32) {
    let entity = world.spawn();
    world.set_transform(
        entity,
        Transform {
            position: pos,
            scale,
            rotation: Quat::from_rotation_y(yangle.to_radians()),
        },
    );
    world.set_mesh(entity, box_mesh(files, material));
}

fn run() -> render_api::Result<()> {
    let mut engine = Engine::new("Ember (Vulkan)");

    let camera = engine.world.spawn();
    engine.world.set_transform(camera, Transform::from_position(Vec3::new(0.0, 2.0, 4.0)));
    engine.world.set_camera(camera, Camera::new(50.0));
    engine.active_camera = Some(camera);

    let white = Vec3::new(-1.0, -1.0, -1.0);
    let red = Vec3::new(1.0, 0.2, 0.2) * 6.0;
    let yellow = Vec3::new(1.0, 0.7, 0.1) * 4.0;
    let green = Vec3::new(0.1, 1.0, 0.2) * 4.0;

    // Floor plus a few lit cubes.
    add_cube(
        &mut engine.world,
        &engine.files,
        Vec3::new(0.0, -0.5, 0.0),
        Vec3::new(128.0, 1.0, 128.0),
        white,
        0.0,
    );
    add_cube(
        &mut engine.world,
        &engine.files,
        Vec3::new(0.0, 2.0, 0.0),
        Vec3::splat(0.5),
        yellow,
        0.0,
    );
    add_cube(
        &mut engine.world,
        &engine.files,
        Vec3::new(-2.0, 0.75, 1.0),
        Vec3::new(1.0, 1.5, 1.0),
        red,
        0.0,
    );
    add_cube(
        &mut engine.world,
        &engine.files,
        Vec3::new(2.5, 3.0, -1.5),
        Vec3::new(1.5, 1.5, 0.1),
        green,
        -45.0,
    );

    engine.register_system(Box::new(FlyCamera::new()));
    engine.run()
}

fn main() {
    ember_bridge::init_logging("log.txt", log::LevelFilter::Info);

    if let Err(err) = run() {
        log::error!(target: "program", "{err}");
        std::process::exit(1);
    }
}
