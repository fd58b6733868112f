//! Scene controller against the recording device

use std::path::{Path, PathBuf};
use std::rc::Rc;

use approx::assert_relative_eq;
use splat_engine::core::config::{LightConfig, ViewerConfig};
use splat_engine::foundation::math::Vec3;
use splat_engine::input::{Action, InputEvent, KeyCode, MouseButton};
use splat_engine::render::backends::headless::{DeviceCommand, HeadlessDevice};
use splat_engine::render::{GraphicsDevice, Renderable, ShaderProgram, Topology, Uniform};
use splat_engine::render::window::translate_batch;
use splat_engine::scene::{load_point_cloud, EventResponse, SceneController, SceneError};

const TRIANGLE: &str = "\
v 0 0 0
v 1 0 0
v 0 1 0
vn 0 0 1
f 1//1 2//1 3//1
";

const QUAD: &str = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vn 0 0 1
f 1//1 2//1 3//1
f 1//1 3//1 4//1
";

fn write_fixture(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("splat_scene_{}_{}", std::process::id(), name));
    std::fs::write(&path, contents).unwrap();
    path
}

fn shader(device: &Rc<HeadlessDevice>) -> Rc<ShaderProgram> {
    Rc::new(ShaderProgram::load(device.clone(), Path::new("splat_vert.spv"), Path::new("splat_frag.spv")).unwrap())
}

fn config_for(meshes: &[&Path], light_mesh: Option<&Path>) -> ViewerConfig {
    ViewerConfig {
        meshes: meshes.iter().map(|p| p.display().to_string()).collect(),
        light: LightConfig {
            mesh_path: light_mesh.map(|p| p.display().to_string()),
            ..LightConfig::default()
        },
        ..ViewerConfig::default()
    }
}

fn press(key: KeyCode) -> InputEvent {
    InputEvent::Key { key, action: Action::Press }
}

#[test]
fn triangle_mesh_draws_three_lit_points() {
    let triangle = write_fixture("triangle.obj", TRIANGLE);
    let device = Rc::new(HeadlessDevice::new());
    let config = config_for(&[&triangle], None);
    let mut scene = SceneController::load(device.clone(), shader(&device), &config).unwrap();

    device.clear_commands();
    assert!(scene.frame().unwrap());

    let draws = device.draw_calls();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].topology, Topology::Points);
    assert_eq!(draws[0].count, 3);
    assert!(!draws[0].indexed);

    assert_eq!(
        device.last_uniform("lightSourcePos"),
        Some(Uniform::LightPosition(Vec3::from(config.light.position)))
    );
    assert_eq!(device.last_uniform("drawSphere"), Some(Uniform::DrawLightProxy(false)));

    let commands = device.commands();
    assert_eq!(commands.first(), Some(&DeviceCommand::BeginFrame));
    assert_eq!(commands.last(), Some(&DeviceCommand::EndFrame));

    std::fs::remove_file(triangle).ok();
}

#[test]
fn light_proxy_is_drawn_after_the_cloud() {
    let triangle = write_fixture("lit_triangle.obj", TRIANGLE);
    let proxy = write_fixture("proxy.obj", TRIANGLE);
    let device = Rc::new(HeadlessDevice::new());
    let config = config_for(&[&triangle], Some(&proxy));
    let mut scene = SceneController::load(device.clone(), shader(&device), &config).unwrap();

    device.clear_commands();
    scene.frame().unwrap();

    let draws = device.draw_calls();
    assert_eq!(draws.len(), 2);
    assert_eq!((draws[0].topology, draws[0].indexed), (Topology::Points, false));
    assert_eq!((draws[1].topology, draws[1].indexed, draws[1].count), (Topology::Triangles, true, 3));
    assert_eq!(device.last_uniform("drawSphere"), Some(Uniform::DrawLightProxy(true)));

    std::fs::remove_file(triangle).ok();
    std::fs::remove_file(proxy).ok();
}

#[test]
fn selecting_b_then_a_draws_only_a() {
    let triangle = write_fixture("a.obj", TRIANGLE);
    let quad = write_fixture("b.obj", QUAD);
    let device = Rc::new(HeadlessDevice::new());
    let shared: Rc<dyn GraphicsDevice> = device.clone();
    let config = ViewerConfig::default();

    let clouds = vec![
        load_point_cloud(shared.clone(), &triangle, &config.points),
        load_point_cloud(shared.clone(), &quad, &config.points),
    ];
    let mut scene = SceneController::new(shared, shader(&device), clouds, None, &config).unwrap();
    let a = scene.clouds()[0].geometry().handle();

    assert_eq!(scene.handle_event(press(KeyCode::F2)), EventResponse::Continue);
    assert_eq!(scene.active_index(), 1);
    scene.handle_event(press(KeyCode::F1));

    device.clear_commands();
    scene.frame().unwrap();

    let draws = device.draw_calls();
    assert_eq!(draws.len(), 1);
    assert_eq!(Some(draws[0].geometry), a);
    assert_eq!(draws[0].count, 3);

    std::fs::remove_file(triangle).ok();
    std::fs::remove_file(quad).ok();
}

#[test]
fn resize_updates_aspect_and_device() {
    let triangle = write_fixture("resize.obj", TRIANGLE);
    let device = Rc::new(HeadlessDevice::new());
    let mut scene = SceneController::load(device.clone(), shader(&device), &config_for(&[&triangle], None)).unwrap();

    scene.handle_event(InputEvent::Resized { width: 400, height: 300 });

    assert_relative_eq!(scene.camera().aspect, 400.0 / 300.0, epsilon = 1e-6);
    let p = scene.camera().projection();
    assert_relative_eq!((p[(1, 1)] / p[(0, 0)]).abs(), 400.0 / 300.0, epsilon = 1e-4);
    assert!(device.commands().contains(&DeviceCommand::Resize { width: 400, height: 300 }));

    std::fs::remove_file(triangle).ok();
}

#[test]
fn hidpi_framebuffer_keeps_the_trackball_in_window_space() {
    let triangle = write_fixture("hidpi.obj", TRIANGLE);
    let device = Rc::new(HeadlessDevice::new());
    let mut scene = SceneController::load(device.clone(), shader(&device), &config_for(&[&triangle], None)).unwrap();

    scene.handle_event(InputEvent::WindowResized { width: 640, height: 480 });
    scene.handle_event(InputEvent::Resized { width: 1280, height: 960 });

    assert_eq!(scene.trackball().viewport(), (640.0, 480.0));
    assert_relative_eq!(scene.camera().aspect, 4.0 / 3.0, epsilon = 1e-6);
    assert!(device.commands().contains(&DeviceCommand::Resize { width: 1280, height: 960 }));

    // Window centre (320, 240) normalises by the 640x480 window, not the framebuffer.
    let centre = scene.trackball().map(320.0, 240.0);
    let lifted = Vec3::new(1.0 / 3.0, 0.25, (1.001_f32 - (1.0 / 9.0 + 0.0625)).sqrt());
    assert_relative_eq!(centre, lifted.normalize(), epsilon = 1e-5);

    std::fs::remove_file(triangle).ok();
}

#[test]
fn press_and_drag_within_one_poll_batch_rotates() {
    let triangle = write_fixture("batch.obj", TRIANGLE);
    let device = Rc::new(HeadlessDevice::new());
    let mut scene = SceneController::load(device.clone(), shader(&device), &config_for(&[&triangle], None)).unwrap();
    let before = scene.active_cloud().model();

    let batch = vec![
        glfw::WindowEvent::CursorPos(100.0, 240.0),
        glfw::WindowEvent::MouseButton(glfw::MouseButton::Button1, glfw::Action::Press, glfw::Modifiers::empty()),
        glfw::WindowEvent::CursorPos(300.0, 240.0),
    ];
    let mut cursor = (0.0, 0.0);
    for event in translate_batch(batch, &mut cursor) {
        scene.handle_event(event);
    }

    assert!(scene.is_dragging());
    assert_ne!(scene.active_cloud().model(), before);

    std::fs::remove_file(triangle).ok();
}

#[test]
fn non_positive_point_size_is_refused_before_loading() {
    let triangle = write_fixture("size.obj", TRIANGLE);
    let device = Rc::new(HeadlessDevice::new());
    let mut config = config_for(&[&triangle], None);
    config.points.initial_size = 0.0;

    let result = SceneController::load(device.clone(), shader(&device), &config);
    assert!(matches!(result, Err(SceneError::InvalidConfig(_))));
    assert_eq!(device.live_geometry(), 0);

    std::fs::remove_file(triangle).ok();
}

#[test]
fn drag_without_motion_leaves_the_model_alone() {
    let triangle = write_fixture("still.obj", TRIANGLE);
    let device = Rc::new(HeadlessDevice::new());
    let mut scene = SceneController::load(device.clone(), shader(&device), &config_for(&[&triangle], None)).unwrap();
    let before = scene.active_cloud().model();

    scene.handle_event(InputEvent::MouseButton {
        button: MouseButton::Left,
        action: Action::Press,
        x: 100.0,
        y: 100.0,
    });
    scene.handle_event(InputEvent::CursorMoved { x: 100.0, y: 100.0 });

    let after = scene.active_cloud().model();
    assert_eq!(after, before);
    assert!(after.iter().all(|v| v.is_finite()));

    std::fs::remove_file(triangle).ok();
}

#[test]
fn right_drag_orbits_the_light() {
    let triangle = write_fixture("orbit.obj", TRIANGLE);
    let device = Rc::new(HeadlessDevice::new());
    let mut scene = SceneController::load(device.clone(), shader(&device), &config_for(&[&triangle], None)).unwrap();
    let start = scene.light().map(|light| light.world_position()).unwrap();
    let cloud_model = scene.active_cloud().model();

    scene.handle_event(InputEvent::MouseButton {
        button: MouseButton::Right,
        action: Action::Press,
        x: 320.0,
        y: 240.0,
    });
    scene.handle_event(InputEvent::CursorMoved { x: 420.0, y: 200.0 });

    let moved = scene.light().map(|light| light.world_position()).unwrap();
    assert!((moved - start).norm() > 1e-3);
    // Orbiting keeps the distance to the origin.
    assert_relative_eq!(moved.norm(), start.norm(), epsilon = 1e-3);
    assert_eq!(scene.active_cloud().model(), cloud_model);

    std::fs::remove_file(triangle).ok();
}

#[test]
fn missing_meshes_keep_their_slots_and_draw_nothing() {
    let device = Rc::new(HeadlessDevice::new());
    let missing = Path::new("definitely/missing.obj");
    let mut scene = SceneController::load(device.clone(), shader(&device), &config_for(&[missing, missing], None)).unwrap();

    assert_eq!(scene.clouds().len(), 2);
    scene.handle_event(press(KeyCode::F2));
    assert_eq!(scene.active_index(), 1);

    device.clear_commands();
    scene.frame().unwrap();
    assert!(device.draw_calls().is_empty());
    assert_eq!(device.commands(), vec![DeviceCommand::BeginFrame, DeviceCommand::EndFrame]);
}

#[test]
fn dropping_the_scene_releases_all_geometry() {
    let triangle = write_fixture("release.obj", TRIANGLE);
    let device = Rc::new(HeadlessDevice::new());
    let scene = SceneController::load(device.clone(), shader(&device), &config_for(&[&triangle, &triangle], None)).unwrap();
    assert_eq!(device.live_geometry(), 2);

    drop(scene);
    assert_eq!(device.live_geometry(), 0);
    assert_eq!(device.live_programs(), 0);
    assert_eq!(device.stale_releases(), 0);

    std::fs::remove_file(triangle).ok();
}
