//! Viewer scene: every loaded cloud, the light, the camera and input state

use std::path::Path;
use std::rc::Rc;

use crate::assets::ObjLoader;
use crate::core::config::{LightConfig, PointConfig, ViewerConfig};
use crate::foundation::math::Vec3;
use crate::input::{Action, InputEvent, KeyCode, MouseButton};
use crate::render::device::GraphicsDevice;
use crate::render::error::RenderResult;
use crate::render::primitives::camera::CameraState;
use crate::render::renderable::{LightParameters, LightSource, PointCloud, Renderable};
use crate::render::shader::ShaderProgram;
use crate::render::trackball::Trackball;

use super::SceneError;

/// What the event loop should do after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResponse {
    /// Keep running
    Continue,
    /// Close the viewer
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragTarget {
    ActiveCloud,
    Light,
}

#[derive(Debug, Clone, Copy)]
struct Drag {
    button: MouseButton,
    target: DragTarget,
    last_point: Vec3,
}

/// Owns the scene and turns input events into scene changes
pub struct SceneController {
    device: Rc<dyn GraphicsDevice>,
    shader: Rc<ShaderProgram>,
    clouds: Vec<PointCloud>,
    active: usize,
    point_size: f32,
    light: Option<LightSource>,
    camera: CameraState,
    trackball: Trackball,
    drag: Option<Drag>,
    min_distance: f32,
    zoom_step: f32,
    exit_requested: bool,
}

impl SceneController {
    /// Assemble a scene from already built parts
    ///
    /// The first cloud starts active. An empty cloud list is refused.
    pub fn new(
        device: Rc<dyn GraphicsDevice>,
        shader: Rc<ShaderProgram>,
        clouds: Vec<PointCloud>,
        light: Option<LightSource>,
        config: &ViewerConfig,
    ) -> Result<Self, SceneError> {
        if clouds.is_empty() {
            return Err(SceneError::NoPointClouds);
        }

        let (width, height) = (config.window.width, config.window.height);
        let point_size = clouds[0].point_size();
        log::info!(
            "Scene ready: {} point clouds, light {}",
            clouds.len(),
            if light.is_some() { "on" } else { "off" }
        );

        Ok(Self {
            device,
            shader,
            clouds,
            active: 0,
            point_size,
            light,
            camera: CameraState::from_config(&config.camera, width, height),
            trackball: Trackball::new(width, height),
            drag: None,
            min_distance: config.camera.min_distance,
            zoom_step: config.camera.zoom_step,
            exit_requested: false,
        })
    }

    /// Load every configured mesh and the light
    ///
    /// Meshes that fail to load or upload are replaced by empty clouds so the
    /// function keys keep their positions.
    pub fn load(
        device: Rc<dyn GraphicsDevice>,
        shader: Rc<ShaderProgram>,
        config: &ViewerConfig,
    ) -> Result<Self, SceneError> {
        config.validate().map_err(SceneError::InvalidConfig)?;

        let clouds = config
            .meshes
            .iter()
            .map(|path| load_point_cloud(device.clone(), Path::new(path), &config.points))
            .collect();
        let light = load_light(device.clone(), &config.light);

        Self::new(device, shader, clouds, Some(light), config)
    }

    /// Apply one input event
    pub fn handle_event(&mut self, event: InputEvent) -> EventResponse {
        match event {
            InputEvent::Key { key, action: Action::Press } => self.handle_key(key),
            InputEvent::Key { .. } => {}
            InputEvent::MouseButton { button, action, x, y } => self.handle_button(button, action, x, y),
            InputEvent::CursorMoved { x, y } => self.drag_to(x, y),
            InputEvent::Scroll { y_offset, .. } => {
                self.camera.dolly(y_offset as f32 * self.zoom_step, self.min_distance);
            }
            InputEvent::Resized { width, height } => self.resize(width, height),
            InputEvent::WindowResized { width, height } => self.trackball.set_viewport(width, height),
            InputEvent::CloseRequested => self.exit_requested = true,
        }

        if self.exit_requested {
            EventResponse::Exit
        } else {
            EventResponse::Continue
        }
    }

    fn handle_key(&mut self, key: KeyCode) {
        if let Some(index) = key.function_index() {
            self.select(index);
            return;
        }

        match key {
            KeyCode::Escape => self.exit_requested = true,
            KeyCode::S => self.scale_point_size(0.5),
            KeyCode::L => self.scale_point_size(2.0),
            _ => {}
        }
    }

    fn handle_button(&mut self, button: MouseButton, action: Action, x: f64, y: f64) {
        match action {
            Action::Press => {
                let target = match button {
                    MouseButton::Left => DragTarget::ActiveCloud,
                    MouseButton::Right if self.light.is_some() => DragTarget::Light,
                    _ => return,
                };
                self.drag = Some(Drag {
                    button,
                    target,
                    last_point: self.trackball.map(x, y),
                });
            }
            Action::Release => {
                if self.drag.map_or(false, |drag| drag.button == button) {
                    self.drag = None;
                }
            }
            Action::Repeat => {}
        }
    }

    fn drag_to(&mut self, x: f64, y: f64) {
        let Some(drag) = self.drag.as_mut() else {
            return;
        };

        let current = self.trackball.map(x, y);
        let rotation = Trackball::rotation_between(&drag.last_point, &current);
        drag.last_point = current;
        let target = drag.target;

        if let Some(rotation) = rotation {
            log::trace!("Drag rotation {:.3} degrees about {:?}", rotation.angle_degrees, rotation.axis);
            match target {
                DragTarget::ActiveCloud => self.clouds[self.active].orbit(rotation.angle_degrees, rotation.axis),
                DragTarget::Light => {
                    if let Some(light) = self.light.as_mut() {
                        light.orbit(rotation.angle_degrees, rotation.axis);
                    }
                }
            }
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.camera.set_viewport(width, height) {
            self.device.resize(width, height);
        }
    }

    /// Make cloud `index` active; out-of-range indices are ignored
    pub fn select(&mut self, index: usize) {
        let Some(cloud) = self.clouds.get_mut(index) else {
            log::warn!("No point cloud bound to F{} ({} loaded)", index + 1, self.clouds.len());
            return;
        };

        // The shared point size follows the selection.
        if let Err(e) = cloud.update_point_size(self.point_size) {
            log::warn!("Keeping point size of cloud {}: {}", index, e);
        }
        self.active = index;
        self.drag = None;
        log::info!("Selected point cloud {}", index);
    }

    fn scale_point_size(&mut self, factor: f32) {
        let requested = self.point_size * factor;
        match self.clouds[self.active].update_point_size(requested) {
            Ok(size) => self.point_size = size,
            Err(e) => log::warn!("Point size {} rejected: {}", requested, e),
        }
    }

    /// Update and draw the active cloud, then the light proxy
    pub fn render_frame(&mut self) -> RenderResult<()> {
        let view = *self.camera.view();
        let projection = *self.camera.projection();

        let cloud = &mut self.clouds[self.active];
        if let Some(light) = &self.light {
            cloud.set_light(light.lighting());
        }
        cloud.update();
        cloud.draw(&view, &projection, &self.shader)?;

        if let Some(light) = self.light.as_mut() {
            light.update();
            light.draw(&view, &projection, &self.shader)?;
        }
        Ok(())
    }

    /// Run one device frame around [`render_frame`](Self::render_frame)
    ///
    /// Returns `Ok(false)` when the device skipped the frame.
    pub fn frame(&mut self) -> RenderResult<bool> {
        if !self.device.begin_frame()? {
            return Ok(false);
        }
        let drawn = self.render_frame();
        let ended = self.device.end_frame();
        drawn.and(ended)?;
        Ok(true)
    }

    /// Index of the selected cloud, in F-key order
    pub fn active_index(&self) -> usize {
        self.active
    }

    /// The cloud that is updated and drawn each frame
    pub fn active_cloud(&self) -> &PointCloud {
        &self.clouds[self.active]
    }

    /// Every loaded cloud, placeholders included
    pub fn clouds(&self) -> &[PointCloud] {
        &self.clouds
    }

    /// The point light, if the scene has one
    pub fn light(&self) -> Option<&LightSource> {
        self.light.as_ref()
    }

    /// Point size applied to the active cloud
    pub fn point_size(&self) -> f32 {
        self.point_size
    }

    /// Camera used for the view and projection matrices
    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    /// Trackball over the window's cursor space
    pub fn trackball(&self) -> &Trackball {
        &self.trackball
    }

    /// Whether a mouse drag is in progress
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Whether Escape or a close request has been seen
    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }
}

/// Load one mesh as a point cloud, falling back to an empty cloud
pub fn load_point_cloud(device: Rc<dyn GraphicsDevice>, path: &Path, config: &PointConfig) -> PointCloud {
    let color = Vec3::from(config.color);

    let mesh = match ObjLoader::load_obj(path) {
        Ok(mesh) => mesh,
        Err(e) => {
            log::error!("Failed to load {}: {}", path.display(), e);
            return PointCloud::placeholder(device, config.initial_size).with_color(color);
        }
    };

    match PointCloud::from_mesh(device.clone(), &mesh, config.initial_size) {
        Ok(cloud) => {
            log::info!("Loaded {} ({} points)", path.display(), mesh.vertices.len());
            cloud.with_color(color)
        }
        Err(e) => {
            log::error!("Failed to upload {}: {}", path.display(), e);
            PointCloud::placeholder(device, config.initial_size).with_color(color)
        }
    }
}

/// Load the light, keeping it as a proxy-less light when its mesh fails
pub fn load_light(device: Rc<dyn GraphicsDevice>, config: &LightConfig) -> LightSource {
    let parameters = LightParameters::from(config);
    let Some(mesh_path) = config.mesh_path.as_deref() else {
        return LightSource::without_proxy(device, parameters);
    };

    let mesh = match ObjLoader::load_obj_with_offset(mesh_path, parameters.position) {
        Ok(mesh) => mesh,
        Err(e) => {
            log::error!("Failed to load light mesh {}: {}", mesh_path, e);
            return LightSource::without_proxy(device, parameters);
        }
    };

    LightSource::from_mesh(device.clone(), &mesh, parameters).unwrap_or_else(|e| {
        log::error!("Failed to upload light mesh {}: {}", mesh_path, e);
        LightSource::without_proxy(device, parameters)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::headless::{DeviceCommand, HeadlessDevice};
    use crate::render::geometry::GeometryBuffer;
    use crate::render::primitives::mesh::GeometryData;

    fn cloud(device: &Rc<HeadlessDevice>) -> PointCloud {
        let data = GeometryData {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]; 2],
            indices: Vec::new(),
        };
        let geometry = GeometryBuffer::upload(device.clone(), &data).unwrap();
        PointCloud::new(geometry, 30.0).unwrap()
    }

    fn scene(count: usize) -> (Rc<HeadlessDevice>, SceneController) {
        let device = Rc::new(HeadlessDevice::new());
        let shader = Rc::new(ShaderProgram::load(device.clone(), Path::new("v.spv"), Path::new("f.spv")).unwrap());
        let clouds = (0..count).map(|_| cloud(&device)).collect();
        let controller =
            SceneController::new(device.clone(), shader, clouds, None, &ViewerConfig::default()).unwrap();
        (device, controller)
    }

    fn press(key: KeyCode) -> InputEvent {
        InputEvent::Key { key, action: Action::Press }
    }

    #[test]
    fn empty_scene_is_refused() {
        let device = Rc::new(HeadlessDevice::new());
        let shader = Rc::new(ShaderProgram::load(device.clone(), Path::new("v.spv"), Path::new("f.spv")).unwrap());
        let result = SceneController::new(device, shader, Vec::new(), None, &ViewerConfig::default());
        assert!(matches!(result, Err(SceneError::NoPointClouds)));
    }

    #[test]
    fn function_keys_select_and_unknown_indices_are_ignored() {
        let (_device, mut controller) = scene(3);
        controller.handle_event(press(KeyCode::F3));
        assert_eq!(controller.active_index(), 2);
        controller.handle_event(press(KeyCode::F9));
        assert_eq!(controller.active_index(), 2);
    }

    #[test]
    fn point_size_halves_and_doubles_within_bounds() {
        let (_device, mut controller) = scene(1);
        controller.handle_event(press(KeyCode::S));
        assert_eq!(controller.point_size(), 15.0);
        for _ in 0..10 {
            controller.handle_event(press(KeyCode::L));
        }
        assert_eq!(controller.point_size(), 128.0);
        for _ in 0..20 {
            controller.handle_event(press(KeyCode::S));
        }
        assert_eq!(controller.point_size(), 1.0);
        assert_eq!(controller.active_cloud().point_size(), 1.0);
    }

    #[test]
    fn selection_carries_the_current_point_size() {
        let (_device, mut controller) = scene(2);
        controller.handle_event(press(KeyCode::L));
        controller.handle_event(press(KeyCode::F2));
        assert_eq!(controller.clouds()[1].point_size(), 60.0);
    }

    #[test]
    fn escape_and_close_exit() {
        let (_device, mut controller) = scene(1);
        assert_eq!(controller.handle_event(press(KeyCode::A)), EventResponse::Continue);
        assert_eq!(controller.handle_event(press(KeyCode::Escape)), EventResponse::Exit);

        let (_device, mut controller) = scene(1);
        assert_eq!(controller.handle_event(InputEvent::CloseRequested), EventResponse::Exit);
    }

    #[test]
    fn key_release_does_nothing() {
        let (_device, mut controller) = scene(2);
        controller.handle_event(InputEvent::Key { key: KeyCode::F2, action: Action::Release });
        assert_eq!(controller.active_index(), 0);
    }

    #[test]
    fn left_drag_rotates_the_active_cloud() {
        let (_device, mut controller) = scene(2);
        let before = controller.active_cloud().model();

        controller.handle_event(InputEvent::MouseButton {
            button: MouseButton::Left,
            action: Action::Press,
            x: 320.0,
            y: 240.0,
        });
        assert!(controller.is_dragging());
        controller.handle_event(InputEvent::CursorMoved { x: 400.0, y: 240.0 });
        assert_ne!(controller.active_cloud().model(), before);
        assert_eq!(controller.clouds()[1].model(), before);

        controller.handle_event(InputEvent::MouseButton {
            button: MouseButton::Left,
            action: Action::Release,
            x: 400.0,
            y: 240.0,
        });
        assert!(!controller.is_dragging());
    }

    #[test]
    fn cursor_motion_without_drag_changes_nothing() {
        let (_device, mut controller) = scene(1);
        let before = controller.active_cloud().model();
        controller.handle_event(InputEvent::CursorMoved { x: 10.0, y: 10.0 });
        assert_eq!(controller.active_cloud().model(), before);
    }

    #[test]
    fn right_drag_without_light_is_ignored() {
        let (_device, mut controller) = scene(1);
        controller.handle_event(InputEvent::MouseButton {
            button: MouseButton::Right,
            action: Action::Press,
            x: 0.0,
            y: 0.0,
        });
        assert!(!controller.is_dragging());
    }

    #[test]
    fn scroll_dollies_no_closer_than_the_minimum() {
        let (_device, mut controller) = scene(1);
        let start = controller.camera().distance();
        controller.handle_event(InputEvent::Scroll { x_offset: 0.0, y_offset: 3.0 });
        assert!((controller.camera().distance() - (start - 3.0)).abs() < 1e-4);
        controller.handle_event(InputEvent::Scroll { x_offset: 0.0, y_offset: 1000.0 });
        assert!((controller.camera().distance() - 2.0).abs() < 1e-4);
    }

    #[test]
    fn minimized_resize_is_ignored() {
        let (device, mut controller) = scene(1);
        let aspect = controller.camera().aspect;
        device.clear_commands();
        controller.handle_event(InputEvent::Resized { width: 0, height: 0 });
        assert_eq!(controller.camera().aspect, aspect);
        assert!(device.commands().is_empty());
    }

    #[test]
    fn trackball_follows_window_size_not_framebuffer() {
        let (device, mut controller) = scene(1);
        controller.handle_event(InputEvent::Resized { width: 1280, height: 960 });
        assert_eq!(controller.trackball().viewport(), (640.0, 480.0));
        assert!(device.commands().contains(&DeviceCommand::Resize { width: 1280, height: 960 }));

        controller.handle_event(InputEvent::WindowResized { width: 800, height: 600 });
        assert_eq!(controller.trackball().viewport(), (800.0, 600.0));
        controller.handle_event(InputEvent::WindowResized { width: 0, height: 0 });
        assert_eq!(controller.trackball().viewport(), (800.0, 600.0));
    }

    #[test]
    fn missing_mesh_becomes_an_empty_cloud() {
        let device: Rc<dyn GraphicsDevice> = Rc::new(HeadlessDevice::new());
        let cloud = load_point_cloud(device, Path::new("does/not/exist.obj"), &PointConfig::default());
        assert!(!cloud.geometry().is_drawable());
    }

    #[test]
    fn missing_light_mesh_keeps_a_light_without_proxy() {
        let device: Rc<dyn GraphicsDevice> = Rc::new(HeadlessDevice::new());
        let config = LightConfig {
            mesh_path: Some("does/not/exist.obj".to_string()),
            ..LightConfig::default()
        };
        let light = load_light(device, &config);
        assert!(!light.is_drawable());
        assert_eq!(light.parameters().position, Vec3::from(config.position));
    }
}
