//! First-person orientation controller.
//!
//! [`Camera`] keeps a position plus yaw/pitch Euler angles and derives an
//! orthonormal `front`/`right`/`up` basis from them whenever the angles change.
//! Hosts feed it discrete movement and look events once per frame and read
//! back a view matrix (and, optionally, a projection built from its zoom).
//!
//! Conventions: right-handed, Y-up, yaw measured from the +X axis. With the
//! default yaw of -90° the camera looks down -Z.

use cgmath::{Deg, InnerSpace, Matrix4, Point3, Rad, Vector3, perspective};

/// Default yaw, looking down -Z.
pub const YAW: Deg<f32> = Deg(-90.0);
pub const PITCH: Deg<f32> = Deg(0.0);
/// World units per second.
pub const SPEED: f32 = 2.5;
/// Degrees per pointer unit.
pub const SENSITIVITY: f32 = 0.1;
pub const ZOOM: Deg<f32> = Deg(45.0);

/// Pitch is kept inside this bound (in degrees) when constraining, so the view never flips.
pub const PITCH_LIMIT: f32 = 89.0;
pub const MIN_ZOOM: f32 = 1.0;
pub const MAX_ZOOM: f32 = 45.0;

/// Wgpu uses a [0, 1] depth range while cgmath produces OpenGL-style [-1, 1] clip space.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Window-system independent movement directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
}

/// Construction parameters for a [`Camera`].
///
/// ```
/// use meshcam::camera::{Camera, CameraOptions};
///
/// let camera = Camera::from_options(CameraOptions {
///     position: (0.0, 0.0, 3.0).into(),
///     ..Default::default()
/// });
/// assert!((camera.front().z + 1.0).abs() < 1e-5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraOptions {
    pub position: Point3<f32>,
    pub world_up: Vector3<f32>,
    pub yaw: Deg<f32>,
    pub pitch: Deg<f32>,
    pub movement_speed: f32,
    pub mouse_sensitivity: f32,
    pub zoom: Deg<f32>,
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            position: Point3::new(0.0, 0.0, 0.0),
            world_up: Vector3::unit_y(),
            yaw: YAW,
            pitch: PITCH,
            movement_speed: SPEED,
            mouse_sensitivity: SENSITIVITY,
            zoom: ZOOM,
        }
    }
}

/// A yaw/pitch camera with a derived orthonormal basis.
///
/// `front`, `right` and `up` cannot be set directly; they are recomputed from
/// yaw, pitch and the fixed world-up reference every time either angle changes.
///
/// A world-up vector parallel to the look direction yields an undefined (NaN)
/// basis. This is not validated.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Point3<f32>,
    front: Vector3<f32>,
    up: Vector3<f32>,
    right: Vector3<f32>,
    world_up: Vector3<f32>,
    yaw: Deg<f32>,
    pitch: Deg<f32>,
    pub movement_speed: f32,
    pub mouse_sensitivity: f32,
    zoom: Deg<f32>,
}

impl Camera {
    pub fn new<P, V, Y, T>(position: P, world_up: V, yaw: Y, pitch: T) -> Self
    where
        P: Into<Point3<f32>>,
        V: Into<Vector3<f32>>,
        Y: Into<Deg<f32>>,
        T: Into<Deg<f32>>,
    {
        Self::from_options(CameraOptions {
            position: position.into(),
            world_up: world_up.into(),
            yaw: yaw.into(),
            pitch: pitch.into(),
            ..Default::default()
        })
    }

    /// Scalar flavour of [`Camera::new`]; angles are in degrees.
    #[allow(clippy::too_many_arguments)]
    pub fn from_components(
        pos_x: f32,
        pos_y: f32,
        pos_z: f32,
        up_x: f32,
        up_y: f32,
        up_z: f32,
        yaw: f32,
        pitch: f32,
    ) -> Self {
        Self::new(
            (pos_x, pos_y, pos_z),
            (up_x, up_y, up_z),
            Deg(yaw),
            Deg(pitch),
        )
    }

    pub fn from_options(options: CameraOptions) -> Self {
        let mut camera = Self {
            position: options.position,
            front: -Vector3::unit_z(),
            up: options.world_up,
            right: Vector3::unit_x(),
            world_up: options.world_up,
            yaw: options.yaw,
            pitch: options.pitch,
            movement_speed: options.movement_speed,
            mouse_sensitivity: options.mouse_sensitivity,
            zoom: options.zoom,
        };
        camera.update_camera_vectors();
        camera
    }

    /// Look-at transform from `position` towards `position + front`.
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    /// Perspective projection using the current zoom as vertical field of view.
    pub fn projection_matrix(&self, aspect: f32, znear: f32, zfar: f32) -> Matrix4<f32> {
        perspective(self.zoom, aspect, znear, zfar)
    }

    /// Displaces the camera along `front` or `right` by `movement_speed * delta_time`.
    pub fn process_keyboard(&mut self, direction: CameraMovement, delta_time: f32) {
        let velocity = self.movement_speed * delta_time;
        match direction {
            CameraMovement::Forward => self.position += self.front * velocity,
            CameraMovement::Backward => self.position -= self.front * velocity,
            CameraMovement::Left => self.position -= self.right * velocity,
            CameraMovement::Right => self.position += self.right * velocity,
        }
    }

    /// Applies pointer deltas to yaw and pitch, then rebuilds the basis.
    ///
    /// With `constrain_pitch` the pitch stays within ±[`PITCH_LIMIT`] degrees.
    pub fn process_mouse_movement(&mut self, x_offset: f32, y_offset: f32, constrain_pitch: bool) {
        self.yaw += Deg(x_offset * self.mouse_sensitivity);
        self.pitch += Deg(y_offset * self.mouse_sensitivity);

        if constrain_pitch {
            self.pitch = Deg(self.pitch.0.clamp(-PITCH_LIMIT, PITCH_LIMIT));
        }

        self.update_camera_vectors();
    }

    /// Scrolling up zooms in; the field of view stays within [`MIN_ZOOM`, `MAX_ZOOM`].
    pub fn process_mouse_scroll(&mut self, y_offset: f32) {
        self.zoom = Deg((self.zoom.0 - y_offset).clamp(MIN_ZOOM, MAX_ZOOM));
    }

    pub fn front(&self) -> Vector3<f32> {
        self.front
    }

    pub fn up(&self) -> Vector3<f32> {
        self.up
    }

    pub fn right(&self) -> Vector3<f32> {
        self.right
    }

    pub fn world_up(&self) -> Vector3<f32> {
        self.world_up
    }

    pub fn yaw(&self) -> Deg<f32> {
        self.yaw
    }

    pub fn pitch(&self) -> Deg<f32> {
        self.pitch
    }

    pub fn zoom(&self) -> Deg<f32> {
        self.zoom
    }

    fn update_camera_vectors(&mut self) {
        let (sin_yaw, cos_yaw) = Rad::from(self.yaw).0.sin_cos();
        let (sin_pitch, cos_pitch) = Rad::from(self.pitch).0.sin_cos();

        self.front = Vector3::new(cos_yaw * cos_pitch, sin_pitch, sin_yaw * cos_pitch).normalize();
        // Without normalizing, the cross products shrink as pitch approaches ±90°
        // and movement along `right` slows down.
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_options(CameraOptions::default())
    }
}

/// Aspect ratio and clip planes for a framebuffer; the field of view comes from the camera zoom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    aspect: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Projection {
    pub fn new(width: u32, height: u32, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn calc_matrix(&self, camera: &Camera) -> Matrix4<f32> {
        camera.projection_matrix(self.aspect, self.znear, self.zfar)
    }
}

/// Camera data laid out for a uniform buffer.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_position: [f32; 4],
    pub view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj =
            (OPENGL_TO_WGPU_MATRIX * projection.calc_matrix(camera) * camera.view_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{EuclideanSpace, Transform};

    const EPS: f32 = 1e-5;

    fn assert_near(actual: Vector3<f32>, expected: Vector3<f32>) {
        assert!(
            (actual - expected).magnitude() < EPS,
            "expected {:?}, got {:?}",
            expected,
            actual
        );
    }

    fn assert_orthonormal(camera: &Camera) {
        let (f, r, u) = (camera.front(), camera.right(), camera.up());
        assert!((f.magnitude() - 1.0).abs() < EPS);
        assert!((r.magnitude() - 1.0).abs() < EPS);
        assert!((u.magnitude() - 1.0).abs() < EPS);
        assert!(f.dot(r).abs() < EPS);
        assert!(f.dot(u).abs() < EPS);
        assert!(r.dot(u).abs() < EPS);
        // right-handed: the camera looks down its local -Z
        assert_near(r.cross(u), -f);
    }

    #[test]
    fn default_camera_looks_down_negative_z() {
        let camera = Camera::new((0.0, 0.0, 3.0), Vector3::unit_y(), YAW, PITCH);

        assert_near(camera.front(), Vector3::new(0.0, 0.0, -1.0));
        assert_near(camera.right(), Vector3::new(1.0, 0.0, 0.0));
        assert_near(camera.up(), Vector3::new(0.0, 1.0, 0.0));
        assert_eq!(camera.zoom(), ZOOM);
    }

    #[test]
    fn forward_move_with_unit_speed_and_time() {
        let mut camera = Camera::new((0.0, 0.0, 3.0), Vector3::unit_y(), YAW, PITCH);
        camera.movement_speed = 1.0;

        camera.process_keyboard(CameraMovement::Forward, 1.0);

        assert_near(camera.position.to_vec(), Vector3::new(0.0, 0.0, 2.0));
    }

    #[test]
    fn forward_then_backward_returns_to_start() {
        let mut camera = Camera::from_components(1.0, 2.0, 3.0, 0.0, 1.0, 0.0, 30.0, 20.0);
        let start = camera.position;

        camera.process_keyboard(CameraMovement::Forward, 0.37);
        camera.process_keyboard(CameraMovement::Backward, 0.37);

        assert_near(camera.position.to_vec(), start.to_vec());
    }

    #[test]
    fn strafing_moves_along_right_only() {
        let mut camera = Camera::default();
        camera.process_keyboard(CameraMovement::Right, 2.0);
        assert_near(camera.position.to_vec(), Vector3::new(SPEED * 2.0, 0.0, 0.0));

        camera.process_keyboard(CameraMovement::Left, 2.0);
        assert_near(camera.position.to_vec(), Vector3::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn basis_is_orthonormal_across_clamp_range() {
        let mut yaw = -180.0;
        while yaw <= 180.0 {
            let mut pitch = -89.0;
            while pitch <= 89.0 {
                let camera = Camera::from_components(0.0, 0.0, 0.0, 0.0, 1.0, 0.0, yaw, pitch);
                assert_orthonormal(&camera);
                pitch += 8.9;
            }
            yaw += 15.0;
        }
    }

    #[test]
    fn basis_stays_unit_length_near_the_pole() {
        let camera = Camera::from_components(0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 10.0, 88.9);
        assert!((camera.right().magnitude() - 1.0).abs() < EPS);
        assert!((camera.up().magnitude() - 1.0).abs() < EPS);
    }

    #[test]
    fn pitch_is_clamped_when_constrained() {
        let mut camera = Camera::default();
        for _ in 0..50 {
            camera.process_mouse_movement(3.0, 250.0, true);
            assert!(camera.pitch().0 <= PITCH_LIMIT);
        }
        assert_eq!(camera.pitch(), Deg(PITCH_LIMIT));

        for _ in 0..50 {
            camera.process_mouse_movement(-7.0, -400.0, true);
            assert!(camera.pitch().0 >= -PITCH_LIMIT);
        }
        assert_eq!(camera.pitch(), Deg(-PITCH_LIMIT));
        assert_orthonormal(&camera);
    }

    #[test]
    fn pitch_is_free_when_unconstrained() {
        let mut camera = Camera::default();
        camera.process_mouse_movement(0.0, 1000.0, false);
        assert!((camera.pitch().0 - 100.0).abs() < EPS);
    }

    #[test]
    fn look_adjustment_scales_by_sensitivity() {
        let mut camera = Camera::default();
        camera.mouse_sensitivity = 0.5;
        camera.process_mouse_movement(180.0, 0.0, true);

        assert!((camera.yaw().0 - 0.0).abs() < EPS);
        assert_near(camera.front(), Vector3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn zoom_stays_in_range() {
        let mut camera = Camera::default();
        for offset in [3.0, 10.0, 50.0, -2.0, -100.0, 0.5, 44.0] {
            camera.process_mouse_scroll(offset);
            assert!(camera.zoom().0 >= MIN_ZOOM && camera.zoom().0 <= MAX_ZOOM);
        }
        camera.process_mouse_scroll(100.0);
        assert_eq!(camera.zoom(), Deg(MIN_ZOOM));
        camera.process_mouse_scroll(-100.0);
        assert_eq!(camera.zoom(), Deg(MAX_ZOOM));
    }

    #[test]
    fn view_matrix_maps_look_target_onto_negative_z() {
        let camera = Camera::new((0.0, 0.0, 3.0), Vector3::unit_y(), YAW, PITCH);
        let view = camera.view_matrix();

        let eye = view.transform_point(camera.position);
        assert_near(eye.to_vec(), Vector3::new(0.0, 0.0, 0.0));

        let ahead = view.transform_point(Point3::new(0.0, 0.0, 0.0));
        assert_near(ahead.to_vec(), Vector3::new(0.0, 0.0, -3.0));
    }

    #[test]
    fn uniform_tracks_camera_position() {
        let camera = Camera::new((1.0, 2.0, 3.0), Vector3::unit_y(), YAW, PITCH);
        let projection = Projection::new(800, 600, 0.1, 100.0);
        let mut uniform = CameraUniform::new();

        uniform.update_view_proj(&camera, &projection);

        assert_eq!(uniform.view_position, [1.0, 2.0, 3.0, 1.0]);
        assert!((projection.aspect() - 800.0 / 600.0).abs() < EPS);
    }
}
