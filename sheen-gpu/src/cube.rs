use glam::{vec2, vec3, Vec2, Vec3};

use crate::CUBE_FACE_COUNT;

/// Returns the number of texels in a cubemap with faces of given size.
pub fn texel_count(face_size: u32) -> u32 {
    CUBE_FACE_COUNT * face_size * face_size
}

/// Like [`texel_count()`], but returns `None` if the count doesn't fit in a
/// `u32`.
pub fn checked_texel_count(face_size: u32) -> Option<u32> {
    CUBE_FACE_COUNT.checked_mul(face_size)?.checked_mul(face_size)
}

/// Texel of a cubemap, addressed by face (`+X, -X, +Y, -Y, +Z, -Z`) and
/// position within that face.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CubeTexel {
    pub face: u32,
    pub x: u32,
    pub y: u32,
}

impl CubeTexel {
    /// Maps a flat texel index (as dispatched by the projection kernel) into
    /// face + position; faces are laid out one after another, rows first.
    pub fn from_index(index: u32, face_size: u32) -> Self {
        let face_len = face_size * face_size;
        let face = index / face_len;
        let rem = index % face_len;

        Self {
            face,
            x: rem % face_size,
            y: rem / face_size,
        }
    }

    pub fn index(&self, face_size: u32) -> u32 {
        self.face * face_size * face_size + self.y * face_size + self.x
    }

    /// Returns texel's center in face-space, `-1.0 ..= 1.0` on both axes.
    pub fn uv(&self, face_size: u32) -> Vec2 {
        let size = face_size as f32;

        vec2(
            2.0 * (self.x as f32 + 0.5) / size - 1.0,
            2.0 * (self.y as f32 + 0.5) / size - 1.0,
        )
    }

    /// Returns the normalized direction pointing at texel's center.
    pub fn direction(&self, face_size: u32) -> Vec3 {
        face_direction(self.face, self.uv(face_size))
    }

    /// Returns the solid angle subtended by this texel.
    ///
    /// This is the exact integral of the cube-face Jacobian
    /// `(1 + u² + v²)^(-3/2)` over texel's footprint, so the solid angles of
    /// all texels sum up to `4π` regardless of the resolution.
    pub fn solid_angle(&self, face_size: u32) -> f32 {
        let step = 2.0 / face_size as f32;
        let x0 = self.x as f32 * step - 1.0;
        let y0 = self.y as f32 * step - 1.0;
        let x1 = x0 + step;
        let y1 = y0 + step;

        area_element(x0, y0) - area_element(x0, y1) - area_element(x1, y0)
            + area_element(x1, y1)
    }
}

/// Converts face-space coordinates into a direction, following the usual
/// D3D / Vulkan / WebGPU cubemap convention (`v` grows downwards).
pub fn face_direction(face: u32, uv: Vec2) -> Vec3 {
    let (u, v) = (uv.x, uv.y);

    let dir = match face {
        0 => vec3(1.0, -v, -u),
        1 => vec3(-1.0, -v, u),
        2 => vec3(u, 1.0, v),
        3 => vec3(u, -1.0, -v),
        4 => vec3(u, -v, 1.0),
        _ => vec3(-u, -v, -1.0),
    };

    dir.normalize()
}

fn area_element(x: f32, y: f32) -> f32 {
    (x * y).atan2((x * x + y * y + 1.0).sqrt())
}
