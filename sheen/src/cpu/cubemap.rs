use glam::{Vec2, Vec3};

use crate::gpu::{self, CubeTexel};

/// Cubemap living in host memory, with RGB texels.
#[derive(Clone, Debug, PartialEq)]
pub struct CpuCubemap {
    size: u32,
    texels: Vec<Vec3>,
}

impl CpuCubemap {
    pub fn new(size: u32) -> Self {
        Self::uniform(size, Vec3::ZERO)
    }

    pub fn uniform(size: u32, color: Vec3) -> Self {
        Self {
            size,
            texels: vec![color; gpu::texel_count(size) as usize],
        }
    }

    /// Creates a cubemap by evaluating `f` for each texel (e.g. at
    /// [`CubeTexel::direction()`]).
    pub fn from_fn(size: u32, mut f: impl FnMut(CubeTexel) -> Vec3) -> Self {
        let texels = (0..gpu::texel_count(size))
            .map(|index| f(CubeTexel::from_index(index, size)))
            .collect();

        Self { size, texels }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn texels(&self) -> &[Vec3] {
        &self.texels
    }

    pub fn get(&self, texel: CubeTexel) -> Vec3 {
        self.texels[texel.index(self.size) as usize]
    }

    pub fn set(&mut self, texel: CubeTexel, value: Vec3) {
        let index = texel.index(self.size) as usize;

        self.texels[index] = value;
    }

    /// Samples given face with bilinear filtering and wrapping addressing;
    /// `uv` is in texture-space (`0.0 ..= 1.0`).
    pub fn sample(&self, face: u32, uv: Vec2) -> Vec3 {
        let size = self.size as i64;
        let pos = uv * self.size as f32 - 0.5;
        let base = pos.floor();
        let frac = pos - base;

        let texel = |dx: i64, dy: i64| {
            let x = (base.x as i64 + dx).rem_euclid(size) as u32;
            let y = (base.y as i64 + dy).rem_euclid(size) as u32;

            self.get(CubeTexel { face, x, y })
        };

        let top = texel(0, 0).lerp(texel(1, 0), frac.x);
        let bottom = texel(0, 1).lerp(texel(1, 1), frac.x);

        top.lerp(bottom, frac.y)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::{vec2, vec3};

    use super::*;

    #[test]
    fn sampling_texel_centers() {
        let target = CpuCubemap::from_fn(4, |texel| {
            vec3(texel.x as f32, texel.y as f32, texel.face as f32)
        });

        let actual = target.sample(3, vec2(2.5 / 4.0, 1.5 / 4.0));

        assert_relative_eq!(2.0, actual.x);
        assert_relative_eq!(1.0, actual.y);
        assert_relative_eq!(3.0, actual.z);
    }

    #[test]
    fn sampling_interpolates() {
        let target =
            CpuCubemap::from_fn(4, |texel| Vec3::splat(texel.x as f32));

        let actual = target.sample(0, vec2(2.0 / 4.0, 0.5));

        assert_relative_eq!(1.5, actual.x);
    }

    #[test]
    fn sampling_wraps() {
        let target =
            CpuCubemap::from_fn(4, |texel| Vec3::splat(texel.x as f32));

        // Halfway between the last and the first column
        let actual = target.sample(0, vec2(0.0, 0.5));

        assert_relative_eq!(1.5, actual.x);
    }
}
