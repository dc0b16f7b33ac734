//! Host-side versions of the kernels; each function walks the dispatched
//! workgroups and their lanes the same way the WGSL kernels do.

use glam::{vec2, UVec3, Vec3};

use super::CpuCubemap;
use crate::gpu::{self, CubeTexel};

pub fn generate_radiance(
    source_a: &CpuCubemap,
    source_b: &CpuCubemap,
    radiance: &mut CpuCubemap,
    params: gpu::RadiancePassParams,
    groups: UVec3,
) {
    let size = params.face_size;
    let tile = gpu::RADIANCE_TILE_SIZE;

    for face in 0..groups.z {
        for group_y in 0..groups.y {
            for group_x in 0..groups.x {
                for lane in 0..(tile * tile) {
                    let x = group_x * tile + lane % tile;
                    let y = group_y * tile + lane / tile;

                    if x >= size || y >= size {
                        continue;
                    }

                    let uv = vec2(
                        (x as f32 + 0.5) / size as f32,
                        (y as f32 + 0.5) / size as f32,
                    );

                    let a = source_a.sample(face, uv);
                    let b = source_b.sample(face, uv);
                    let texel = CubeTexel { face, x, y };

                    radiance.set(texel, a.lerp(b, params.blend));
                }
            }
        }
    }
}

pub fn project(
    radiance: &CpuCubemap,
    coefficients: &mut [Vec3],
    weights: &mut [f32],
    params: gpu::ProjectionPassParams,
    group_size: u32,
    groups: UVec3,
) {
    let size = params.face_size;
    let bands = params.band_count() as usize;
    let texel_count = params.texel_count();

    for group in 0..groups.x {
        let mut sums = [Vec3::ZERO; gpu::SH_MAX_COEFFS];
        let mut weight = 0.0;

        for lane in 0..group_size {
            let index = group * group_size + lane;

            if index >= texel_count {
                continue;
            }

            let texel = CubeTexel::from_index(index, size);
            let texel_weight = texel.solid_angle(size);
            let basis = gpu::sh_basis(texel.direction(size), params.order);

            let value =
                radiance.get(texel) * (texel_weight * gpu::SPHERE_SOLID_ANGLE);

            for (sum, basis) in sums.iter_mut().zip(basis).take(bands) {
                *sum += value * basis;
            }

            weight += texel_weight;
        }

        let offset = group as usize * bands;

        coefficients[offset..][..bands].copy_from_slice(&sums[..bands]);
        weights[group as usize] = weight;
    }
}

pub fn reduce(
    (src_coefficients, src_weights): (&[Vec3], &[f32]),
    (dst_coefficients, dst_weights): (&mut [Vec3], &mut [f32]),
    params: gpu::ReductionPassParams,
    group_size: u32,
    groups: UVec3,
) {
    let bands = params.band_count() as usize;

    for group in 0..groups.x {
        for band in 0..(groups.y as usize) {
            let mut sum = Vec3::ZERO;
            let mut weight = 0.0;

            for lane in 0..group_size {
                let index = group * group_size + lane;

                if index >= params.count {
                    continue;
                }

                sum += src_coefficients[index as usize * bands + band];

                if band == 0 {
                    weight += src_weights[index as usize];
                }
            }

            dst_coefficients[group as usize * bands + band] = sum;

            if band == 0 {
                dst_weights[group as usize] = weight;
            }
        }
    }
}

/// Returns the total weight if it was valid, or `Err` with it otherwise.
pub fn normalize(
    (src_coefficients, src_weights): (&[Vec3], &[f32]),
    (dst_coefficients, dst_weights): (&mut [Vec3], &mut [f32]),
    status: &mut u32,
    params: gpu::NormalizationPassParams,
    group_size: u32,
    groups: UVec3,
) -> Result<f32, f32> {
    let bands = params.band_count();
    let total_weight = src_weights[0];
    let is_valid = gpu::is_valid_weight(total_weight);

    for group in 0..groups.x {
        for lane in 0..group_size {
            let band = group * group_size + lane;

            if band >= bands {
                continue;
            }

            dst_coefficients[band as usize] = if is_valid {
                src_coefficients[band as usize] / total_weight
            } else {
                Vec3::ZERO
            };
        }
    }

    if is_valid {
        dst_weights[0] = 1.0;
        *status = gpu::AGGREGATE_VALID;

        Ok(total_weight)
    } else {
        dst_weights[0] = 0.0;
        *status = gpu::AGGREGATE_INVALID;

        Err(total_weight)
    }
}
