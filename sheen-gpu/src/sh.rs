use core::f32::consts::{PI, SQRT_2};

use glam::Vec3;

use crate::{SH_MAX_COEFFS, SH_MAX_ORDER};

/// Returns index of coefficient `(l, m)`, where `-l <= m <= l`.
pub fn sh_index(l: u32, m: i32) -> usize {
    ((l * (l + 1)) as i32 + m) as usize
}

/// Evaluates real spherical-harmonic basis functions of the first `order`
/// bands at given direction.
///
/// Coefficient `(l, m)` lands at [`sh_index()`]; entries past `order²` are
/// left zeroed. The basis follows the graphics convention (no Condon-Shortley
/// phase), so e.g. `Y(1, -1) = 0.488603 y` and `Y(1, 1) = 0.488603 x`.
pub fn sh_basis(dir: Vec3, order: u32) -> [f32; SH_MAX_COEFFS] {
    let mut out = [0.0; SH_MAX_COEFFS];
    let order = order.min(SH_MAX_ORDER);

    let cos_theta = dir.z.clamp(-1.0, 1.0);
    let phi = dir.y.atan2(dir.x);

    for l in 0..order {
        out[sh_index(l, 0)] = normalization(l, 0) * legendre(l, 0, cos_theta);

        for m in 1..=l {
            let k = SQRT_2 * normalization(l, m) * legendre(l, m, cos_theta);
            let (sin, cos) = (m as f32 * phi).sin_cos();

            out[sh_index(l, m as i32)] = k * cos;
            out[sh_index(l, -(m as i32))] = k * sin;
        }
    }

    out
}

/// Associated Legendre polynomial `P(l, m, x)`, evaluated with the usual
/// upward recurrence in `l`.
fn legendre(l: u32, m: u32, x: f32) -> f32 {
    let mut pmm = 1.0;

    if m > 0 {
        let somx2 = ((1.0 - x) * (1.0 + x)).max(0.0).sqrt();
        let mut fact = 1.0;

        for _ in 0..m {
            pmm *= fact * somx2;
            fact += 2.0;
        }
    }

    if l == m {
        return pmm;
    }

    let mut pmmp1 = x * (2 * m + 1) as f32 * pmm;

    if l == m + 1 {
        return pmmp1;
    }

    let mut pll = 0.0;

    for ll in (m + 2)..=l {
        pll = ((2 * ll - 1) as f32 * x * pmmp1 - (ll + m - 1) as f32 * pmm)
            / (ll - m) as f32;

        pmm = pmmp1;
        pmmp1 = pll;
    }

    pll
}

/// Normalization constant `K(l, m)`.
fn normalization(l: u32, m: u32) -> f32 {
    let ratio = factorial(l - m) / factorial(l + m);

    ((2 * l + 1) as f32 * ratio / (4.0 * PI)).sqrt()
}

fn factorial(n: u32) -> f32 {
    (1..=n).fold(1.0, |acc, i| acc * i as f32)
}
