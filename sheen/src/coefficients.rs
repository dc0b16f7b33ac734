use glam::Vec3;

use crate::{gpu, Slot};

/// Handle to the coefficients produced by the latest frame; they stay where
/// the pipeline wrote them, so that shading can read them directly.
#[derive(Debug)]
pub struct CurrentCoefficients<'a, B> {
    pub buffer: &'a B,

    /// Slot of the double-buffered pair `buffer` comes from.
    pub slot: Slot,

    /// Number of bands; the buffer starts with `order²` RGB triples.
    pub order: u32,
}

impl<B> CurrentCoefficients<'_, B> {
    pub fn len(&self) -> usize {
        (self.order * self.order) as usize
    }
}

/// Host-side copy of a normalized SH projection.
#[derive(Clone, Debug, PartialEq)]
pub struct ShCoefficients {
    order: u32,
    values: Vec<Vec3>,
}

impl ShCoefficients {
    pub fn new(order: u32, values: Vec<Vec3>) -> Self {
        assert_eq!((order * order) as usize, values.len());

        Self { order, values }
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[Vec3] {
        &self.values
    }

    /// Returns coefficient `(l, m)`, where `-l <= m <= l`.
    pub fn get(&self, l: u32, m: i32) -> Option<Vec3> {
        if l >= self.order || m.unsigned_abs() > l {
            return None;
        }

        self.values.get(gpu::sh_index(l, m)).copied()
    }

    /// Reconstructs radiance coming from given direction.
    pub fn evaluate(&self, dir: Vec3) -> Vec3 {
        let basis = gpu::sh_basis(dir.normalize(), self.order);

        self.values
            .iter()
            .zip(basis)
            .map(|(&value, basis)| value * basis)
            .sum()
    }
}
