/// Selects one of the two halves of a [`DoubleBuffered`] resource.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Slot {
    #[default]
    Zero,
    One,
}

impl Slot {
    pub fn flipped(self) -> Self {
        match self {
            Slot::Zero => Slot::One,
            Slot::One => Slot::Zero,
        }
    }

    pub fn flip(&mut self) {
        *self = self.flipped();
    }

    pub fn index(self) -> usize {
        match self {
            Slot::Zero => 0,
            Slot::One => 1,
        }
    }
}

/// Pair of equally-sized resources, used so that a pass can read the older
/// generation of some data while writing the newer one.
#[derive(Debug, Default)]
pub struct DoubleBuffered<T> {
    a: T,
    b: T,
}

impl<T> DoubleBuffered<T> {
    pub fn new(mut f: impl FnMut(Slot) -> T) -> Self {
        Self {
            a: f(Slot::Zero),
            b: f(Slot::One),
        }
    }

    pub fn get(&self, slot: Slot) -> &T {
        match slot {
            Slot::Zero => &self.a,
            Slot::One => &self.b,
        }
    }

    pub fn get_mut(&mut self, slot: Slot) -> &mut T {
        match slot {
            Slot::Zero => &mut self.a,
            Slot::One => &mut self.b,
        }
    }

    /// Returns the half at `src` for reading and the other one for writing.
    pub fn split(&mut self, src: Slot) -> (&T, &mut T) {
        match src {
            Slot::Zero => (&self.a, &mut self.b),
            Slot::One => (&self.b, &mut self.a),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flipping() {
        let mut slot = Slot::default();

        assert_eq!(Slot::Zero, slot);

        slot.flip();

        assert_eq!(Slot::One, slot);
        assert_eq!(1, slot.index());
        assert_eq!(Slot::Zero, slot.flipped());
    }

    #[test]
    fn split() {
        let mut target = DoubleBuffered::new(|slot| vec![slot.index(); 2]);
        let (src, dst) = target.split(Slot::One);

        assert_eq!(&vec![1, 1], src);

        dst[0] = 5;

        assert_eq!(&vec![5, 0], target.get(Slot::Zero));
        assert_eq!(&vec![1, 1], target.get(Slot::One));
    }
}
