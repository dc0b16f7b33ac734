use crate::{Error, Result};

/// Per-frame selection of the two environment sources and the factor they're
/// interpolated with.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BlendState {
    /// Index of the source blended from; the one blended into is the next one,
    /// wrapping around.
    pub probe: usize,

    /// Interpolation factor, `0.0 ..= 1.0`.
    pub blend: f32,
}

impl BlendState {
    /// Derives the blend state at given time: every `period` seconds the
    /// probe advances by one source, and between the advancements the blend
    /// factor sweeps from 0 to 1.
    pub fn at(time: f64, period: f64, source_count: usize) -> Result<Self> {
        if source_count == 0 {
            return Err(Error::NoSources);
        }

        if !(time.is_finite() && time >= 0.0) {
            return Err(Error::InvalidTime(time));
        }

        let t = time / period;
        let step = t.floor();

        let blend = if source_count > 1 {
            (t - step) as f32
        } else {
            0.0
        };

        Ok(Self {
            probe: (step as u64 % source_count as u64) as usize,
            blend,
        })
    }

    /// Returns indices of the two sources taking part in the blend.
    pub fn sources(&self, source_count: usize) -> [usize; 2] {
        [self.probe, (self.probe + 1) % source_count]
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn progression() {
        let state = BlendState::at(0.0, 3.0, 5).unwrap();

        assert_eq!(0, state.probe);
        assert_relative_eq!(0.0, state.blend);

        let state = BlendState::at(1.5, 3.0, 5).unwrap();

        assert_eq!(0, state.probe);
        assert_relative_eq!(0.5, state.blend);
        assert_eq!([0, 1], state.sources(5));

        let state = BlendState::at(7.5, 3.0, 5).unwrap();

        assert_eq!(2, state.probe);
        assert_relative_eq!(0.5, state.blend);
    }

    #[test]
    fn wraps_around() {
        let state = BlendState::at(14.25, 3.0, 5).unwrap();

        assert_eq!(4, state.probe);
        assert_relative_eq!(0.75, state.blend);
        assert_eq!([4, 0], state.sources(5));

        let state = BlendState::at(15.0, 3.0, 5).unwrap();

        assert_eq!(0, state.probe);
    }

    #[test]
    fn single_source() {
        let state = BlendState::at(4.5, 3.0, 1).unwrap();

        assert_eq!(0, state.probe);
        assert_relative_eq!(0.0, state.blend);
        assert_eq!([0, 0], state.sources(1));
    }

    #[test]
    fn invalid() {
        assert_eq!(Err(Error::NoSources), BlendState::at(1.0, 3.0, 0));
        assert_eq!(
            Err(Error::InvalidTime(-1.0)),
            BlendState::at(-1.0, 3.0, 2)
        );

        assert!(BlendState::at(f64::INFINITY, 3.0, 2).is_err());
    }
}
