use crate::{gpu, Error, Result};

/// Parameters of a light probe, fixed at initialization (except for `order`,
/// which can be later changed through [`crate::LightProbe::set_order()`]).
#[derive(Clone, Debug, PartialEq)]
pub struct ProbeConfig {
    /// Edge length of a single face of the radiance cubemap.
    pub face_size: u32,

    /// Number of partial sums combined by a single reduction workgroup.
    pub group_size: u32,

    /// Maximum number of SH bands; buffers are allocated for this many.
    pub max_order: u32,

    /// Number of SH bands computed each frame.
    pub order: u32,

    /// Time (in seconds) it takes to blend from one environment source into
    /// the next one.
    pub period: f64,
}

impl ProbeConfig {
    pub fn with_face_size(mut self, face_size: u32) -> Self {
        self.face_size = face_size;
        self
    }

    pub fn with_group_size(mut self, group_size: u32) -> Self {
        self.group_size = group_size;
        self
    }

    pub fn with_max_order(mut self, max_order: u32) -> Self {
        self.max_order = max_order;
        self
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    pub fn with_period(mut self, period: f64) -> Self {
        self.period = period;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.face_size == 0 {
            return Err(Error::InvalidFaceSize);
        }

        // With a single-lane group the reduction would never shrink
        if self.group_size < 2 {
            return Err(Error::InvalidGroupSize(self.group_size));
        }

        if self.max_order == 0 || self.max_order > gpu::SH_MAX_ORDER {
            return Err(Error::InvalidMaxOrder {
                max_order: self.max_order,
                limit: gpu::SH_MAX_ORDER,
            });
        }

        // Texels and coefficient entries are addressed with 32-bit indices
        let coefficient_count = gpu::checked_texel_count(self.face_size)
            .map(|texels| texels.div_ceil(self.group_size))
            .and_then(|groups| {
                groups.checked_mul(self.max_order * self.max_order)
            });

        if coefficient_count.is_none() {
            return Err(Error::FaceSizeTooLarge(self.face_size));
        }

        self.validate_order(self.order)?;

        if !(self.period.is_finite() && self.period > 0.0) {
            return Err(Error::InvalidPeriod(self.period));
        }

        Ok(())
    }

    pub(crate) fn validate_order(&self, order: u32) -> Result<()> {
        if order == 0 || order > self.max_order {
            return Err(Error::OrderOutOfRange {
                order,
                max_order: self.max_order,
            });
        }

        Ok(())
    }

    pub(crate) fn describe(&self) -> String {
        format!(
            "face_size={}, group_size={}, order={}/{}, period={}s",
            self.face_size,
            self.group_size,
            self.order,
            self.max_order,
            self.period
        )
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            face_size: gpu::SH_FACE_SIZE,
            group_size: gpu::SH_GROUP_SIZE,
            max_order: gpu::SH_MAX_ORDER,
            order: 3,
            period: 3.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert_eq!(Ok(()), ProbeConfig::default().validate());
    }

    #[test]
    fn invalid() {
        let config = ProbeConfig::default;

        assert_eq!(
            Err(Error::InvalidFaceSize),
            config().with_face_size(0).validate()
        );

        assert_eq!(
            Err(Error::InvalidGroupSize(1)),
            config().with_group_size(1).validate()
        );

        assert_eq!(
            Err(Error::InvalidMaxOrder {
                max_order: 7,
                limit: 6
            }),
            config().with_max_order(7).validate()
        );

        assert_eq!(
            Err(Error::OrderOutOfRange {
                order: 5,
                max_order: 4
            }),
            config().with_max_order(4).with_order(5).validate()
        );

        assert_eq!(
            Err(Error::OrderOutOfRange {
                order: 0,
                max_order: 6
            }),
            config().with_order(0).validate()
        );

        assert_eq!(
            Err(Error::InvalidPeriod(0.0)),
            config().with_period(0.0).validate()
        );

        assert!(config().with_period(f64::NAN).validate().is_err());
    }

    #[test]
    fn too_large_face_size() {
        let config = ProbeConfig::default;

        // 6 * 30000² texels don't fit in a u32
        assert_eq!(
            Err(Error::FaceSizeTooLarge(30000)),
            config().with_face_size(30000).validate()
        );

        // The texels do fit, but 36 coefficients per group don't
        assert_eq!(
            Err(Error::FaceSizeTooLarge(26000)),
            config().with_face_size(26000).validate()
        );

        assert_eq!(
            Ok(()),
            config()
                .with_face_size(26000)
                .with_max_order(1)
                .with_order(1)
                .validate()
        );

        assert_eq!(
            Err(Error::FaceSizeTooLarge(u32::MAX)),
            config().with_face_size(u32::MAX).validate()
        );
    }
}
