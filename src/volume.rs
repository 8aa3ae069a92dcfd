use crate::{Error, Result};

/// An n-dimensional array of labels held in memory.
///
/// Values are stored flat in C order (last axis fastest).
/// Zero is background; any positive value identifies an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledVolume {
    shape: Vec<u64>,
    values: Vec<u64>,
}

/// Number of elements in an array of `shape`.
pub(crate) fn num_elements(shape: &[u64]) -> Result<u64> {
    shape
        .iter()
        .try_fold(1u64, |acc, &n| acc.checked_mul(n))
        .ok_or_else(|| Error::general(format!("shape {shape:?} has too many elements")))
}

impl LabeledVolume {
    pub fn new(shape: Vec<u64>, values: Vec<u64>) -> Result<Self> {
        let expected = num_elements(&shape)?;
        if expected != values.len() as u64 {
            return Err(Error::ElementCount {
                shape,
                expected,
                actual: values.len(),
            });
        }
        Ok(Self { shape, values })
    }

    /// A volume of background only.
    pub fn zeros(shape: Vec<u64>) -> Result<Self> {
        let len = usize::try_from(num_elements(&shape)?).map_err(Error::wrap)?;
        Ok(Self {
            shape,
            values: vec![0; len],
        })
    }

    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    pub fn values(&self) -> &[u64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The largest label present; 0 for an empty volume.
    pub fn max_label(&self) -> u64 {
        self.values.iter().copied().max().unwrap_or(0)
    }

    /// Number of non-background elements.
    pub fn count_foreground(&self) -> usize {
        self.values.iter().filter(|&&v| v != 0).count()
    }

    /// Fail unless `other` has exactly this volume's shape.
    pub fn check_same_shape(&self, other: &LabeledVolume) -> Result<()> {
        if self.shape != other.shape {
            return Err(Error::ShapeMismatch {
                source_shape: self.shape.clone(),
                additional_shape: other.shape.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_element_count() {
        assert!(matches!(
            LabeledVolume::new(vec![2, 2], vec![1, 2, 3]),
            Err(Error::ElementCount { expected: 4, actual: 3, .. })
        ));
    }

    #[test]
    fn oversized_shape_is_an_error() {
        let shape = vec![u64::MAX, 2];
        assert!(matches!(num_elements(&shape), Err(Error::General(_))));
        assert!(LabeledVolume::new(shape.clone(), vec![]).is_err());
        assert!(LabeledVolume::zeros(shape).is_err());
        assert_eq!(num_elements(&[]).unwrap(), 1);
    }

    #[test]
    fn max_of_empty_volume_is_background() {
        let vol = LabeledVolume::new(vec![0, 4], vec![]).unwrap();
        assert_eq!(vol.max_label(), 0);
        assert!(vol.is_empty());
    }

    #[test]
    fn shape_check_reports_both_shapes() {
        let a = LabeledVolume::zeros(vec![2, 2]).unwrap();
        let b = LabeledVolume::zeros(vec![4]).unwrap();
        let err = a.check_same_shape(&b).unwrap_err();
        assert_eq!(
            err.to_string(),
            "volume shapes differ: source [2, 2], additional [4]"
        );
    }
}
