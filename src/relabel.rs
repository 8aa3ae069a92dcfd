use std::collections::BTreeMap;

/// Result of [`relabel_consecutive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relabeling {
    pub values: Vec<u64>,
    /// Largest label assigned; `None` if nothing was relabelled.
    pub max_label: Option<u64>,
    /// Original label to assigned label.
    pub mapping: BTreeMap<u64, u64>,
}

impl Relabeling {
    /// Number of distinct labels which were assigned.
    pub fn num_labels(&self) -> usize {
        self.mapping.len()
    }
}

/// Renumber the distinct values of `values` to `start_label, start_label + 1, ...`.
///
/// Assignment follows the ascending order of the original values,
/// so relative order between labels is preserved.
/// With `keep_zeros`, background stays 0 and is not counted as a label.
pub fn relabel_consecutive(values: &[u64], start_label: u64, keep_zeros: bool) -> Relabeling {
    let mut mapping: BTreeMap<u64, u64> = values
        .iter()
        .filter(|&&v| !(keep_zeros && v == 0))
        .map(|&v| (v, 0))
        .collect();
    for (new, assigned) in (start_label..).zip(mapping.values_mut()) {
        *assigned = new;
    }

    let values = values
        .iter()
        .map(|v| match mapping.get(v) {
            Some(&new) => new,
            None => *v,
        })
        .collect();
    let max_label = mapping.values().next_back().copied();
    log::debug!(
        "relabelled {} distinct labels starting at {start_label}",
        mapping.len()
    );
    Relabeling {
        values,
        max_label,
        mapping,
    }
}

/// Replace every background (zero) value with `label`.
pub fn fill_background(values: &mut [u64], label: u64) {
    for v in values.iter_mut().filter(|v| **v == 0) {
        *v = label;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_zeros_and_orders_labels() {
        let r = relabel_consecutive(&[0, 40, 7, 40, 0, 9], 1, true);
        assert_eq!(r.values, vec![0, 3, 1, 3, 0, 2]);
        assert_eq!(r.max_label, Some(3));
        assert_eq!(r.num_labels(), 3);
        assert_eq!(r.mapping.get(&7), Some(&1));
        assert_eq!(r.mapping.get(&0), None);
    }

    #[test]
    fn relabels_zero_when_not_kept() {
        let r = relabel_consecutive(&[0, 5, 5], 10, false);
        assert_eq!(r.values, vec![10, 11, 11]);
        assert_eq!(r.max_label, Some(11));
    }

    #[test]
    fn all_background_has_no_labels() {
        let r = relabel_consecutive(&[0, 0, 0], 1, true);
        assert_eq!(r.values, vec![0, 0, 0]);
        assert_eq!(r.max_label, None);
        assert!(r.mapping.is_empty());
    }

    #[test]
    fn empty_input() {
        let r = relabel_consecutive(&[], 1, true);
        assert!(r.values.is_empty());
        assert_eq!(r.max_label, None);
    }

    #[test]
    fn fills_only_background() {
        let mut v = vec![0, 1, 0, 3];
        fill_background(&mut v, 7);
        assert_eq!(v, vec![7, 1, 7, 3]);
    }
}
