//! Simplex repair of information sets.
//!
//! After the decision rule has run, an information set whose probabilities
//! do not sum to one is a decision point the opponent's last realized path
//! never visited. Such a group gets a random point of the probability
//! simplex instead.

use rand::Rng;

use crate::engine::error::Mismatch;
use crate::engine::game::StrategyRequest;

/// Random probability vector of length `len` that sums to one.
///
/// Every entry but the last is drawn uniformly from `[0, 1)`, redrawing any
/// value that would push the running sum to one or beyond; the last entry
/// takes what is left. The result lies on the simplex but is not uniform
/// over it.
pub fn random_simplex_point<R: Rng>(len: usize, rng: &mut R) -> Vec<f64> {
    if len == 0 {
        return Vec::new();
    }

    let mut values = Vec::with_capacity(len);
    let mut sum = 0.0;
    for _ in 0..len - 1 {
        let mut value: f64 = rng.gen();
        while sum + value >= 1.0 {
            value = rng.gen();
        }
        sum += value;
        values.push(value);
    }
    values.push(1.0 - sum);
    values
}

/// Split `labels` into consecutive groups of the given sizes.
///
/// Fails when the labels run out before the sizes do, or when labels are
/// left over after the last group.
pub fn group_labels<'a>(labels: &'a [String], sizes: &[usize]) -> Result<Vec<&'a [String]>, Mismatch> {
    let mut groups = Vec::with_capacity(sizes.len());
    let mut rest = labels;

    for (group, &size) in sizes.iter().enumerate() {
        if rest.len() < size {
            return Err(Mismatch::LabelsExhausted {
                group,
                expected: size,
                found: rest.len(),
            });
        }
        let (head, tail) = rest.split_at(size);
        groups.push(head);
        rest = tail;
    }

    if !rest.is_empty() {
        return Err(Mismatch::UnconsumedLabels { count: rest.len() });
    }
    Ok(groups)
}

/// Regenerate every information set of `request` that does not sum to one
/// within `tolerance`.
///
/// Returns the number of groups regenerated.
pub fn repair<S, R>(
    request: &mut S,
    sizes: &[usize],
    tolerance: f64,
    rng: &mut R,
) -> Result<usize, Mismatch>
where
    S: StrategyRequest,
    R: Rng,
{
    let labels = request.labels();
    let groups = group_labels(&labels, sizes)?;
    let mut repaired = 0;

    for group in groups {
        if group.is_empty() {
            continue;
        }
        let sum: f64 = group
            .iter()
            .map(|label| request.probability(label).unwrap_or(0.0))
            .sum();
        if (sum - 1.0).abs() <= tolerance {
            continue;
        }

        let values = random_simplex_point(group.len(), rng);
        for (label, value) in group.iter().zip(values) {
            log::debug!("unexplored path: {label} -> {value:.4}");
            request.set_probability(label, value);
        }
        repaired += 1;
    }

    Ok(repaired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::prisoners::PrisonersRequest;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_random_point_is_on_simplex() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..10_000 {
            let point = random_simplex_point(3, &mut rng);
            assert_eq!(point.len(), 3);
            assert!(point.iter().all(|&p| (0.0..=1.0).contains(&p)), "{point:?}");
            assert!((point.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_degenerate_sizes() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(random_simplex_point(0, &mut rng).is_empty());
        assert_eq!(random_simplex_point(1, &mut rng), vec![1.0]);
    }

    #[test]
    fn test_group_labels_alignment() {
        let labels: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let groups = group_labels(&labels, &[2, 2]).unwrap();
        assert_eq!(groups[1], &labels[2..]);

        assert_eq!(
            group_labels(&labels, &[2, 3]),
            Err(Mismatch::LabelsExhausted {
                group: 1,
                expected: 3,
                found: 2
            })
        );
        assert_eq!(
            group_labels(&labels, &[3]),
            Err(Mismatch::UnconsumedLabels { count: 1 })
        );
    }

    #[test]
    fn test_repair_leaves_complete_groups_alone() {
        let mut request = PrisonersRequest::new(vec![
            "1:1:Cooperate".to_string(),
            "1:1:Defect".to_string(),
            "2:2:Cooperate".to_string(),
            "2:2:Defect".to_string(),
        ]);
        request.set_probability("1:1:Cooperate", 1.0);
        request.set_probability("1:1:Defect", 0.0);

        let mut rng = StdRng::seed_from_u64(3);
        let repaired = repair(&mut request, &[2, 2], 1e-9, &mut rng).unwrap();

        assert_eq!(repaired, 1);
        assert_eq!(request.probability("1:1:Cooperate"), Some(1.0));
        assert_eq!(request.probability("1:1:Defect"), Some(0.0));
        let second: f64 = ["2:2:Cooperate", "2:2:Defect"]
            .iter()
            .map(|l| request.probability(l).unwrap())
            .sum();
        assert!((second - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_repair_group_of_three_over_many_trials() {
        let labels: Vec<String> = ["1:1:Cooperate", "1:1:Defect", "1:1:Abstain"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut rng = StdRng::seed_from_u64(8);

        for _ in 0..10_000 {
            let mut request = PrisonersRequest::new(labels.clone());
            repair(&mut request, &[3], 1e-9, &mut rng).unwrap();
            let values: Vec<f64> = labels.iter().map(|l| request.probability(l).unwrap()).collect();
            assert!(values.iter().all(|&p| (0.0..=1.0).contains(&p)));
            assert!((values.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }
}
