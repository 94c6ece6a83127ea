//! Split candidate triples into unique and contested.

use super::CandidateSet;

/// Partition of a candidate set, by position in `CandidateSet::triples`.
///
/// The triples themselves are never copied or modified here; both lists
/// hold indices into the original candidate list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Triples whose primary has fan-out 1 and whose reference has fan-in 1.
    pub unique: Vec<usize>,
    /// Everything else.
    pub contested: Vec<usize>,
}

/// A triple is unique only when it is the sole candidate on both sides;
/// anything else may have to give up an endpoint to a closer competitor.
pub fn classify(set: &CandidateSet) -> Classification {
    let mut classification = Classification::default();
    for (idx, t) in set.triples.iter().enumerate() {
        if set.fan_out[t.primary_index] == 1 && set.fan_in[t.reference_index] == 1 {
            classification.unique.push(idx);
        } else {
            classification.contested.push(idx);
        }
    }
    classification
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::CandidateTriple;

    fn set_from(pairs: &[(usize, usize, f64)], n1: usize, n2: usize) -> CandidateSet {
        let mut set = CandidateSet {
            fan_out: vec![0; n1],
            fan_in: vec![0; n2],
            ..Default::default()
        };
        for &(p, r, s) in pairs {
            set.triples.push(CandidateTriple {
                primary_index: p,
                reference_index: r,
                separation: s,
            });
            set.fan_out[p] += 1;
            set.fan_in[r] += 1;
        }
        set.total_candidate_count = set.triples.len();
        set
    }

    #[test]
    fn sole_candidates_are_unique() {
        let set = set_from(&[(0, 0, 0.1), (1, 1, 0.2)], 2, 2);
        let c = classify(&set);
        assert_eq!(c.unique, vec![0, 1]);
        assert!(c.contested.is_empty());
    }

    #[test]
    fn shared_reference_is_contested() {
        // both primaries want reference 0; primary 2 is alone
        let set = set_from(&[(0, 0, 0.1), (1, 0, 0.2), (2, 1, 0.3)], 3, 2);
        let c = classify(&set);
        assert_eq!(c.unique, vec![2]);
        assert_eq!(c.contested, vec![0, 1]);
    }

    #[test]
    fn shared_primary_is_contested() {
        let set = set_from(&[(0, 0, 0.1), (0, 1, 0.2)], 1, 2);
        let c = classify(&set);
        assert!(c.unique.is_empty());
        assert_eq!(c.contested, vec![0, 1]);
    }

    #[test]
    fn chain_contests_every_link() {
        // p0-r0, p1-r0, p1-r1: p1 touches both references
        let set = set_from(&[(0, 0, 0.1), (1, 0, 0.2), (1, 1, 0.3)], 2, 2);
        let c = classify(&set);
        assert!(c.unique.is_empty());
        assert_eq!(c.contested.len(), 3);
    }
}
