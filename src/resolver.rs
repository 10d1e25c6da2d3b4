//! Containment resolution.
//!
//! Anchors mark where sections start. An entry belongs to the latest
//! starting section whose start is not after the entry, so resolution is a
//! floor search over a file's sorted anchors. When the entry precedes every
//! anchor the first anchor is used; when the file has no anchors the empty
//! key is returned and the caller treats it as "no section known".

use crate::tree::{Anchor, Position};

/// Resolve the containing node key with a binary search.
///
/// `anchors` must be sorted ascending by position. Among anchors sharing a
/// position the last one in slice order wins, matching
/// [`resolve_linear`] exactly.
pub fn resolve(anchors: &[Anchor], position: Position) -> &str {
    let Some(first) = anchors.first() else {
        return "";
    };

    // Count of anchors starting at or before `position`.
    let at_or_before = anchors.partition_point(|a| a.position <= position);

    match at_or_before {
        0 => &first.key,
        n => &anchors[n - 1].key,
    }
}

/// Reference resolver: scan from the end for the first anchor at or before
/// `position`.
pub fn resolve_linear(anchors: &[Anchor], position: Position) -> &str {
    let Some(first) = anchors.first() else {
        return "";
    };

    anchors
        .iter()
        .rev()
        .find(|a| a.position <= position)
        .unwrap_or(first)
        .key
        .as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn anchors(points: &[(&str, u32, u32)]) -> Vec<Anchor> {
        points
            .iter()
            .map(|(key, page, entry)| Anchor::new(*key, Position::new(*page, *entry)))
            .collect()
    }

    #[test]
    fn test_section_examples() {
        let a = anchors(&[("root", 0, 0), ("sec1", 0, 5), ("sec2", 2, 0)]);

        assert_eq!(resolve(&a, Position::new(1, 2)), "sec1");
        assert_eq!(resolve(&a, Position::new(0, 0)), "root");
        assert_eq!(resolve(&a, Position::new(3, 0)), "sec2");
        assert_eq!(resolve(&a, Position::new(0, 4)), "root");
        assert_eq!(resolve(&a, Position::new(0, 5)), "sec1");
        assert_eq!(resolve(&a, Position::new(2, 0)), "sec2");
    }

    #[test]
    fn test_empty_anchor_set() {
        assert_eq!(resolve(&[], Position::new(0, 0)), "");
        assert_eq!(resolve_linear(&[], Position::new(7, 1)), "");
    }

    #[test]
    fn test_position_before_every_anchor_falls_back_to_first() {
        let a = anchors(&[("intro", 1, 3), ("body", 4, 0)]);
        assert_eq!(resolve(&a, Position::new(0, 9)), "intro");
        assert_eq!(resolve(&a, Position::new(1, 2)), "intro");
        assert_eq!(resolve_linear(&a, Position::new(0, 0)), "intro");
    }

    #[test]
    fn test_equal_positions_pick_last_in_order() {
        let a = anchors(&[("vagga", 0, 0), ("sutta", 0, 0), ("next", 3, 1)]);
        assert_eq!(resolve(&a, Position::new(0, 0)), "sutta");
        assert_eq!(resolve_linear(&a, Position::new(0, 0)), "sutta");
        assert_eq!(resolve(&a, Position::new(2, 99)), "sutta");
    }

    #[test]
    fn test_keys_never_go_backward() {
        let a = anchors(&[("a", 0, 0), ("b", 0, 3), ("c", 1, 1), ("d", 4, 0)]);
        let order = |key: &str| a.iter().position(|x| x.key == key).unwrap();

        let mut last = 0;
        for page in 0..6 {
            for entry in 0..5 {
                let idx = order(resolve(&a, Position::new(page, entry)));
                assert!(idx >= last);
                last = idx;
            }
        }
    }

    fn sorted_anchor_set() -> impl Strategy<Value = Vec<Anchor>> {
        prop::collection::vec((0u32..8, 0u32..8), 0..24).prop_map(|mut points| {
            points.sort();
            points
                .into_iter()
                .enumerate()
                .map(|(i, (page, entry))| Anchor::new(format!("n{}", i), Position::new(page, entry)))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn binary_search_matches_linear_scan(
            anchors in sorted_anchor_set(),
            queries in prop::collection::vec((0u32..10, 0u32..10), 1..32),
        ) {
            for (page, entry) in queries {
                let q = Position::new(page, entry);
                prop_assert_eq!(resolve(&anchors, q), resolve_linear(&anchors, q));
            }
        }

        #[test]
        fn resolves_to_greatest_anchor_at_or_before(
            anchors in sorted_anchor_set(),
            page in 0u32..10,
            entry in 0u32..10,
        ) {
            let q = Position::new(page, entry);
            let key = resolve(&anchors, q);

            match anchors.iter().rposition(|a| a.position <= q) {
                Some(idx) => prop_assert_eq!(key, anchors[idx].key.as_str()),
                None if anchors.is_empty() => prop_assert_eq!(key, ""),
                None => prop_assert_eq!(key, anchors[0].key.as_str()),
            }
        }
    }
}
