//! Adjacent moves within an ordered list

use serde::{Deserialize, Serialize};

/// Direction of a single-step move, in read order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    /// Towards the start of the list
    Up,
    /// Towards the end of the list
    Down,
}

/// Position of `id` and the neighbour it swaps with
///
/// `None` when `id` is absent or already at the boundary.
#[must_use]
pub fn move_target<T, K, F>(items: &[T], id: &K, direction: MoveDirection, id_of: F) -> Option<(usize, usize)>
where
    K: PartialEq + ?Sized,
    F: Fn(&T) -> &K,
{
    let from = items.iter().position(|item| id_of(item) == id)?;
    let to = match direction {
        MoveDirection::Up => from.checked_sub(1)?,
        MoveDirection::Down => Some(from + 1).filter(|&to| to < items.len())?,
    };
    Some((from, to))
}

/// Swap the item identified by `id` with its neighbour
///
/// Returns the reordered list, or `None` when the move is a no-op (first item
/// moved up, last item moved down, or `id` not present).
#[must_use]
pub fn move_within_list<T, K, F>(items: &[T], id: &K, direction: MoveDirection, id_of: F) -> Option<Vec<T>>
where
    T: Clone,
    K: PartialEq + ?Sized,
    F: Fn(&T) -> &K,
{
    let (from, to) = move_target(items, id, direction, id_of)?;
    let mut reordered = items.to_vec();
    reordered.swap(from, to);
    Some(reordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn abc() -> Vec<&'static str> {
        vec!["A", "B", "C"]
    }

    fn ident<'a>(item: &'a &'static str) -> &'a str {
        item
    }

    #[test]
    fn first_item_cannot_move_up() {
        assert_eq!(move_within_list(&abc(), "A", MoveDirection::Up, ident), None);
    }

    #[test]
    fn last_item_cannot_move_down() {
        assert_eq!(move_within_list(&abc(), "C", MoveDirection::Down, ident), None);
    }

    #[test]
    fn middle_item_moves_up() {
        assert_eq!(
            move_within_list(&abc(), "B", MoveDirection::Up, ident),
            Some(vec!["B", "A", "C"])
        );
    }

    #[test]
    fn middle_item_moves_down() {
        assert_eq!(
            move_within_list(&abc(), "B", MoveDirection::Down, ident),
            Some(vec!["A", "C", "B"])
        );
    }

    #[test]
    fn unknown_item_is_noop() {
        assert_eq!(move_within_list(&abc(), "Z", MoveDirection::Up, ident), None);
        assert_eq!(move_target(&abc(), "B", MoveDirection::Down, ident), Some((1, 2)));
    }

    proptest! {
        #[test]
        fn prop_move_is_permutation(len in 1..50usize, pick in any::<usize>(), up in any::<bool>()) {
            let items: Vec<usize> = (0..len).collect();
            let target = pick % len;
            let direction = if up { MoveDirection::Up } else { MoveDirection::Down };

            match move_within_list(&items, &target, direction, |i| i) {
                None => prop_assert!(
                    (up && target == 0) || (!up && target == len - 1)
                ),
                Some(moved) => {
                    let mut sorted = moved.clone();
                    sorted.sort_unstable();
                    prop_assert_eq!(sorted, items);
                    let differing = moved.iter().enumerate().filter(|(i, v)| *i != **v).count();
                    prop_assert_eq!(differing, 2);
                }
            }
        }
    }
}
