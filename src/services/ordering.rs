//! Dense ordering shared by the job board and the record store.
//!
//! Both the optimistic path and the authoritative store call
//! [`move_by_order`], so the two sides always agree on how a move shifts
//! the jobs in between.

use crate::error::{Error, Result};
use crate::models::job::Job;

/// Something that carries a 1-based position.
pub trait Ordered {
    fn order(&self) -> i64;
    fn set_order(&mut self, order: i64);
}

impl Ordered for Job {
    fn order(&self) -> i64 {
        self.order
    }

    fn set_order(&mut self, order: i64) {
        self.order = order;
    }
}

/// True when `items[i].order() == i + 1` for every element, i.e. the orders
/// are exactly `1..=N` and the slice is sorted by them.
pub fn is_dense<T: Ordered>(items: &[T]) -> bool {
    items
        .iter()
        .enumerate()
        .all(|(idx, item)| item.order() == idx as i64 + 1)
}

/// Reassigns `order` as the 1-based index in the slice.
pub fn renumber<T: Ordered>(items: &mut [T]) {
    for (idx, item) in items.iter_mut().enumerate() {
        item.set_order(idx as i64 + 1);
    }
}

/// Checks a move against a collection of `len` densely ordered items.
pub fn check_move(len: usize, from_order: i64, to_order: i64) -> Result<()> {
    let len = len as i64;
    for (name, value) in [("from_order", from_order), ("to_order", to_order)] {
        if value < 1 || value > len {
            return Err(Error::InvariantViolation(format!(
                "{} {} is outside 1..={}",
                name, value, len
            )));
        }
    }
    Ok(())
}

/// Moves the item at position `from_order` to position `to_order` with
/// array-splice semantics and renumbers everything to `1..=N`.
///
/// `items` must already be dense and sorted. Returns `Ok(false)` without
/// touching anything when `from_order == to_order`. On error nothing is
/// modified.
pub fn move_by_order<T: Ordered>(items: &mut Vec<T>, from_order: i64, to_order: i64) -> Result<bool> {
    if !is_dense(items) {
        return Err(Error::InvariantViolation(
            "collection order is not dense".to_string(),
        ));
    }
    check_move(items.len(), from_order, to_order)?;
    if from_order == to_order {
        return Ok(false);
    }

    let moved = items.remove((from_order - 1) as usize);
    items.insert((to_order - 1) as usize, moved);
    renumber(items);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        name: &'static str,
        order: i64,
    }

    impl Ordered for Item {
        fn order(&self) -> i64 {
            self.order
        }

        fn set_order(&mut self, order: i64) {
            self.order = order;
        }
    }

    fn board(n: usize) -> Vec<Item> {
        const NAMES: [&str; 8] = ["J1", "J2", "J3", "J4", "J5", "J6", "J7", "J8"];
        NAMES[..n]
            .iter()
            .copied()
            .enumerate()
            .map(|(idx, name)| Item {
                name,
                order: idx as i64 + 1,
            })
            .collect()
    }

    fn names(items: &[Item]) -> Vec<&'static str> {
        items.iter().map(|i| i.name).collect()
    }

    #[test]
    fn moving_down_shifts_intervening_items_up() {
        let mut items = board(6);
        assert!(move_by_order(&mut items, 1, 5).unwrap());
        assert_eq!(names(&items), vec!["J2", "J3", "J4", "J5", "J1", "J6"]);
        assert!(is_dense(&items));
    }

    #[test]
    fn moving_up_shifts_intervening_items_down() {
        let mut items = board(6);
        assert!(move_by_order(&mut items, 5, 1).unwrap());
        assert_eq!(names(&items), vec!["J5", "J1", "J2", "J3", "J4", "J6"]);
        assert!(is_dense(&items));
    }

    #[test]
    fn first_to_last_and_back() {
        let mut items = board(5);
        move_by_order(&mut items, 1, 5).unwrap();
        assert_eq!(names(&items), vec!["J2", "J3", "J4", "J5", "J1"]);
        move_by_order(&mut items, 5, 1).unwrap();
        assert_eq!(names(&items), vec!["J1", "J2", "J3", "J4", "J5"]);
    }

    #[test]
    fn same_position_is_a_no_op() {
        let mut items = board(3);
        assert!(!move_by_order(&mut items, 2, 2).unwrap());
        assert_eq!(items, board(3));
    }

    #[test]
    fn out_of_range_is_rejected_untouched() {
        let mut items = board(4);
        assert!(matches!(
            move_by_order(&mut items, 0, 2),
            Err(Error::InvariantViolation(_))
        ));
        assert!(matches!(
            move_by_order(&mut items, 2, 5),
            Err(Error::InvariantViolation(_))
        ));
        assert_eq!(items, board(4));
    }

    #[test]
    fn sparse_collection_is_rejected() {
        let mut items = board(3);
        items[2].order = 7;
        assert!(move_by_order(&mut items, 1, 2).is_err());
    }

    #[test]
    fn any_sequence_of_moves_stays_dense() {
        let mut items = board(8);
        let moves = [(1, 8), (8, 1), (3, 6), (6, 3), (2, 7), (5, 4), (7, 2), (4, 4)];
        for (from, to) in moves {
            move_by_order(&mut items, from, to).unwrap();
            assert!(is_dense(&items));
        }
    }
}
