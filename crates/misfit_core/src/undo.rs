//! Undo recording interface.
//!
//! The model reports every state change to an [`UndoRecorder`]. The recorder
//! owns all grouping and merging policy; the model never reads back from it
//! and never assumes a record was merged.

use std::cell::RefCell;
use std::rc::Rc;

/// Records that may absorb the record that follows them.
pub trait Combine {
    /// Folds `next` into `self`. Returns `false` if the two cannot merge.
    fn combine(&mut self, next: &Self) -> bool;
}

/// Receiver for undo records.
pub trait UndoRecorder<U> {
    fn record(&mut self, undo: U);
}

/// Lets an editor keep a handle on the recorder it installed in a model.
impl<U, R: UndoRecorder<U>> UndoRecorder<U> for Rc<RefCell<R>> {
    fn record(&mut self, undo: U) {
        self.borrow_mut().record(undo);
    }
}

/// A named group of records that undo as one step.
#[derive(Debug, Clone)]
pub struct UndoOperation<U> {
    pub name: String,
    pub records: Vec<U>,
}

/// Reference recorder: a command list grouped into operations, merging
/// consecutive records inside the open operation.
#[derive(Debug, Clone)]
pub struct UndoList<U> {
    open: Vec<U>,
    operations: Vec<UndoOperation<U>>,
}

impl<U: Combine> UndoList<U> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            open: Vec::new(),
            operations: Vec::new(),
        }
    }

    /// Closes the open operation under `name`. Empty operations are dropped.
    pub fn operation_complete(&mut self, name: &str) {
        if self.open.is_empty() {
            return;
        }
        let records = std::mem::take(&mut self.open);
        log::debug!("Undo operation '{name}' closed with {} records", records.len());
        self.operations.push(UndoOperation {
            name: name.to_string(),
            records,
        });
    }

    /// Records of the operation still being built.
    #[must_use]
    pub fn pending(&self) -> &[U] {
        &self.open
    }

    #[must_use]
    pub fn operations(&self) -> &[UndoOperation<U>] {
        &self.operations
    }

    pub fn clear(&mut self) {
        self.open.clear();
        self.operations.clear();
    }
}

impl<U: Combine> Default for UndoList<U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U: Combine> UndoRecorder<U> for UndoList<U> {
    fn record(&mut self, undo: U) {
        if let Some(last) = self.open.last_mut()
            && last.combine(&undo)
        {
            return;
        }
        self.open.push(undo);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Edit {
        Move { target: usize, from: f32, to: f32 },
        Rename(usize),
    }

    impl Combine for Edit {
        fn combine(&mut self, next: &Self) -> bool {
            match (self, next) {
                (
                    Edit::Move { target, to, .. },
                    Edit::Move {
                        target: next_target,
                        to: next_to,
                        ..
                    },
                ) if *target == *next_target => {
                    *to = *next_to;
                    true
                }
                _ => false,
            }
        }
    }

    #[test]
    fn consecutive_moves_merge() {
        let mut list = UndoList::new();
        list.record(Edit::Move { target: 0, from: 0.0, to: 1.0 });
        list.record(Edit::Move { target: 0, from: 1.0, to: 2.0 });
        list.record(Edit::Rename(0));
        list.record(Edit::Move { target: 0, from: 2.0, to: 3.0 });

        assert_eq!(list.pending().len(), 3);
        assert_eq!(list.pending()[0], Edit::Move { target: 0, from: 0.0, to: 2.0 });
    }

    #[test]
    fn operations_group_records() {
        let mut list = UndoList::new();
        list.operation_complete("empty");
        list.record(Edit::Rename(1));
        list.operation_complete("rename");

        assert_eq!(list.operations().len(), 1);
        assert_eq!(list.operations()[0].name, "rename");
        assert!(list.pending().is_empty());
    }
}
