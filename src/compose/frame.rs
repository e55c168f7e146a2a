use alloc::{boxed::Box, vec::Vec};
use core::any::Any;

/// The record of one step of a composed script.
pub(crate) enum Slot {
    /// The step finished. Its value is replayed whenever the script reaches
    /// it again.
    Ready(Box<dyn Any>),
    /// The step is in progress and owns whatever it needs to resume.
    Pending(Box<dyn Any>),
}

/// The steps of one run of a composed script, one frame per recursion level.
///
/// Slots are indexed by the order in which the script reaches its steps. Every
/// slot before the in-progress one is [`Slot::Ready`].
pub(crate) struct Frame<E> {
    pub(crate) slots: Vec<Slot>,
    /// A value decoded by a nested frame, waiting for the step that asked for
    /// it.
    pub(crate) child: Option<E>,
}

impl<E> Frame<E> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            child: None,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.child = None;
    }
}
