use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_epoch::{Atomic, CompareAndSetError, Guard, Owned, Shared};

use crate::ccas::CcasDescriptor;
use crate::mcas::McasDescriptor;

// mcas always acquires cells in ascending order_id order; this rules out
// helping cycles between two operations sharing more than one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderId(u64);

static NEXT_ORDER_ID: AtomicU64 = AtomicU64::new(0);

impl OrderId {
    fn next() -> Self {
        OrderId(NEXT_ORDER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

// the tagged word a cell's slot holds: a plain value, or one of the two
// descriptor kinds published by an in-flight operation. exactly one at a time.
pub(crate) enum CellState<T> {
    Value(T),
    Ccas(Arc<CcasDescriptor<T>>),
    Mcas(Arc<McasDescriptor<T>>),
}

// what ccas_read / the acquire loop see once any transient ccas descriptor
// has been resolved: a settled value, or an mcas descriptor that may still
// need helping
pub(crate) enum ResolvedWord<T> {
    Value(T),
    Mcas(Arc<McasDescriptor<T>>),
}

struct CellInner<T> {
    order_id: OrderId,
    slot: Atomic<CellState<T>>,
}

// a single atomic storage location participating in mcas. cheap to Clone (an
// Arc around the atomic slot) so a descriptor can hold the cells it touches
// by value.
pub struct Cell<T> {
    inner: Arc<CellInner<T>>,
}

impl<T> Clone for Cell<T> {
    fn clone(&self) -> Self {
        Cell {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Cell<T> {
    pub fn new(initial: T) -> Self {
        Cell {
            inner: Arc::new(CellInner {
                order_id: OrderId::next(),
                slot: Atomic::new(CellState::Value(initial)),
            }),
        }
    }

    pub fn order_id(&self) -> OrderId {
        self.inner.order_id
    }

    pub(crate) fn load_raw<'g>(&self, guard: &'g Guard) -> Shared<'g, CellState<T>> {
        self.inner.slot.load(Ordering::Acquire, guard)
    }

    #[allow(clippy::type_complexity)]
    pub(crate) fn compare_and_set<'g>(
        &self,
        current: Shared<'g, CellState<T>>,
        new: Owned<CellState<T>>,
        guard: &'g Guard,
    ) -> Result<Shared<'g, CellState<T>>, CompareAndSetError<'g, CellState<T>, Owned<CellState<T>>>>
    {
        self.inner
            .slot
            .compare_and_set(current, new, Ordering::SeqCst, guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_ids_are_strictly_increasing() {
        let a = Cell::new(1);
        let b = Cell::new(2);
        assert!(a.order_id() < b.order_id());
    }

    #[test]
    fn clone_shares_the_same_slot() {
        let a = Cell::new(1);
        let b = a.clone();
        assert_eq!(a.order_id(), b.order_id());
    }
}
