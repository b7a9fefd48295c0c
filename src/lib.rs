// lock-free multi-word compare-and-swap: sort triples by cell order, acquire
// each cell through a conditional CAS that installs a shared descriptor,
// commit with a single status-word CAS, then patch every cell to a settled
// value. any thread that observes an in-flight descriptor helps it finish.

mod ccas;
mod cell;
mod error;
mod mcas;

pub use cell::{Cell, OrderId};
pub use error::McasError;

use crossbeam_epoch as epoch;

pub fn new_cell<T>(initial: T) -> Cell<T> {
    Cell::new(initial)
}

// helps any in-flight descriptor it encounters along the way; only ever
// returns a user value, never a descriptor
pub fn load<T: Clone + PartialEq>(cell: &Cell<T>) -> T {
    let guard = epoch::pin();
    mcas::mcas_read(cell, &guard)
}

pub fn store<T: Clone + PartialEq>(cell: &Cell<T>, new: T) {
    loop {
        let current = load(cell);
        if cas(cell, current, new.clone()) {
            return;
        }
    }
}

pub fn cas<T: Clone + PartialEq>(cell: &Cell<T>, old: T, new: T) -> bool {
    mcas(vec![(cell.clone(), old, new)])
}

// applies every (cell, old, new) triple atomically, or none of them. updates
// need not be pre-sorted, mcas sorts by each cell's order_id before
// acquiring. an empty batch trivially succeeds. a batch referencing the same
// cell in more than one triple panics with McasError::DuplicateCell.
pub fn mcas<T: Clone + PartialEq>(updates: Vec<(Cell<T>, T, T)>) -> bool {
    let triples = mcas::prepare_triples(updates).unwrap_or_else(|e| panic!("{}", e));
    if triples.is_empty() {
        return true;
    }
    let desc = std::sync::Arc::new(mcas::McasDescriptor::new(triples));
    let guard = epoch::pin();
    mcas::mcas_help(&desc, &guard)
}
