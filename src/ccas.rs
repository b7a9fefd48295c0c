use std::sync::Arc;

use crossbeam_epoch::{Guard, Owned, Shared};

use crate::cell::{Cell, CellState, ResolvedWord};
use crate::mcas::{McasDescriptor, McasStatusValue};

// a conditional CAS descriptor, published into a cell while an mcas acquires
// it. the predicate and the value to install on success aren't a boxed
// closure, just a direct reference to the mcas descriptor whose status gates
// resolution. ccas_help installs mcas itself when the predicate holds, old
// otherwise.
pub(crate) struct CcasDescriptor<T> {
    pub(crate) old: T,
    pub(crate) mcas: Arc<McasDescriptor<T>>,
}

impl<T> CcasDescriptor<T> {
    fn predicate_holds(&self) -> bool {
        self.mcas.status() == McasStatusValue::Undecided
    }
}

// attempts to replace cell's contents from old to mcas, conditional on
// mcas.status() still being Undecided at the moment the descriptor resolves.
// the caller (mcas_help's acquire loop) re-reads the cell afterward to decide
// what happened.
pub(crate) fn ccas<T: Clone + PartialEq>(
    cell: &Cell<T>,
    old: T,
    mcas: Arc<McasDescriptor<T>>,
    guard: &Guard,
) {
    let desc = Arc::new(CcasDescriptor {
        old: old.clone(),
        mcas,
    });

    loop {
        let current = cell.load_raw(guard);
        let holds_old = matches!(unsafe { current.as_ref() }, Some(CellState::Value(v)) if *v == old);

        if holds_old {
            let owned = Owned::new(CellState::Ccas(desc.clone()));
            match cell.compare_and_set(current, owned, guard) {
                Ok(installed) => {
                    log::trace!("ccas: installed descriptor, resolving");
                    ccas_help(cell, installed, &desc, guard);
                    return;
                }
                Err(_) => continue, // lost the race for `current`; re-read and retry
            }
        }

        match unsafe { current.as_ref() } {
            Some(CellState::Ccas(other)) => {
                // a concurrent ccas is mid-flight on this cell; drive it to
                // completion before re-reading
                let other = other.clone();
                ccas_help(cell, current, &other, guard);
            }
            // either a user value that isn't `old`, or an mcas descriptor.
            // nothing more this call can do, the caller re-reads and decides.
            _ => return,
        }
    }
}

// resolves a published ccas descriptor: evaluates the predicate and installs
// whichever word it implies. one predicate read plus one CAS, no internal
// loop. safe to call repeatedly, at most one caller's CAS succeeds and the
// rest are benign no-ops since the cell no longer holds desc by the time
// they run.
pub(crate) fn ccas_help<T: Clone + PartialEq>(
    cell: &Cell<T>,
    installed: Shared<'_, CellState<T>>,
    desc: &Arc<CcasDescriptor<T>>,
    guard: &Guard,
) {
    let resolved = if desc.predicate_holds() {
        CellState::Mcas(desc.mcas.clone())
    } else {
        CellState::Value(desc.old.clone())
    };

    if let Ok(_) = cell.compare_and_set(installed, Owned::new(resolved), guard) {
        unsafe { guard.defer_destroy(installed) };
    }
}

// returns the logical contents of cell, ignoring any transient ccas
// descriptor by helping it to completion and re-reading. an mcas descriptor
// is returned as-is, resolving it is the caller's job (the acquire loop, or
// mcas_read).
pub(crate) fn ccas_read<T: Clone>(cell: &Cell<T>, guard: &Guard) -> ResolvedWord<T> {
    loop {
        let current = cell.load_raw(guard);
        match unsafe { current.as_ref() }.expect("cell slot is never null") {
            CellState::Value(v) => return ResolvedWord::Value(v.clone()),
            CellState::Mcas(d) => return ResolvedWord::Mcas(d.clone()),
            CellState::Ccas(desc) => {
                let desc = desc.clone();
                ccas_help(cell, current, &desc, guard);
            }
        }
    }
}
