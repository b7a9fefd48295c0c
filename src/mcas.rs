use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crossbeam_epoch::{Guard, Owned};
use crossbeam_utils::Backoff;

use crate::ccas::{ccas, ccas_help, ccas_read};
use crate::cell::{Cell, CellState, ResolvedWord};
use crate::error::McasError;

// Undecided -> Succeeded or Undecided -> Failed, via a single CAS, at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum McasStatusValue {
    Undecided,
    Succeeded,
    Failed,
}

const UNDECIDED: u8 = 0;
const SUCCEEDED: u8 = 1;
const FAILED: u8 = 2;

pub(crate) struct McasStatus(AtomicU8);

impl McasStatus {
    fn new() -> Self {
        McasStatus(AtomicU8::new(UNDECIDED))
    }

    pub(crate) fn load(&self) -> McasStatusValue {
        match self.0.load(Ordering::SeqCst) {
            SUCCEEDED => McasStatusValue::Succeeded,
            FAILED => McasStatusValue::Failed,
            _ => McasStatusValue::Undecided,
        }
    }

    // returns whichever status is authoritative once this returns: target if
    // this call won the decide, otherwise whatever a helper already decided
    pub(crate) fn decide(&self, target: McasStatusValue) -> McasStatusValue {
        let target_raw = match target {
            McasStatusValue::Succeeded => SUCCEEDED,
            McasStatusValue::Failed => FAILED,
            McasStatusValue::Undecided => unreachable!("cannot decide to Undecided"),
        };
        match self
            .0
            .compare_exchange(UNDECIDED, target_raw, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => {
                log::trace!("mcas: decide CAS won, status -> {:?}", target);
                target
            }
            Err(_) => self.load(),
        }
    }
}

// one (cell, old, new) entry of an mcas batch
pub(crate) struct Triple<T> {
    pub(crate) cell: Cell<T>,
    pub(crate) old: T,
    pub(crate) new: T,
}

// shared across however many threads end up helping one mcas call; immutable
// except for status
pub(crate) struct McasDescriptor<T> {
    pub(crate) triples: Vec<Triple<T>>,
    pub(crate) status: McasStatus,
}

impl<T> McasDescriptor<T> {
    pub(crate) fn new(triples: Vec<Triple<T>>) -> Self {
        McasDescriptor {
            triples,
            status: McasStatus::new(),
        }
    }

    pub(crate) fn status(&self) -> McasStatusValue {
        self.status.load()
    }
}

enum Acquired {
    Yes,
    No,
}

// attempt the ccas for this triple's cell, then interpret what the cell now holds
fn acquire_one<T: Clone + PartialEq>(
    triple: &Triple<T>,
    desc: &Arc<McasDescriptor<T>>,
    guard: &Guard,
) -> Acquired {
    let backoff = Backoff::new();
    loop {
        ccas(&triple.cell, triple.old.clone(), desc.clone(), guard);

        let current = triple.cell.load_raw(guard);
        match unsafe { current.as_ref() }.expect("cell slot is never null") {
            CellState::Mcas(d) if Arc::ptr_eq(d, desc) => return Acquired::Yes,
            CellState::Value(v) if *v == triple.old && desc.status() == McasStatusValue::Undecided => {
                // a helper nudged the CCAS back to `old` after our status
                // check but before it resolved; retry this cell
                backoff.spin();
                continue;
            }
            CellState::Mcas(other) => {
                let other = other.clone();
                mcas_help(&other, guard);
                backoff.spin();
            }
            CellState::Ccas(other) => {
                // a second mcas is concurrently racing us for this cell
                let other = other.clone();
                ccas_help(&triple.cell, current, &other, guard);
                backoff.spin();
            }
            CellState::Value(_) => return Acquired::No,
        }
    }
}

// safe to call more than once for the same descriptor: only the first patch
// CAS mutates the cell, the rest are no-ops since the cell no longer holds
// desc by the time they run
fn patch<T: Clone + PartialEq>(triple: &Triple<T>, desc: &Arc<McasDescriptor<T>>, succeeded: bool, guard: &Guard) {
    let current = triple.cell.load_raw(guard);
    if let Some(CellState::Mcas(d)) = unsafe { current.as_ref() } {
        if Arc::ptr_eq(d, desc) {
            let value = if succeeded {
                triple.new.clone()
            } else {
                triple.old.clone()
            };
            if triple
                .cell
                .compare_and_set(current, Owned::new(CellState::Value(value)), guard)
                .is_ok()
            {
                unsafe { guard.defer_destroy(current) };
            }
        }
    }
}

// drives desc to completion: acquire phase, decide CAS, patch phase. returns
// the same boolean whether the caller is the originator or just a helper.
pub(crate) fn mcas_help<T: Clone + PartialEq>(desc: &Arc<McasDescriptor<T>>, guard: &Guard) -> bool {
    if desc.status() == McasStatusValue::Undecided {
        let mut acquire_failed = false;
        for triple in &desc.triples {
            match acquire_one(triple, desc, guard) {
                Acquired::Yes => continue,
                Acquired::No => {
                    acquire_failed = true;
                    break;
                }
            }
        }
        let target = if acquire_failed {
            McasStatusValue::Failed
        } else {
            McasStatusValue::Succeeded
        };
        desc.status.decide(target);
    }

    let succeeded = desc.status() == McasStatusValue::Succeeded;
    for triple in &desc.triples {
        patch(triple, desc, succeeded, guard);
    }
    succeeded
}

// repeatedly resolves cell down to a user value, helping any mcas descriptor
// it finds along the way
pub(crate) fn mcas_read<T: Clone + PartialEq>(cell: &Cell<T>, guard: &Guard) -> T {
    loop {
        match ccas_read(cell, guard) {
            ResolvedWord::Value(v) => return v,
            ResolvedWord::Mcas(d) => {
                mcas_help(&d, guard);
            }
        }
    }
}

// sorts a batch of triples by order_id and rejects duplicate cells, caught
// for free while sorting
pub(crate) fn prepare_triples<T>(updates: Vec<(Cell<T>, T, T)>) -> Result<Vec<Triple<T>>, McasError> {
    let mut triples: Vec<Triple<T>> = updates
        .into_iter()
        .map(|(cell, old, new)| Triple { cell, old, new })
        .collect();
    triples.sort_by_key(|t| t.cell.order_id());
    for pair in triples.windows(2) {
        if pair[0].cell.order_id() == pair[1].cell.order_id() {
            return Err(McasError::DuplicateCell);
        }
    }
    Ok(triples)
}
