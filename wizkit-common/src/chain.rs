//! Chain utilities - walking and relinking step chains

use crate::error::ChainError;
use crate::step::StepRef;
use std::collections::HashSet;
use std::rc::Rc;

/// Identity of the step behind a handle, ignoring the vtable
fn addr<S>(step: &StepRef<S>) -> *const () {
    Rc::as_ptr(step) as *const ()
}

/// Whether two handles point at the same step
pub fn same_step<S>(a: &StepRef<S>, b: &StepRef<S>) -> bool {
    addr(a) == addr(b)
}

/// Iterator over a chain, starting at (and including) `head`
pub struct ChainIter<S> {
    next: Option<StepRef<S>>,
    seen: HashSet<*const ()>,
}

impl<S> Iterator for ChainIter<S> {
    type Item = StepRef<S>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        if !self.seen.insert(addr(&current)) {
            tracing::warn!("step chain loops back on itself; stopping iteration");
            return None;
        }
        self.next = current.borrow().next_panel();
        Some(current)
    }
}

pub fn iter<S>(head: &StepRef<S>) -> ChainIter<S> {
    ChainIter {
        next: Some(head.clone()),
        seen: HashSet::new(),
    }
}

pub fn len<S>(head: &StepRef<S>) -> usize {
    iter(head).count()
}

pub fn labels<S>(head: &StepRef<S>) -> Vec<String> {
    iter(head).map(|step| step.borrow().step_label()).collect()
}

/// Zero-based position of `step` in the chain starting at `head`
pub fn position<S>(head: &StepRef<S>, step: &StepRef<S>) -> Option<usize> {
    iter(head).position(|candidate| same_step(&candidate, step))
}

/// Set `from`'s successor, refusing links that would close a loop
pub fn relink<S>(from: &StepRef<S>, to: Option<StepRef<S>>) -> Result<(), ChainError> {
    if let Some(ref target) = to {
        if iter(target).any(|step| same_step(&step, from)) {
            return Err(ChainError::Cycle {
                from: from.borrow().step_label(),
                to: target.borrow().step_label(),
            });
        }
    }

    tracing::debug!(
        from = %from.borrow().step_label(),
        to = ?to.as_ref().map(|step| step.borrow().step_label()),
        "relinking step"
    );
    from.borrow_mut().set_next_panel(to);
    Ok(())
}

/// First step from `from` onwards that is neither advanceable nor skipped
pub fn first_blocking<S>(from: &StepRef<S>) -> Option<StepRef<S>> {
    iter(from).find(|step| {
        let step = step.borrow();
        !(step.can_advance() || step.is_skipped())
    })
}

/// Store every step's view into `settings`, head first
pub fn store_all<S>(head: &StepRef<S>, settings: &mut S) {
    for step in iter(head) {
        step.borrow().store_settings(settings);
    }
}
