use std::sync::atomic;

/// Resource constraints: conflict/propagation limits plus the single
/// interrupt flag the search loop polls after every propagation (spec's
/// single-threaded cooperative cancellation model — no suspension points
/// besides this poll).
pub struct Budget {
    conflict_budget: i64,
    propagation_budget: i64,
    asynch_interrupt: atomic::AtomicBool,
}

impl Budget {
    pub fn new() -> Budget {
        Budget {
            conflict_budget: -1,
            propagation_budget: -1,
            asynch_interrupt: atomic::AtomicBool::new(false),
        }
    }

    pub fn within(&self, conflicts: u64, propagations: u64) -> bool {
        !self.asynch_interrupt.load(atomic::Ordering::Relaxed)
            && (self.conflict_budget < 0 || conflicts < self.conflict_budget as u64)
            && (self.propagation_budget < 0 || propagations < self.propagation_budget as u64)
    }

    pub fn interrupted(&self) -> bool {
        self.asynch_interrupt.load(atomic::Ordering::Relaxed)
    }

    /// Set by a signal handler (or any external caller) to ask the search
    /// loop to return at its next poll, with the OBDD built so far intact.
    pub fn interrupt(&self) {
        self.asynch_interrupt.store(true, atomic::Ordering::Relaxed);
    }

    pub fn off(&mut self) {
        self.conflict_budget = -1;
        self.propagation_budget = -1;
    }
}

impl Default for Budget {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupt_is_observed_by_within() {
        let b = Budget::new();
        assert!(b.within(0, 0));
        b.interrupt();
        assert!(!b.within(0, 0));
        assert!(b.interrupted());
    }
}
