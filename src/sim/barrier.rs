//! Reusable N-party rendezvous for the lock-step tick protocol.
//!
//! Cycle-counted: a waiter blocks until all parties have arrived for
//! the current cycle, then everyone is released and the cycle advances,
//! so the same barrier is safe to reuse immediately on the next tick.
//! A late waiter from cycle N can never be confused with an early
//! arrival for cycle N+1 because release is keyed on the cycle number,
//! not the arrival count.

use std::sync::{Condvar, Mutex};

pub struct CycleBarrier {
    parties: usize,
    state: Mutex<BarrierState>,
    cvar: Condvar,
}

struct BarrierState {
    arrived: usize,
    cycle: u64,
}

impl CycleBarrier {
    /// A barrier for `parties` threads. A zero-party barrier would
    /// stall every waiter forever, so it is a construction-time panic.
    pub fn new(parties: usize) -> Self {
        assert!(parties > 0, "barrier requires at least one party");
        CycleBarrier {
            parties,
            state: Mutex::new(BarrierState {
                arrived: 0,
                cycle: 0,
            }),
            cvar: Condvar::new(),
        }
    }

    /// Block until all parties have called `wait` for the current
    /// cycle. Returns `true` for exactly one caller per cycle (the last
    /// to arrive), mirroring `std::sync::Barrier`'s leader token.
    pub fn wait(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        let cycle = state.cycle;
        state.arrived += 1;

        if state.arrived == self.parties {
            state.arrived = 0;
            state.cycle = state.cycle.wrapping_add(1);
            self.cvar.notify_all();
            return true;
        }

        while state.cycle == cycle {
            state = self.cvar.wait(state).unwrap();
        }
        false
    }

    #[inline]
    pub fn parties(&self) -> usize {
        self.parties
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_single_party_never_blocks() {
        let barrier = CycleBarrier::new(1);
        for _ in 0..100 {
            assert!(barrier.wait(), "sole party is always the leader");
        }
    }

    #[test]
    #[should_panic(expected = "at least one party")]
    fn test_zero_parties_panics() {
        CycleBarrier::new(0);
    }

    #[test]
    fn test_rendezvous_across_many_cycles() {
        const THREADS: usize = 4;
        const CYCLES: usize = 200;

        let barrier = Arc::new(CycleBarrier::new(THREADS));
        let counter = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let barrier = Arc::clone(&barrier);
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for cycle in 0..CYCLES {
                        counter.fetch_add(1, Ordering::SeqCst);
                        barrier.wait();
                        // Every thread incremented before anyone passed.
                        let seen = counter.load(Ordering::SeqCst);
                        assert!(
                            seen >= THREADS * (cycle + 1),
                            "cycle {}: saw {} increments",
                            cycle,
                            seen
                        );
                        barrier.wait();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), THREADS * CYCLES);
    }

    #[test]
    fn test_exactly_one_leader_per_cycle() {
        const THREADS: usize = 3;
        const CYCLES: usize = 50;

        let barrier = Arc::new(CycleBarrier::new(THREADS));
        let leaders = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let barrier = Arc::clone(&barrier);
                let leaders = Arc::clone(&leaders);
                thread::spawn(move || {
                    for _ in 0..CYCLES {
                        if barrier.wait() {
                            leaders.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(leaders.load(Ordering::SeqCst), CYCLES);
    }
}
