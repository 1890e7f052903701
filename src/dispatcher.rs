//! Drives a run: draws candidates from the pool, fans them out to concurrent
//! probes and gathers outcomes until the selection policy is satisfied.
//!
//! Only the dispatch loop touches the [`AddressPool`] and the [`RunState`].
//! Probe tasks receive an address through the job queue and hand their
//! [`ProbeOutcome`] back through the result queue; nothing else is shared.
use std::{net::IpAddr, sync::Arc};

use colored::Colorize;
use itertools::Itertools;
use log::debug;
use rand::{rngs::StdRng, SeedableRng};
use tokio::sync::mpsc;

use crate::pool::AddressPool;
use crate::prober::{Connector, ProbeOutcome, Prober};

/// Default capacity of the job queue.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default number of good addresses a random-sample run looks for.
pub const DEFAULT_TARGET: usize = 20;

/// Decides which candidate is probed next and when a run is over.
///   - `RandomSample` draws uniformly at random and stops once `target` good
///     addresses are found. A `target` of zero means no cap.
///   - `Exhaustive` walks the pool from its tail and stops once every
///     candidate has an outcome.
///
/// Either policy stops when every candidate has been processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPolicy {
    RandomSample { target: usize },
    Exhaustive,
}

impl SelectionPolicy {
    fn take(self, pool: &mut AddressPool, rng: &mut StdRng) -> Option<IpAddr> {
        match self {
            Self::RandomSample { .. } => pool.take_random(rng),
            Self::Exhaustive => pool.take_last(),
        }
    }

    fn record(self, state: &mut RunState, outcome: &ProbeOutcome) -> Step {
        state.processed += 1;
        if outcome.is_good() {
            state.good.push(outcome.address);
            if let Self::RandomSample { target } = self {
                if target > 0 && state.good.len() >= target {
                    return Step::Done;
                }
            }
        }

        if state.processed == state.pool_len {
            Step::Done
        } else {
            Step::Continue
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Done,
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    /// Size of the pool when the run started.
    pub pool_len: usize,
    /// Outcomes received so far.
    pub processed: usize,
    /// Good addresses, in the order their outcomes arrived.
    pub good: Vec<IpAddr>,
}

impl RunState {
    fn new(pool_len: usize) -> Self {
        Self {
            pool_len,
            ..Self::default()
        }
    }

    /// The good addresses joined with `|`.
    #[must_use]
    pub fn good_line(&self) -> String {
        self.good.iter().join("|")
    }
}

/// Runs probes over a pool under a [`SelectionPolicy`].
///
/// batch_size is the capacity of the job queue: at most that many jobs wait
/// for dispatch at once. Once dispatched a probe runs to completion on its
/// own task.
/// greppable suppresses everything but the final line of good addresses.
#[derive(Debug)]
pub struct Dispatcher<C> {
    prober: Arc<Prober<C>>,
    batch_size: usize,
    greppable: bool,
    accessible: bool,
}

impl<C: Connector + 'static> Dispatcher<C> {
    pub fn new(prober: Prober<C>, batch_size: usize, greppable: bool, accessible: bool) -> Self {
        Self {
            prober: Arc::new(prober),
            batch_size: batch_size.max(1),
            greppable,
            accessible,
        }
    }

    /// Probes candidates from `pool` until `policy` says stop, then prints
    /// the good addresses and returns the final counters.
    pub async fn run(&self, mut pool: AddressPool, policy: SelectionPolicy) -> RunState {
        let mut state = RunState::new(pool.len());
        let mut rng = StdRng::from_os_rng();

        debug!(
            "Start dispatching.\nPolicy {:?}\nBatch size {}\nCandidates {}",
            policy, self.batch_size, state.pool_len
        );

        if state.pool_len == 0 {
            println!();
            return state;
        }

        let (job_tx, mut job_rx) = mpsc::channel::<IpAddr>(self.batch_size);
        let (result_tx, mut result_rx) = mpsc::channel::<ProbeOutcome>(self.batch_size);

        // Queued plus in-flight jobs never exceed batch_size: seeding fills the
        // queue at most once and every later job replaces a finished one.
        for _ in 0..self.batch_size {
            let Some(ip) = policy.take(&mut pool, &mut rng) else {
                break;
            };
            submit(&job_tx, ip).await;
        }

        loop {
            tokio::select! {
                Some(ip) = job_rx.recv() => {
                    let prober = Arc::clone(&self.prober);
                    let result_tx = result_tx.clone();
                    tokio::spawn(async move {
                        let outcome = prober.probe(ip).await;
                        // The loop may already be done.
                        let _ = result_tx.send(outcome).await;
                    });
                }
                Some(outcome) = result_rx.recv() => {
                    let step = policy.record(&mut state, &outcome);
                    self.report(&outcome, &state);
                    if step == Step::Done {
                        break;
                    }
                    if let Some(ip) = policy.take(&mut pool, &mut rng) {
                        submit(&job_tx, ip).await;
                    }
                }
                else => break,
            }
        }

        debug!(
            "Run finished after {} of {} candidates, {} good",
            state.processed,
            state.pool_len,
            state.good.len()
        );
        println!("{}", state.good_line());
        state
    }

    fn report(&self, outcome: &ProbeOutcome, state: &RunState) {
        if self.greppable {
            return;
        }

        if outcome.is_good() && !self.accessible {
            println!("{}", outcome.to_string().green());
        } else {
            println!("{outcome}");
        }

        if state.good.is_empty() {
            println!("had found:0");
        } else {
            println!("had found:{},{}", state.good.len(), state.good_line());
        }
    }
}

async fn submit(job_tx: &mpsc::Sender<IpAddr>, ip: IpAddr) {
    if let Err(e) = job_tx.send(ip).await {
        debug!("Job queue closed, dropping {}", e.0);
    }
}
