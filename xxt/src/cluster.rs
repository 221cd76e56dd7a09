//! In-process hypercube communicators
//!
//! `ThreadCluster` runs one closure per simulated process on a dedicated
//! rayon pool with exactly one thread per rank. Ranks talk over one channel
//! per ordered pair, so messages between two ranks arrive in the order they
//! were sent. A rank that returns drops its endpoints, and any peer still
//! waiting on it observes `PeerDisconnected` instead of blocking forever.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Mutex;

use xxt_core::{Hypercube, Result, XxtError};

/// Communicator endpoint of one simulated process
#[derive(Debug)]
pub struct ThreadComm {
    rank: usize,
    size: usize,
    outbox: Vec<Sender<Vec<u8>>>,
    inbox: Vec<Receiver<Vec<u8>>>,
}

impl Hypercube for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn exchange_bytes(&self, partner: usize, send: &[u8]) -> Result<Vec<u8>> {
        let disconnected = XxtError::PeerDisconnected { rank: partner };
        if partner == self.rank {
            return Err(disconnected);
        }
        let (outbox, inbox) = match (self.outbox.get(partner), self.inbox.get(partner)) {
            (Some(outbox), Some(inbox)) => (outbox, inbox),
            _ => return Err(disconnected),
        };

        outbox.send(send.to_vec()).map_err(|_| disconnected)?;
        inbox.recv().map_err(|_| disconnected)
    }
}

/// Communicator of a process running on its own
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelfComm;

impl Hypercube for SelfComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn exchange_bytes(&self, partner: usize, _send: &[u8]) -> Result<Vec<u8>> {
        Err(XxtError::PeerDisconnected { rank: partner })
    }
}

/// A set of simulated processes, one thread each
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadCluster {
    size: usize,
}

impl ThreadCluster {
    /// Cluster of `size` processes
    ///
    /// Any size is accepted so that callers can exercise the solver's own
    /// topology checks.
    pub fn new(size: usize) -> Self {
        Self { size }
    }

    /// Number of processes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Fully connected set of endpoints, indexed by rank
    pub fn endpoints(&self) -> Vec<ThreadComm> {
        let size = self.size;
        let mut outboxes: Vec<Vec<Sender<Vec<u8>>>> = (0..size).map(|_| Vec::new()).collect();
        let mut inboxes: Vec<Vec<Option<Receiver<Vec<u8>>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();

        for (src, outbox) in outboxes.iter_mut().enumerate() {
            for inbox in inboxes.iter_mut() {
                let (sender, receiver) = channel();
                outbox.push(sender);
                inbox[src] = Some(receiver);
            }
        }

        outboxes
            .into_iter()
            .zip(inboxes)
            .enumerate()
            .map(|(rank, (outbox, inbox))| ThreadComm {
                rank,
                size,
                outbox,
                inbox: inbox.into_iter().flatten().collect(),
            })
            .collect()
    }

    /// Run `f` once per rank, concurrently, and collect results by rank
    pub fn run<F, R>(&self, f: F) -> Result<Vec<R>>
    where
        F: Fn(ThreadComm) -> R + Sync,
        R: Send,
    {
        if self.size == 0 {
            return Ok(Vec::new());
        }

        let slots: Vec<Mutex<Option<ThreadComm>>> = self
            .endpoints()
            .into_iter()
            .map(|comm| Mutex::new(Some(comm)))
            .collect();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.size)
            .thread_name(|index| format!("xxt-rank-{index}"))
            .build()
            .map_err(|_| XxtError::ThreadPool)?;

        let results = pool.broadcast(|ctx| {
            let comm = slots
                .get(ctx.index())
                .and_then(|slot| slot.lock().ok())
                .and_then(|mut slot| slot.take());
            comm.map(&f)
        });

        log::debug!("cluster of {} ranks finished", self.size);
        results
            .into_iter()
            .collect::<Option<Vec<R>>>()
            .ok_or(XxtError::ThreadPool)
    }
}
