//! Communication between the participants of a distributed export
//!
//! Every participant (one per partition of the simulation) owns a [`Communicator`] handle. The only
//! collective operation required by the export pipeline is [`Communicator::gather`], which moves the
//! data of all participants to the coordinating participant (rank [`COORDINATOR_RANK`]).
//!
//! Two implementations are provided: [`SerialComm`] for runs with a single participant and
//! [`ThreadComm`] for groups of participants running on separate threads of the same process.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::sync::mpsc::{self, Receiver, Sender};

use log::trace;
use thiserror::Error as ThisError;

/// Rank of the participant that receives all gathered data and writes the output files
pub const COORDINATOR_RANK: usize = 0;

/// Errors reported by the communication layer
#[derive(Debug, ThisError)]
pub enum CommError {
    /// A participant left the group before the collective operation completed
    #[error("participant {rank} disconnected before the gather operation completed")]
    Disconnected { rank: usize },
    /// A participant sent data that does not match the type expected by the coordinator
    #[error("participant {rank} contributed data of an unexpected type to the gather operation")]
    UnexpectedPayload { rank: usize },
    /// A message was received from a rank that is not part of the group
    #[error("received message from rank {rank} which is not part of a group of size {size}")]
    InvalidRank { rank: usize, size: usize },
}

/// Collective communication interface of a participant
pub trait Communicator {
    /// Rank of this participant in the group
    fn rank(&self) -> usize;
    /// Number of participants in the group
    fn size(&self) -> usize;

    /// Returns whether this participant is the coordinator that writes output files
    fn is_coordinator(&self) -> bool {
        self.rank() == COORDINATOR_RANK
    }

    /// Collective gather of the local data of all participants onto the coordinator
    ///
    /// Has to be called by all participants of the group in the same order. Returns the data of all
    /// participants ordered by rank on the coordinator and `None` on all other participants.
    fn gather<T: Send + 'static>(&self, local: Vec<T>) -> Result<Option<Vec<Vec<T>>>, CommError>;
}

/// Communicator of a run with a single participant, which is also the coordinator
#[derive(Copy, Clone, Debug, Default)]
pub struct SerialComm;

impl Communicator for SerialComm {
    fn rank(&self) -> usize {
        COORDINATOR_RANK
    }

    fn size(&self) -> usize {
        1
    }

    fn gather<T: Send + 'static>(&self, local: Vec<T>) -> Result<Option<Vec<Vec<T>>>, CommError> {
        Ok(Some(vec![local]))
    }
}

/// Message sent from a participant to the coordinator during a gather
struct Envelope {
    rank: usize,
    /// Sequence number of the collective operation on the sending participant
    round: u64,
    payload: Box<dyn Any + Send>,
}

/// Communicator of a group of participants living on different threads of the same process
///
/// A group is created with [`ThreadComm::create_group`], each handle is then moved to the thread
/// of its participant. Handles are `Send` but not `Sync`.
pub struct ThreadComm {
    rank: usize,
    size: usize,
    /// Channel to the coordinator, `None` on the coordinator itself
    to_coordinator: Option<Sender<Envelope>>,
    /// Receiving end of all messages, only present on the coordinator
    inbox: Option<Receiver<Envelope>>,
    /// Number of collective operations started by this participant
    round: Cell<u64>,
    /// Messages that arrived early for a later collective operation
    pending: RefCell<Vec<Envelope>>,
}

impl ThreadComm {
    /// Creates the communicators of a group with the given number of participants, ordered by rank
    pub fn create_group(size: usize) -> Vec<ThreadComm> {
        assert!(size > 0, "a participant group needs at least one member");
        let (sender, receiver) = mpsc::channel();

        let mut group = Vec::with_capacity(size);
        group.push(ThreadComm {
            rank: COORDINATOR_RANK,
            size,
            to_coordinator: None,
            inbox: Some(receiver),
            round: Cell::new(0),
            pending: RefCell::new(Vec::new()),
        });
        for rank in 1..size {
            group.push(ThreadComm {
                rank,
                size,
                to_coordinator: Some(sender.clone()),
                inbox: None,
                round: Cell::new(0),
                pending: RefCell::new(Vec::new()),
            });
        }
        group
    }

    fn next_round(&self) -> u64 {
        let round = self.round.get();
        self.round.set(round + 1);
        round
    }

    /// Stores the payload of the envelope in the slot of its sender
    fn accept<T: 'static>(
        &self,
        envelope: Envelope,
        slots: &mut [Option<Vec<T>>],
    ) -> Result<(), CommError> {
        let rank = envelope.rank;
        if rank >= self.size || rank == COORDINATOR_RANK {
            return Err(CommError::InvalidRank {
                rank,
                size: self.size,
            });
        }
        let data = envelope
            .payload
            .downcast::<Vec<T>>()
            .map_err(|_| CommError::UnexpectedPayload { rank })?;
        slots[rank] = Some(*data);
        Ok(())
    }
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn gather<T: Send + 'static>(&self, local: Vec<T>) -> Result<Option<Vec<Vec<T>>>, CommError> {
        let round = self.next_round();

        if let Some(sender) = &self.to_coordinator {
            trace!(
                "Participant {} sends {} items to the coordinator (round {})",
                self.rank,
                local.len(),
                round
            );
            sender
                .send(Envelope {
                    rank: self.rank,
                    round,
                    payload: Box::new(local),
                })
                .map_err(|_| CommError::Disconnected {
                    rank: COORDINATOR_RANK,
                })?;
            return Ok(None);
        }

        let mut slots: Vec<Option<Vec<T>>> = (0..self.size).map(|_| None).collect();
        slots[COORDINATOR_RANK] = Some(local);

        // Messages of this round that arrived during an earlier gather
        let early = {
            let mut pending = self.pending.borrow_mut();
            let (current, later): (Vec<_>, Vec<_>) =
                pending.drain(..).partition(|e| e.round == round);
            *pending = later;
            current
        };
        for envelope in early {
            self.accept(envelope, &mut slots)?;
        }

        if let Some(inbox) = &self.inbox {
            while let Some(missing_rank) = slots.iter().position(Option::is_none) {
                let envelope = inbox
                    .recv()
                    .map_err(|_| CommError::Disconnected { rank: missing_rank })?;
                if envelope.round == round {
                    self.accept(envelope, &mut slots)?;
                } else {
                    self.pending.borrow_mut().push(envelope);
                }
            }
        }

        trace!(
            "Coordinator gathered data of {} participants (round {})",
            self.size,
            round
        );
        Ok(Some(slots.into_iter().flatten().collect()))
    }
}
