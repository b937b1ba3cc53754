//! Opt-in structured event stream for callers that want to follow
//! individual lifecycle transitions rather than per-tick aggregates.

use crate::agent::{AgentId, Breed};
use crate::grid::Position;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    Born {
        tick: u64,
        id: AgentId,
        breed: Breed,
        parent: AgentId,
    },
    Died {
        tick: u64,
        id: AgentId,
        breed: Breed,
    },
    Killed {
        tick: u64,
        prey: AgentId,
        by: AgentId,
    },
    PackFormed {
        tick: u64,
        pack: AgentId,
        founders: [AgentId; 2],
        at: Position,
    },
    PackJoined {
        tick: u64,
        pack: AgentId,
        member: AgentId,
    },
    PacksMerged {
        tick: u64,
        into: AgentId,
        absorbed: AgentId,
    },
    PackDisbanded {
        tick: u64,
        pack: AgentId,
        members: usize,
        fed: bool,
    },
}

/// Receiver for [`SimEvent`]s
pub trait TraceSink {
    fn record(&mut self, event: SimEvent);
}

/// In-memory sink. Clones share the same buffer, so a caller can hand one
/// clone to the model and read events back through another.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<SimEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SimEvent> {
        self.events.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl TraceSink for EventLog {
    fn record(&mut self, event: SimEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl<F> TraceSink for F
where
    F: FnMut(SimEvent),
{
    fn record(&mut self, event: SimEvent) {
        self(event)
    }
}
