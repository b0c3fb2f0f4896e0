use crossbeam_channel::{Receiver, Sender, unbounded};
use kintree_core::{LayoutMode, Member, MemberId, Story};
use kintree_graph::RelationSet;
use serde::{Deserialize, Serialize};

pub mod telemetry;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Adapter -> controller
    MemberSelected {
        id: MemberId,
    },
    NodeDragStarted {
        id: MemberId,
        x: f32,
        y: f32,
    },
    NodeDragMoved {
        id: MemberId,
        x: f32,
        y: f32,
    },
    NodeDragEnded {
        id: MemberId,
    },
    ViewportResized {
        width: f32,
        height: f32,
    },
    /// A fresh snapshot of the tree's members.
    MembersChanged {
        members: Vec<Member>,
    },
    SetLayoutMode(LayoutMode),
    StoriesChanged {
        stories: Vec<Story>,
    },

    // Controller -> adapter
    /// Relations of the selected member and the stories tagged with them.
    RelationsReady {
        relations: Box<RelationSet>,
        stories: Vec<Story>,
    },
    ShowError {
        message: String,
    },
}

#[derive(Clone)]
pub struct EventBus {
    tx: Sender<Event>,
    rx: Receiver<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> Sender<Event> {
        self.tx.clone()
    }

    pub fn receiver(&self) -> Receiver<Event> {
        self.rx.clone()
    }

    pub fn publish(&self, event: Event) {
        let _ = self.tx.send(event);
    }

    /// Drains every pending event into `listener`, on the caller's thread.
    pub fn dispatch_to<L: EventListener>(&self, listener: &mut L) {
        while let Ok(event) = self.rx.try_recv() {
            listener.handle_event(&event);
        }
    }

    /// Takes all pending events without dispatching them.
    pub fn drain(&self) -> Vec<Event> {
        self.rx.try_iter().collect()
    }
}

/// Implement this to receive events from the EventBus.
pub trait EventListener {
    fn handle_event(&mut self, event: &Event);
}
