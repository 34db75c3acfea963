//! FMEA change notifications
//!
//! Subscribers are plain closures called synchronously, in subscription
//! order, after the change has been committed.

use serde::Serialize;

use crate::core::path::{Level, NodeKey};
use crate::fmea::model::FmeaKind;

/// Something that happened to an FMEA
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FmeaEvent {
    Selected { subject_id: i64, kind: FmeaKind },
    Inserted { node: NodeKey, level: Level },
    Deleted { node: NodeKey, level: Level },
    Saved { node: NodeKey, level: Level },
    SavedAll { saved: usize },
    CalculatedRpn { node: NodeKey },
    CalculatedCriticality { modes: usize },
}

impl FmeaEvent {
    /// Event name, e.g. `inserted_mode` or `saved_all`
    pub fn name(&self) -> String {
        match self {
            FmeaEvent::Selected { .. } => "selected_fmea".to_string(),
            FmeaEvent::Inserted { level, .. } => format!("inserted_{}", level),
            FmeaEvent::Deleted { level, .. } => format!("deleted_{}", level),
            FmeaEvent::Saved { level, .. } => format!("saved_{}", level),
            FmeaEvent::SavedAll { .. } => "saved_all".to_string(),
            FmeaEvent::CalculatedRpn { .. } => "calculated_rpn".to_string(),
            FmeaEvent::CalculatedCriticality { .. } => "calculated_criticality".to_string(),
        }
    }
}

type Subscriber = Box<dyn Fn(&FmeaEvent)>;

#[derive(Default)]
pub struct NotificationBus {
    subscribers: Vec<Subscriber>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a closure called for every event
    pub fn subscribe(&mut self, subscriber: impl Fn(&FmeaEvent) + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    /// Register a closure called only for events with the given name
    pub fn subscribe_to(&mut self, name: &str, subscriber: impl Fn(&FmeaEvent) + 'static) {
        let name = name.to_string();
        self.subscribe(move |event| {
            if event.name() == name {
                subscriber(event);
            }
        });
    }

    pub fn publish(&self, event: &FmeaEvent) {
        for subscriber in &self.subscribers {
            subscriber(event);
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}
