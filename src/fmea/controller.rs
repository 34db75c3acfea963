//! FMEA controller
//!
//! Thin facade over [`FmeaModel`]: every request is forwarded unchanged, a
//! success is announced on the notification bus and a failure is logged with
//! its error code before being handed back to the caller.

use tracing::{debug, warn};

use crate::core::path::NodeKey;
use crate::entities::FmeaEntity;
use crate::fmea::error::FmeaError;
use crate::fmea::model::{FmeaKind, FmeaModel};
use crate::fmea::notify::{FmeaEvent, NotificationBus};
use crate::fmea::tree::FmeaTree;

pub struct FmeaController {
    model: FmeaModel,
    bus: NotificationBus,
}

impl FmeaController {
    pub fn new(model: FmeaModel) -> Self {
        Self {
            model,
            bus: NotificationBus::new(),
        }
    }

    pub fn model(&self) -> &FmeaModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut FmeaModel {
        &mut self.model
    }

    pub fn bus_mut(&mut self) -> &mut NotificationBus {
        &mut self.bus
    }

    pub fn request_select_all(&mut self, subject_id: i64, functional: bool) -> Result<&FmeaTree, FmeaError> {
        let result = self.model.select_all(subject_id, functional).map(|_| ());
        self.finish("select FMEA", result, || FmeaEvent::Selected {
            subject_id,
            kind: FmeaKind::from_functional(functional),
        })?;
        Ok(self.model.tree())
    }

    pub fn request_select(&self, key: &NodeKey) -> Option<&FmeaEntity> {
        self.model.select(key)
    }

    pub fn request_insert(&mut self, entity_id: i64, parent: &NodeKey, level: &str) -> Result<NodeKey, FmeaError> {
        let result = self.model.insert(entity_id, parent, level);
        let event = result.as_ref().ok().and_then(|node| {
            node.level().map(|level| FmeaEvent::Inserted {
                node: node.clone(),
                level,
            })
        });
        self.finish_with("insert FMEA item", result, event)
    }

    pub fn request_delete(&mut self, key: &NodeKey) -> Result<(), FmeaError> {
        let event = key.level().map(|level| FmeaEvent::Deleted {
            node: key.clone(),
            level,
        });
        let result = self.model.delete(key);
        self.finish_with("delete FMEA item", result, event)
    }

    pub fn request_update(&mut self, key: &NodeKey) -> Result<(), FmeaError> {
        let event = key.level().map(|level| FmeaEvent::Saved {
            node: key.clone(),
            level,
        });
        let result = self.model.update(key);
        self.finish_with("save FMEA item", result, event)
    }

    pub fn request_update_all(&mut self) -> Result<usize, FmeaError> {
        let result = self.model.update_all();
        let event = result.as_ref().ok().map(|&saved| FmeaEvent::SavedAll { saved });
        self.finish_with("save FMEA", result, event)
    }

    pub fn request_calculate_criticality(&mut self, item_hazard_rate: f64) -> Result<usize, FmeaError> {
        let result = self.model.calculate_criticality(item_hazard_rate);
        let event = result
            .as_ref()
            .ok()
            .map(|&modes| FmeaEvent::CalculatedCriticality { modes });
        self.finish_with("calculate criticality", result, event)
    }

    pub fn request_calculate_rpn(&mut self, key: &NodeKey, severity: i32, severity_new: i32) -> Result<(), FmeaError> {
        let result = self.model.calculate_rpn(key, severity, severity_new);
        self.finish("calculate RPN", result, || FmeaEvent::CalculatedRpn { node: key.clone() })
    }

    fn finish<T>(
        &self,
        operation: &str,
        result: Result<T, FmeaError>,
        event: impl FnOnce() -> FmeaEvent,
    ) -> Result<T, FmeaError> {
        let event = result.is_ok().then(event);
        self.finish_with(operation, result, event)
    }

    fn finish_with<T>(
        &self,
        operation: &str,
        result: Result<T, FmeaError>,
        event: Option<FmeaEvent>,
    ) -> Result<T, FmeaError> {
        match &result {
            Ok(_) => {
                if let Some(event) = event {
                    debug!(event = %event.name(), "Publishing FMEA event");
                    self.bus.publish(&event);
                }
            }
            Err(e) => {
                warn!(operation, code = e.code(), error = %e, "FMEA request failed");
            }
        }
        result
    }
}
