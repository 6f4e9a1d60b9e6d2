//! Meter value decoding.
//!
//! All meters share one VITA-49 stream (class 0x8002) whose payload is a
//! flat list of `(id, value)` pairs. Each value is scaled according to the
//! unit its [`Meter`](crate::objects::Meter) definition declared, and a
//! [`RadioEvent::MeterUpdated`] is sent only when the converted value
//! changes.

use std::collections::HashSet;
use std::sync::Arc;

use flexsync_core::{ObjectId, RadioEvent, Result};

use crate::registry::Registry;
use crate::vita49::{self, PayloadLayout};

pub struct MeterDecoder {
    registry: Arc<Registry>,
    layout: PayloadLayout,
}

impl MeterDecoder {
    pub fn new(registry: Arc<Registry>, layout: PayloadLayout) -> Self {
        MeterDecoder { registry, layout }
    }

    /// Decode one meter packet payload.
    ///
    /// Returns the number of meters whose value changed. Readings for ids
    /// without a complete definition are ignored, as are repeats of an id
    /// already seen in the same packet (some firmware sends duplicates).
    pub fn decode(&self, payload: &[u8]) -> Result<usize> {
        let readings = vita49::parse_meter_payload(payload)?;
        let meters = self.registry.meters();

        let mut seen = HashSet::with_capacity(readings.len());
        let mut updated = 0;
        for reading in readings {
            if !seen.insert(reading.meter_id) {
                tracing::trace!(id = reading.meter_id, "Skipping duplicate meter reading");
                continue;
            }
            let id = reading.meter_id as u32;
            let Some(entry) = meters.get_initialized(&ObjectId::Index(id)) else {
                tracing::trace!(id, "Reading for undefined meter");
                continue;
            };

            let changed = {
                let mut meter = entry.write();
                let value = meter.unit().scale(reading.value, self.layout);
                meter.set_value(value).then_some(value)
            };
            if let Some(value) = changed {
                updated += 1;
                let _ = self
                    .registry
                    .events()
                    .send(RadioEvent::MeterUpdated { id, value });
            }
        }
        Ok(updated)
    }
}
