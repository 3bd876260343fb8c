//! Engine configuration.

use serde::{Deserialize, Serialize};

use midithru_midi::{LIST_HEADER_BYTES, PACKET_HEADER_BYTES, PACKET_LIST_SIZE};

use crate::error::{Error, Result};

/// Default event queue slots.
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// Smallest packet budget that still holds one maximal (3-byte) packet.
pub const MIN_PACKET_BUDGET: usize = LIST_HEADER_BYTES + PACKET_HEADER_BYTES + 3;

/// Sizing knobs for one engine instance, fixed at build time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Event queue slots; must be a nonzero power of two.
    pub queue_capacity: usize,
    /// Packet list byte budget per render quantum.
    pub packet_budget: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            packet_budget: PACKET_LIST_SIZE,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 || !self.queue_capacity.is_power_of_two() {
            return Err(Error::InvalidConfig(format!(
                "queue capacity {} is not a nonzero power of two",
                self.queue_capacity
            )));
        }
        if self.packet_budget < MIN_PACKET_BUDGET {
            return Err(Error::InvalidConfig(format!(
                "packet budget {} cannot hold one packet (minimum {MIN_PACKET_BUDGET})",
                self.packet_budget
            )));
        }
        Ok(())
    }
}
