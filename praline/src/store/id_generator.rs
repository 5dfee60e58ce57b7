use log::info;
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::Rng;

const NODE_ID_BITS: u64 = 10;
const SEQUENCE_BITS: u64 = 12;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;
const MAX_NODE_ID: u64 = (1 << NODE_ID_BITS) - 1;
const TIMESTAMP_SHIFT: u64 = NODE_ID_BITS + SEQUENCE_BITS;
const EPOCH: u64 = 1288834974657;

/// Snowflake-style id generator: 64-bit ids composed of a millisecond
/// timestamp, a per-process node id, and a per-millisecond sequence.
///
/// Ids are unique within a process and roughly time-ordered across
/// processes, which keeps insertion order recoverable from id order.
pub(crate) struct IdGenerator {
    node_id: u64,
    state: Mutex<GeneratorState>,
}

struct GeneratorState {
    last_timestamp: u64,
    sequence: u64,
}

impl IdGenerator {
    pub(crate) fn new() -> Self {
        let node_id = derive_node_id();
        info!("Initialized id generator with node id: {}", node_id);
        IdGenerator {
            node_id,
            state: Mutex::new(GeneratorState {
                last_timestamp: 0,
                sequence: 0,
            }),
        }
    }

    pub(crate) fn next_id(&self) -> u64 {
        let mut state = self.state.lock();
        let mut timestamp = now_millis();

        // Tolerate a clock that stands still or steps backwards by holding
        // the last observed timestamp and exhausting its sequence space.
        if timestamp < state.last_timestamp {
            timestamp = state.last_timestamp;
        }

        if timestamp == state.last_timestamp {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                while timestamp <= state.last_timestamp {
                    std::thread::sleep(std::time::Duration::from_millis(1));
                    timestamp = now_millis();
                }
            }
        } else {
            state.sequence = 0;
        }
        state.last_timestamp = timestamp;

        ((timestamp - EPOCH) << TIMESTAMP_SHIFT)
            | (self.node_id << SEQUENCE_BITS)
            | state.sequence
    }
}

fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis() as u64
}

fn derive_node_id() -> u64 {
    let uuid = uuid::Uuid::new_v4();
    let uuid_byte = uuid.as_bytes()[15] as u64;
    let random_byte = OsRng.gen::<u64>() & 0xFF;
    ((uuid_byte << 2) ^ random_byte) & MAX_NODE_ID
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique_in_bulk() {
        let generator = IdGenerator::new();
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(generator.next_id()));
        }
    }

    #[test]
    fn ids_increase_over_time() {
        let generator = IdGenerator::new();
        let first = generator.next_id();
        let second = generator.next_id();
        assert!(second > first);
    }

    #[test]
    fn node_id_fits_its_bits() {
        for _ in 0..100 {
            assert!(derive_node_id() <= MAX_NODE_ID);
        }
    }
}
