//! Time-ordered account id generation.
//!
//! Ids are 63-bit snowflakes: 41 bits of milliseconds since a fixed
//! epoch, 5 bits of datacenter, 5 bits of worker, and a 12-bit
//! per-millisecond sequence. Generated ids therefore sort by creation
//! time, and two generators with distinct node ids never collide.

use chrono::Utc;
use parking_lot::Mutex;

/// 2024-01-01T00:00:00Z, the id epoch. Gives the 41-bit timestamp
/// space until roughly 2093.
const EPOCH_MILLIS: i64 = 1_704_067_200_000;

const SEQUENCE_BITS: u8 = 12;
const WORKER_BITS: u8 = 5;
const DATACENTER_BITS: u8 = 5;

const WORKER_SHIFT: u8 = SEQUENCE_BITS;
const DATACENTER_SHIFT: u8 = SEQUENCE_BITS + WORKER_BITS;
const TIMESTAMP_SHIFT: u8 = SEQUENCE_BITS + WORKER_BITS + DATACENTER_BITS;

const SEQUENCE_MASK: i64 = (1 << SEQUENCE_BITS) - 1;
const NODE_MASK: u8 = (1 << WORKER_BITS) - 1;

struct GeneratorState {
    last_timestamp: i64,
    sequence: i64,
}

/// Thread-safe snowflake generator.
///
/// Construct one per process and share it; the internal lock serializes
/// id composition, not the clock reads.
pub struct AccountIdGenerator {
    datacenter_id: i64,
    worker_id: i64,
    state: Mutex<GeneratorState>,
}

impl AccountIdGenerator {
    /// Creates a generator for the given node. Both ids are masked to
    /// their 5-bit range.
    pub fn new(datacenter_id: u8, worker_id: u8) -> Self {
        AccountIdGenerator {
            datacenter_id: i64::from(datacenter_id & NODE_MASK),
            worker_id: i64::from(worker_id & NODE_MASK),
            state: Mutex::new(GeneratorState {
                last_timestamp: -1,
                sequence: 0,
            }),
        }
    }

    /// Produces the next id.
    ///
    /// When the per-millisecond sequence is exhausted, or the wall
    /// clock steps backwards, this spins until the clock reaches a
    /// fresh millisecond.
    pub fn next_id(&self) -> i64 {
        let mut state = self.state.lock();

        let mut timestamp = current_millis();
        if timestamp < state.last_timestamp {
            timestamp = wait_until(state.last_timestamp);
        }

        if timestamp == state.last_timestamp {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                timestamp = wait_until(state.last_timestamp + 1);
            }
        } else {
            state.sequence = 0;
        }
        state.last_timestamp = timestamp;

        ((timestamp - EPOCH_MILLIS) << TIMESTAMP_SHIFT)
            | (self.datacenter_id << DATACENTER_SHIFT)
            | (self.worker_id << WORKER_SHIFT)
            | state.sequence
    }

    /// Produces the next id in its canonical decimal string form.
    pub fn next_id_string(&self) -> String {
        self.next_id().to_string()
    }

    /// Produces an id guaranteed to differ from `previous`.
    pub fn next_id_avoiding(&self, previous: &str) -> String {
        loop {
            let id = self.next_id_string();
            if id != previous {
                return id;
            }
        }
    }
}

fn current_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn wait_until(target: i64) -> i64 {
    loop {
        let now = current_millis();
        if now >= target {
            return now;
        }
        std::hint::spin_loop();
    }
}
