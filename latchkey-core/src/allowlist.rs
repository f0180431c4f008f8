//! Allow-list store
//!
//! A fixed table of [`ALLOW_LIST_CAPACITY`] tag identifiers, replaced
//! wholesale from a server payload. Unused slots hold [`TagId::EMPTY`],
//! which never matches a lookup.

use latchkey_protocol::{TagId, TAG_ID_LEN};

/// Number of slots in the allow-list
pub const ALLOW_LIST_CAPACITY: usize = 200;

/// Size of a reload payload: one 5-byte record per slot
pub const RELOAD_PAYLOAD_LEN: usize = ALLOW_LIST_CAPACITY * TAG_ID_LEN;

/// Allow-list errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AllowListError {
    /// Payload was not exactly [`RELOAD_PAYLOAD_LEN`] bytes
    WrongLength { len: usize },
}

/// The live table of authorized tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList {
    slots: [TagId; ALLOW_LIST_CAPACITY],
}

impl Default for AllowList {
    fn default() -> Self {
        Self::new()
    }
}

impl AllowList {
    /// Create an empty table (every slot holds the sentinel)
    pub const fn new() -> Self {
        Self {
            slots: [TagId::EMPTY; ALLOW_LIST_CAPACITY],
        }
    }

    /// Check whether `id` is authorized
    ///
    /// The sentinel is never authorized, even though empty slots hold it.
    pub fn lookup(&self, id: &TagId) -> bool {
        self.position(id).is_some()
    }

    /// Index of the first slot holding `id`
    pub fn position(&self, id: &TagId) -> Option<usize> {
        if id.is_empty() {
            return None;
        }
        self.slots.iter().position(|slot| slot == id)
    }

    /// Replace every slot from a payload of contiguous 5-byte records
    ///
    /// Slot order equals payload order.
    pub fn replace(&mut self, payload: &[u8; RELOAD_PAYLOAD_LEN]) {
        for (slot, record) in self.slots.iter_mut().zip(payload.chunks_exact(TAG_ID_LEN)) {
            // chunks_exact yields exactly TAG_ID_LEN bytes
            *slot = TagId::from_record(record).unwrap_or(TagId::EMPTY);
        }
    }

    /// Replace every slot from a slice, checking its length first
    pub fn replace_from_slice(&mut self, payload: &[u8]) -> Result<(), AllowListError> {
        let payload: &[u8; RELOAD_PAYLOAD_LEN] = payload
            .try_into()
            .map_err(|_| AllowListError::WrongLength { len: payload.len() })?;
        self.replace(payload);
        Ok(())
    }

    /// Total number of slots
    pub const fn capacity(&self) -> usize {
        ALLOW_LIST_CAPACITY
    }

    /// Number of slots holding a real identifier
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| !slot.is_empty()).count()
    }

    /// Check whether no slot holds a real identifier
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(TagId::is_empty)
    }

    /// Check whether every slot holds a real identifier
    pub fn is_full(&self) -> bool {
        self.slots.iter().all(|slot| !slot.is_empty())
    }

    /// Slot at `index`, sentinel included
    pub fn get(&self, index: usize) -> Option<&TagId> {
        self.slots.get(index)
    }
}

/// Staging area for an incoming reload
///
/// Bytes accumulate here while a transfer is in flight. The live table is
/// only touched once the buffer [`is_complete`](Self::is_complete).
#[derive(Debug, Clone)]
pub struct ReloadBuffer {
    data: [u8; RELOAD_PAYLOAD_LEN],
    filled: usize,
}

impl Default for ReloadBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReloadBuffer {
    /// Create an empty buffer
    pub const fn new() -> Self {
        Self {
            data: [0; RELOAD_PAYLOAD_LEN],
            filled: 0,
        }
    }

    /// Discard any staged bytes
    pub fn clear(&mut self) {
        self.filled = 0;
    }

    /// Unfilled tail of the buffer, for the next read
    pub fn remaining_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.filled..]
    }

    /// Mark `n` more bytes as received
    pub fn advance(&mut self, n: usize) {
        self.filled = (self.filled + n).min(RELOAD_PAYLOAD_LEN);
    }

    /// Number of bytes received so far
    pub fn filled(&self) -> usize {
        self.filled
    }

    /// Check whether the full payload has arrived
    pub fn is_complete(&self) -> bool {
        self.filled == RELOAD_PAYLOAD_LEN
    }

    /// The complete payload, if every byte has arrived
    pub fn as_payload(&self) -> Option<&[u8; RELOAD_PAYLOAD_LEN]> {
        if self.is_complete() {
            Some(&self.data)
        } else {
            None
        }
    }
}
