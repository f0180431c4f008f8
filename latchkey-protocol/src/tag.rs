//! Tag identifier types

/// Length of a decoded tag identifier in bytes
pub const TAG_ID_LEN: usize = 5;

/// Length of a tag identifier as sent by the reader (ASCII hex)
pub const TAG_HEX_LEN: usize = TAG_ID_LEN * 2;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// 5-byte RFID tag identifier
///
/// Equality is byte-wise. The all-zero value is reserved as the empty-slot
/// sentinel of the allow-list and never counts as a match there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TagId([u8; TAG_ID_LEN]);

impl TagId {
    /// The empty-slot sentinel
    pub const EMPTY: TagId = TagId([0; TAG_ID_LEN]);

    /// Create an identifier from raw bytes
    pub const fn new(bytes: [u8; TAG_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Create an identifier from the first five bytes of a record
    ///
    /// Returns `None` if `record` is shorter than five bytes.
    pub fn from_record(record: &[u8]) -> Option<Self> {
        let bytes: [u8; TAG_ID_LEN] = record.get(..TAG_ID_LEN)?.try_into().ok()?;
        Some(Self(bytes))
    }

    /// Raw identifier bytes
    pub const fn as_bytes(&self) -> &[u8; TAG_ID_LEN] {
        &self.0
    }

    /// Check whether this is the empty-slot sentinel
    pub fn is_empty(&self) -> bool {
        self.0 == [0; TAG_ID_LEN]
    }

    /// XOR of all identifier bytes, as carried in the reader frame
    pub fn checksum(&self) -> u8 {
        self.0.iter().fold(0, |acc, b| acc ^ b)
    }

    /// Uppercase ASCII hex rendering, as the reader sends it
    pub fn to_hex(&self) -> [u8; TAG_HEX_LEN] {
        let mut out = [0u8; TAG_HEX_LEN];
        for (i, &byte) in self.0.iter().enumerate() {
            out[i * 2..i * 2 + 2].copy_from_slice(&hex_byte(byte));
        }
        out
    }
}

impl From<[u8; TAG_ID_LEN]> for TagId {
    fn from(bytes: [u8; TAG_ID_LEN]) -> Self {
        Self(bytes)
    }
}

/// A checksum-validated frame from the reader
///
/// Only [`crate::TagFrameParser`] constructs these, so holding a `TagFrame`
/// means the checksum matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TagFrame {
    raw: [u8; TAG_HEX_LEN],
    id: TagId,
}

impl TagFrame {
    pub(crate) const fn new(raw: [u8; TAG_HEX_LEN], id: TagId) -> Self {
        Self { raw, id }
    }

    /// The ten identifier characters exactly as received
    pub const fn raw(&self) -> &[u8; TAG_HEX_LEN] {
        &self.raw
    }

    /// The decoded identifier
    pub const fn id(&self) -> TagId {
        self.id
    }
}

/// Render one byte as two uppercase ASCII hex digits
pub(crate) const fn hex_byte(byte: u8) -> [u8; 2] {
    [HEX_DIGITS[(byte >> 4) as usize], HEX_DIGITS[(byte & 0x0F) as usize]]
}

/// Convert one ASCII hex digit to its value
///
/// Only `'0'..='9'` and `'A'..='F'` are translated; any other byte passes
/// through unchanged, matching the reader firmware this talks to.
pub(crate) const fn hex_nibble(byte: u8) -> u8 {
    match byte {
        b'0'..=b'9' => byte - b'0',
        b'A'..=b'F' => byte - b'A' + 10,
        _ => byte,
    }
}

/// Combine two ASCII hex digits into a byte, high nibble first
pub(crate) const fn hex_pair(high: u8, low: u8) -> u8 {
    (hex_nibble(high) << 4) | hex_nibble(low)
}
