/*
 * Clipboard addressing: copy a word of a prior call's return data into a
 * later call's arguments at execution time
 */

use ethers::types::Bytes;

const TYPE_EMPTY: u8 = 0x00;
const TYPE_SINGLE_PASTE: u8 = 0x01;

/// Return data is ABI `bytes`: a 32-byte length prefix precedes the words.
const RETURN_DATA_PREFIX: usize = 32;
/// Call data is a `bytes` in memory (32-byte length) plus a 4-byte selector.
const CALL_DATA_PREFIX: usize = 32 + 4;
const WORD: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardRef {
    pub source_tag: String,
    pub copy_byte_offset: usize,
    pub paste_slot: usize,
}

impl ClipboardRef {
    #[must_use]
    pub fn from_slots(source_tag: impl Into<String>, copy_slot: usize, paste_slot: usize) -> Self {
        Self {
            source_tag: source_tag.into(),
            copy_byte_offset: RETURN_DATA_PREFIX + copy_slot * WORD,
            paste_slot,
        }
    }

    #[must_use]
    pub fn paste_byte_offset(&self) -> usize {
        CALL_DATA_PREFIX + self.paste_slot * WORD
    }

    #[must_use]
    pub fn resolve(&self, return_data_index: usize) -> Clipboard {
        Clipboard::Paste {
            return_data_index,
            copy_byte_offset: self.copy_byte_offset,
            paste_byte_offset: self.paste_byte_offset(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clipboard {
    Empty,
    Paste {
        return_data_index: usize,
        copy_byte_offset: usize,
        paste_byte_offset: usize,
    },
}

fn uint80(value: usize) -> [u8; 10] {
    let wide = (value as u128).to_be_bytes();
    let mut out = [0u8; 10];
    out.copy_from_slice(&wide[6..]);
    out
}

fn read_uint80(bytes: &[u8]) -> usize {
    let mut wide = [0u8; 16];
    wide[6..].copy_from_slice(bytes);
    usize::try_from(u128::from_be_bytes(wide)).unwrap_or(usize::MAX)
}

impl Clipboard {
    #[must_use]
    pub fn encode(&self) -> Bytes {
        match *self {
            Clipboard::Empty => Bytes::from(vec![TYPE_EMPTY, 0x00]),
            Clipboard::Paste {
                return_data_index,
                copy_byte_offset,
                paste_byte_offset,
            } => {
                let mut out = Vec::with_capacity(32);
                out.extend_from_slice(&[TYPE_SINGLE_PASTE, 0x00]);
                out.extend_from_slice(&uint80(return_data_index));
                out.extend_from_slice(&uint80(copy_byte_offset));
                out.extend_from_slice(&uint80(paste_byte_offset));
                Bytes::from(out)
            }
        }
    }

    #[must_use]
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        match bytes.first().copied()? {
            TYPE_EMPTY => Some(Clipboard::Empty),
            TYPE_SINGLE_PASTE if bytes.len() >= 32 => Some(Clipboard::Paste {
                return_data_index: read_uint80(&bytes[2..12]),
                copy_byte_offset: read_uint80(&bytes[12..22]),
                paste_byte_offset: read_uint80(&bytes[22..32]),
            }),
            _ => None,
        }
    }
}
