#![cfg_attr(target_os = "none", no_std)]

//! Wire protocol for the display-slave serial link.
//!
//! Frames are `[SYNC0][SYNC1][LEN][stuffed payload]` with no trailer and no
//! CRC. The payload is byte-stuffed so that framing never depends on zero
//! delimiters; `LEN` covers the stuffed bytes only. This crate is shared
//! between the slave firmware and the host-side provisioning tools, so it
//! holds nothing but constants, codecs, and the command/result vocabulary.

pub mod cobs;

/// First sync byte of every frame.
pub const SYNC0: u8 = 0xA5;
/// Second sync byte of every frame.
pub const SYNC1: u8 = 0x5A;

/// Upper bound on the stuffed payload length carried by one frame.
pub const MAX_FRAME_PAYLOAD: usize = 112;
/// Upper bound on the raw (unstuffed) command + payload bytes.
pub const MAX_RAW_PAYLOAD: usize = MAX_FRAME_PAYLOAD - 1;
/// Frame overhead: two sync bytes plus the length byte.
pub const FRAME_HEADER_LEN: usize = 3;

/// Reported by `Ping` responses.
pub const PROTOCOL_VERSION: u8 = 1;
/// Capability word reported by `Ping`; no optional features are defined yet.
pub const CAPABILITIES: u16 = 0;

/// Command byte, the first decoded byte of every host frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq, num_derive::FromPrimitive, num_derive::ToPrimitive)]
pub enum Opcode {
    /// Liveness probe; responds with version and capability bytes.
    Ping = 0x00,
    /// One descriptor object, prefixed by a flags byte (see [`JsonFlags`]).
    Json = 0x01,
    /// Reserved for aborting a future streamed transfer. Accepted, no effect.
    JsonAbort = 0x03,
    /// Jump to a base screen ordinal without animation.
    SetActiveScreen = 0x10,
    /// Status snapshot; reading clears the dirty state.
    GetStatus = 0x20,
    /// Slide to a base screen ordinal, or set an explicit scroll offset.
    ScrollToScreen = 0x21,
    /// Read back one element's runtime state.
    GetElementState = 0x22,
    /// Present a full-overlay screen for a bounded duration.
    ShowOverlay = 0x30,
    /// Inject a remote button event.
    InputEvent = 0x41,
    /// Drain TX, power the panel down, and wait for a wake edge. No response.
    GotoStandby = 0x50,
}

/// First byte of every response payload.
#[derive(Debug, Copy, Clone, PartialEq, Eq, num_derive::FromPrimitive, num_derive::ToPrimitive)]
pub enum RetCode {
    Ok = 0x00,
    BadLen = 0x01,
    BadState = 0x02,
    UnknownId = 0x03,
    Range = 0x04,
    Internal = 0x05,
    ParseFail = 0x0B,
    NoSpace = 0x0C,
    StreamErr = 0x0D,
}

bitflags::bitflags! {
    /// Flags byte preceding the descriptor text in a `Json` command.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct JsonFlags: u8 {
        /// Wipe the arena and all UI state before parsing this descriptor.
        const HEAD = 0b0000_0001;
        /// Mark the model initialized and request a render after parsing.
        const COMMIT = 0b0000_0010;
    }
}

bitflags::bitflags! {
    /// Flags byte in the `GetStatus` response.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct StatusFlags: u8 {
        /// A COMMIT has been applied since the last HEAD.
        const INITIALIZED = 0b0000_0001;
        /// At least one element changed since the previous read.
        const DIRTY = 0b0000_0010;
        /// An overlay screen is currently presented.
        const OVERLAY = 0b0000_0100;
    }
}

bitflags::bitflags! {
    /// Flags byte of the long-form `ShowOverlay` payload.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct OverlayFlags: u8 {
        /// While the overlay is up, drop every button except OK.
        const MASK_INPUT = 0b0000_0001;
    }
}

/// Logical button indices carried by `InputEvent` and shared with the local
/// button scanner.
#[derive(Debug, Copy, Clone, PartialEq, Eq, num_derive::FromPrimitive, num_derive::ToPrimitive)]
pub enum Button {
    Up = 0,
    Down = 1,
    Ok = 2,
    Back = 3,
    Left = 4,
    Right = 5,
}

/// `InputEvent` event byte for a button release; only releases are acted on.
pub const EVENT_RELEASE: u8 = 0;

/// Sentinel `dirty_id` meaning "nothing changed since the last read".
pub const DIRTY_NONE: u8 = 0xFF;

/// Default overlay presentation time when the short payload form is used.
pub const OVERLAY_DEFAULT_MS: u16 = 1200;

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::FromPrimitive;

    #[test]
    fn opcode_bytes_round_trip() {
        for op in [
            Opcode::Ping,
            Opcode::Json,
            Opcode::JsonAbort,
            Opcode::SetActiveScreen,
            Opcode::GetStatus,
            Opcode::ScrollToScreen,
            Opcode::GetElementState,
            Opcode::ShowOverlay,
            Opcode::InputEvent,
            Opcode::GotoStandby,
        ] {
            assert_eq!(Opcode::from_u8(op as u8), Some(op));
        }
        assert_eq!(Opcode::from_u8(0x02), None);
        assert_eq!(Opcode::from_u8(0xFE), None);
    }

    #[test]
    fn status_flags_pack() {
        let f = StatusFlags::INITIALIZED | StatusFlags::DIRTY;
        assert_eq!(f.bits(), 0x03);
        assert!(!f.contains(StatusFlags::OVERLAY));
    }
}
