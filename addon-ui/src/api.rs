//! Element vocabulary and the internal error taxonomy.

use addon_proto::RetCode;

/// Sentinel id: "no parent", "no focus", "no element".
pub const NO_ELEMENT: u8 = 0xFF;

/// Element type byte as stored in the arena meta table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, num_derive::FromPrimitive, num_derive::ToPrimitive)]
pub enum ElementKind {
    /// Rendering context root; base, overlay, or local depending on parent
    /// and role.
    Screen = 1,
    /// Scrollable column of text rows.
    List = 2,
    /// Drawable label with a fixed-capacity string.
    Text = 3,
    /// Selector over its text children.
    Barrel = 4,
    /// Action element carrying a version counter.
    Trigger = 5,
}

impl ElementKind {
    /// Kinds the focus cursor can land on.
    pub fn focusable(self) -> bool {
        matches!(self, ElementKind::List | ElementKind::Barrel | ElementKind::Trigger)
    }
}

/// Screen role attribute values.
#[derive(Debug, Copy, Clone, PartialEq, Eq, num_derive::FromPrimitive, num_derive::ToPrimitive)]
pub enum ScreenRole {
    None = 0,
    FullOverlay = 1,
}

/// Internal result taxonomy; maps 1:1 onto the wire result codes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UiError {
    BadLen,
    BadState,
    UnknownId,
    Range,
    Internal,
    ParseFail,
    NoSpace,
    StreamErr,
}

impl UiError {
    pub fn ret_code(self) -> RetCode {
        match self {
            UiError::BadLen => RetCode::BadLen,
            UiError::BadState => RetCode::BadState,
            UiError::UnknownId => RetCode::UnknownId,
            UiError::Range => RetCode::Range,
            UiError::Internal => RetCode::Internal,
            UiError::ParseFail => RetCode::ParseFail,
            UiError::NoSpace => RetCode::NoSpace,
            UiError::StreamErr => RetCode::StreamErr,
        }
    }
}

pub type UiResult<T> = Result<T, UiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::FromPrimitive;

    #[test]
    fn kind_bytes_round_trip() {
        for kind in [
            ElementKind::Screen,
            ElementKind::List,
            ElementKind::Text,
            ElementKind::Barrel,
            ElementKind::Trigger,
        ] {
            assert_eq!(ElementKind::from_u8(kind as u8), Some(kind));
        }
        assert_eq!(ElementKind::from_u8(0), None);
        assert_eq!(ElementKind::from_u8(6), None);
    }

    #[test]
    fn focusable_kinds() {
        assert!(ElementKind::List.focusable());
        assert!(ElementKind::Barrel.focusable());
        assert!(ElementKind::Trigger.focusable());
        assert!(!ElementKind::Screen.focusable());
        assert!(!ElementKind::Text.focusable());
    }

    #[test]
    fn error_to_wire() {
        assert_eq!(UiError::NoSpace.ret_code() as u8, 0x0C);
        assert_eq!(UiError::ParseFail.ret_code() as u8, 0x0B);
        assert_eq!(UiError::StreamErr.ret_code() as u8, 0x0D);
    }
}
