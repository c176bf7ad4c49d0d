//! Digitizer report encoding.
//!
//! A frame is one single-contact report: a state byte followed by absolute
//! little-endian X and Y in the `0..=32767` logical range.

/// Upper bound of the protocol coordinate space.
pub const PROTOCOL_MAX: u16 = 32767;

/// Report ID the descriptor assigns to the digitizer input report.
pub const REPORT_ID: u8 = 0x01;

/// Size of an encoded frame payload, excluding the report ID.
pub const FRAME_LEN: usize = 5;

/// HID report descriptor for a single-contact digitizer (pen class) with
/// tip switch, in-range bit and 16-bit absolute X/Y.
pub const REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x0D, // Usage Page (Digitizers)
    0x09, 0x02, // Usage (Pen)
    0xA1, 0x01, // Collection (Application)
    0x85, REPORT_ID, //   Report ID
    0x09, 0x20, //   Usage (Stylus)
    0xA1, 0x00, //   Collection (Physical)
    0x09, 0x42, //     Usage (Tip Switch)
    0x15, 0x00, //     Logical Minimum (0)
    0x25, 0x01, //     Logical Maximum (1)
    0x75, 0x01, //     Report Size (1)
    0x95, 0x01, //     Report Count (1)
    0x81, 0x02, //     Input (Data,Var,Abs)
    0x09, 0x44, //     Usage (Barrel Switch)
    0x81, 0x02, //     Input (Data,Var,Abs)
    0x09, 0x32, //     Usage (In Range)
    0x81, 0x02, //     Input (Data,Var,Abs)
    0x95, 0x05, //     Report Count (5)
    0x81, 0x03, //     Input (Const) padding
    0x05, 0x01, //     Usage Page (Generic Desktop)
    0x09, 0x30, //     Usage (X)
    0x16, 0x00, 0x00, //     Logical Minimum (0)
    0x26, 0xFF, 0x7F, //     Logical Maximum (32767)
    0x75, 0x10, //     Report Size (16)
    0x95, 0x01, //     Report Count (1)
    0x81, 0x02, //     Input (Data,Var,Abs)
    0x09, 0x31, //     Usage (Y)
    0x81, 0x02, //     Input (Data,Var,Abs)
    0xC0, //   End Collection
    0xC0, // End Collection
];

/// Contact state carried in the first byte of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ContactState {
    /// In range, not touching.
    Hover = 0x04,
    /// In range and touching.
    Contact = 0x05,
}

impl ContactState {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// One digitizer report in protocol coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub state: ContactState,
    pub x: u16,
    pub y: u16,
}

impl Frame {
    pub fn hover(x: u16, y: u16) -> Self {
        Self {
            state: ContactState::Hover,
            x,
            y,
        }
    }

    pub fn contact(x: u16, y: u16) -> Self {
        Self {
            state: ContactState::Contact,
            x,
            y,
        }
    }

    /// Encode as `[state, x_lo, x_hi, y_lo, y_hi]`.
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let [x_lo, x_hi] = self.x.to_le_bytes();
        let [y_lo, y_hi] = self.y.to_le_bytes();
        [self.state.code(), x_lo, x_hi, y_lo, y_hi]
    }
}

/// Map a device pixel in `[0, max_pixel]` onto `[0, PROTOCOL_MAX]`.
///
/// Out-of-range input saturates at the nearest end of the range.
pub fn map_to_protocol(value: i32, max_pixel: i32) -> u16 {
    if max_pixel <= 0 {
        return 0;
    }
    let clamped = i64::from(value.clamp(0, max_pixel));
    (clamped * i64::from(PROTOCOL_MAX) / i64::from(max_pixel)) as u16
}

/// Clamp an interpolated protocol-space coordinate into range.
pub fn saturate(value: i64) -> u16 {
    value.clamp(0, i64::from(PROTOCOL_MAX)) as u16
}
