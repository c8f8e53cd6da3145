// pouirup Input Layer - Multitouch Decoding
// Slot-based ABS_MT events to finger positions in inches

use crate::geometry::Position;

use super::event::{FingerId, FingerPositions};

pub const ABS_MT_SLOT: u16 = 0x2f;
pub const ABS_MT_POSITION_X: u16 = 0x35;
pub const ABS_MT_POSITION_Y: u16 = 0x36;
pub const ABS_MT_TRACKING_ID: u16 = 0x39;

const MM_PER_INCH: f64 = 25.4;
const MAX_SLOTS: usize = 16;

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    tracking_id: Option<i32>,
    x: i32,
    y: i32,
}

/// Decoder for the type B multitouch protocol.
///
/// Feed every `EV_ABS` event, then call [`frame`](Self::frame) on each
/// `SYN_REPORT`.
#[derive(Debug, Clone)]
pub struct MultitouchDecoder {
    slots: Vec<Slot>,
    current: usize,
    units_per_inch_x: f64,
    units_per_inch_y: f64,
    changed: bool,
}

impl MultitouchDecoder {
    /// `x_resolution`/`y_resolution` are the axis resolutions in units
    /// per millimetre; a zero resolution is treated as 1.
    pub fn new(x_resolution: i32, y_resolution: i32) -> Self {
        let per_inch = |res: i32| f64::from(res.max(1)) * MM_PER_INCH;
        Self {
            slots: vec![Slot::default(); MAX_SLOTS],
            current: 0,
            units_per_inch_x: per_inch(x_resolution),
            units_per_inch_y: per_inch(y_resolution),
            changed: false,
        }
    }

    pub fn feed(&mut self, code: u16, value: i32) {
        if code == ABS_MT_SLOT {
            self.current = usize::try_from(value).unwrap_or(usize::MAX);
            return;
        }
        let Some(slot) = self.slots.get_mut(self.current) else {
            return;
        };
        match code {
            ABS_MT_TRACKING_ID => {
                slot.tracking_id = (value >= 0).then_some(value);
            }
            ABS_MT_POSITION_X => slot.x = value,
            ABS_MT_POSITION_Y => slot.y = value,
            _ => return,
        }
        self.changed = true;
    }

    /// Positions of all touching fingers if anything changed since the
    /// last frame. An empty map reports that every finger lifted.
    pub fn frame(&mut self) -> Option<FingerPositions> {
        if !self.changed {
            return None;
        }
        self.changed = false;
        Some(
            self.slots
                .iter()
                .filter_map(|slot| {
                    let id = slot.tracking_id?;
                    let position = Position::new(
                        f64::from(slot.x) / self.units_per_inch_x,
                        f64::from(slot.y) / self.units_per_inch_y,
                    );
                    Some((FingerId(id), position))
                })
                .collect(),
        )
    }
}
