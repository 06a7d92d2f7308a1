// Display topology types.
//
// The OS-level enumerator is injected behind the `DisplayEnumerator` trait so
// the overlay lifecycle can be driven by fakes in tests. Display ids are
// whatever stable identifier the platform hands out (device path on Windows);
// they are the sole join key between live overlay windows and persisted
// configuration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a physical display, assigned by the OS.
/// Assumed stable for the monitor's connected lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayId(pub String);

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DisplayId {
    fn from(value: &str) -> Self {
        DisplayId(value.to_string())
    }
}

impl From<String> for DisplayId {
    fn from(value: String) -> Self {
        DisplayId(value)
    }
}

/// Display bounding rectangle in virtual-screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Bounds {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A usable display rectangle has strictly positive dimensions.
    pub fn is_well_formed(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// One physical display as reported by the enumerator. Read-only to the
/// overlay core; appears and disappears with monitor hotplug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayDescriptor {
    pub id: DisplayId,
    pub bounds: Bounds,
}

/// Current display topology, queried fresh on every overlay rebuild.
pub trait DisplayEnumerator {
    fn displays(&self) -> Vec<DisplayDescriptor>;
}

/// Physical display topology change. All variants are handled identically:
/// the full overlay set is torn down and rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotplugEvent {
    Added,
    Removed,
    MetricsChanged,
}
