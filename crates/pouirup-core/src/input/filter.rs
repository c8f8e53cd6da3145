// pouirup Input Layer - Device Filtering
// Which detected devices the hook opens

use super::device::{is_virtual_device, DeviceKind};

/// Check if a device should be opened.
///
/// With an explicit filter, a device is used when its path or name is
/// listed. Without one, every non-virtual device of a known kind is used.
/// Unclassified devices are never used: the hook has nothing to read
/// from them.
pub fn matches_device_filter(
    device_name: &str,
    device_path: &str,
    filter_names: &[String],
    kind: Option<DeviceKind>,
) -> bool {
    if kind.is_none() || is_virtual_device(device_name) {
        return false;
    }
    if filter_names.is_empty() {
        return true;
    }
    filter_names
        .iter()
        .any(|wanted| device_path == wanted || device_name == wanted)
}
