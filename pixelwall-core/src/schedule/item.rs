//! Playlist items

use alloc::vec::Vec;

use pixelwall_protocol::ScheduleEntry;

use crate::plugin::PluginId;

/// One rotation step: show `plugin_id` for `duration_ms`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScheduleItem {
    pub plugin_id: PluginId,
    /// Always greater than zero
    pub duration_ms: u64,
}

impl ScheduleItem {
    /// Convert a wire entry; zero durations are not eligible
    pub fn from_entry(entry: &ScheduleEntry) -> Option<Self> {
        if entry.duration == 0 {
            return None;
        }
        Some(Self {
            plugin_id: entry.plugin_id,
            duration_ms: entry.duration as u64 * 1000,
        })
    }

    /// Convert back to a wire entry with the duration in whole seconds
    pub fn to_entry(&self) -> ScheduleEntry {
        let seconds = u32::try_from(self.duration_ms / 1000).unwrap_or(u32::MAX);
        ScheduleEntry::new(self.plugin_id, seconds)
    }
}

/// Convert wire entries to items, dropping ineligible ones
pub fn items_from_entries(entries: &[ScheduleEntry]) -> Vec<ScheduleItem> {
    entries.iter().filter_map(ScheduleItem::from_entry).collect()
}

/// Convert items to wire entries
pub fn entries_from_items(items: &[ScheduleItem]) -> Vec<ScheduleEntry> {
    items.iter().map(ScheduleItem::to_entry).collect()
}
