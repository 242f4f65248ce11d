//! Plugin registry and active-slot management

use alloc::boxed::Box;
use alloc::vec::Vec;

use embedded_hal::delay::DelayNs;
use pixelwall_hal::{FrameBuffer, KeyValueStore, StorageKey};
use pixelwall_protocol::{PluginInfo, SystemStatus};
use serde_json::Value;

use super::{Plugin, PluginId};
use crate::persist;

/// Settling time between tearing down one plugin and starting the next
pub const SETTLE_DELAY_MS: u32 = 100;

struct Registered {
    id: PluginId,
    plugin: Box<dyn Plugin>,
}

/// Owner of every registered plugin and of the single active slot
pub struct PluginManager<D, T> {
    display: D,
    delay: T,
    plugins: Vec<Registered>,
    /// Index into `plugins`
    active: Option<usize>,
}

impl<D: FrameBuffer, T: DelayNs> PluginManager<D, T> {
    /// Create an empty manager driving `display`
    pub fn new(display: D, delay: T) -> Self {
        Self {
            display,
            delay,
            plugins: Vec::new(),
            active: None,
        }
    }

    /// Register a plugin and return its id
    ///
    /// Must be called during initialization, before any activation.
    pub fn register(&mut self, plugin: Box<dyn Plugin>) -> PluginId {
        let id = self.plugins.len() as PluginId + 1;
        debug!("Registered plugin {} as {}", plugin.name(), id);
        self.plugins.push(Registered { id, plugin });
        id
    }

    /// Activate the first plugin named `name`
    ///
    /// Any active plugin is torn down first, even when nothing matches; an
    /// unknown name therefore leaves the slot empty.
    pub fn activate_by_name(&mut self, name: &str) -> Option<PluginId> {
        if let Some(index) = self.active.take() {
            self.plugins[index].plugin.teardown();
            self.delay.delay_ms(SETTLE_DELAY_MS);
        }

        let Some(index) = self.plugins.iter().position(|p| p.plugin.name() == name) else {
            warn!("No plugin named {}", name);
            return None;
        };

        self.display.clear();
        self.active = Some(index);
        let entry = &mut self.plugins[index];
        entry.plugin.setup(&mut self.display);
        info!("Activated plugin {} ({})", entry.id, name);
        Some(entry.id)
    }

    /// Activate a plugin by id; unknown ids are ignored
    pub fn activate_by_id(&mut self, id: PluginId) -> Option<PluginId> {
        match self.name_of(id) {
            Some(name) => self.activate_by_name(name),
            None => {
                warn!("No plugin with id {}", id);
                None
            }
        }
    }

    /// Activate the plugin after the active one, wrapping to the first
    pub fn activate_next(&mut self) -> Option<PluginId> {
        let last = self.plugins.len() as PluginId;
        let next = match self.active_id() {
            Some(id) if id < last => id + 1,
            _ => 1,
        };
        self.activate_by_id(next)
    }

    /// Restore the boot selection from the store
    ///
    /// The persisted name wins over the persisted id, which only exists for
    /// stores written by older firmware. Falls back to the first registered
    /// plugin, then persists whatever became active.
    pub fn restore_from_persistence<S: KeyValueStore + ?Sized>(
        &mut self,
        store: &mut S,
    ) -> Option<PluginId> {
        let name = persist::load_string(store, StorageKey::PluginName)
            .filter(|name| self.id_of(name).is_some());
        let restored = match name {
            Some(name) => self.activate_by_name(&name),
            None => None,
        };

        if restored.is_none() {
            let id = persist::load_i32(store, StorageKey::CurrentPlugin)
                .and_then(|raw| PluginId::try_from(raw).ok())
                .filter(|id| self.name_of(*id).is_some());
            if let Some(id) = id {
                self.activate_by_id(id);
            }
        }

        if self.active.is_none() && !self.plugins.is_empty() {
            self.activate_by_id(1);
        }

        if self.active.is_some() {
            self.persist_active(store);
        }
        self.active_id()
    }

    /// Store the active plugin's id and name, best-effort
    pub fn persist_active<S: KeyValueStore + ?Sized>(&self, store: &mut S) {
        let Some(index) = self.active else {
            return;
        };
        let entry = &self.plugins[index];
        persist::store_i32(store, StorageKey::CurrentPlugin, entry.id as i32);
        persist::store_str(store, StorageKey::PluginName, entry.plugin.name());
    }

    /// Run one iteration of the active plugin
    ///
    /// Suppressed while the system status is not nominal. Returns true if a
    /// plugin ran.
    pub fn run_active(&mut self, status: SystemStatus) -> bool {
        if !status.is_nominal() {
            return false;
        }
        match self.active {
            Some(index) => {
                self.plugins[index].plugin.run(&mut self.display);
                true
            }
            None => false,
        }
    }

    /// Offer a control message to the active plugin
    pub fn forward_control_message(&mut self, message: &Value) -> bool {
        match self.active {
            Some(index) => self.plugins[index].plugin.handle_control_message(message),
            None => false,
        }
    }

    /// Id of the active plugin
    pub fn active_id(&self) -> Option<PluginId> {
        self.active.map(|index| self.plugins[index].id)
    }

    /// Name of the active plugin
    pub fn active_name(&self) -> Option<&'static str> {
        self.active.map(|index| self.plugins[index].plugin.name())
    }

    /// Look up a plugin id by name
    pub fn id_of(&self, name: &str) -> Option<PluginId> {
        self.plugins
            .iter()
            .find(|p| p.plugin.name() == name)
            .map(|p| p.id)
    }

    /// Look up a plugin name by id
    pub fn name_of(&self, id: PluginId) -> Option<&'static str> {
        self.plugins
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.plugin.name())
    }

    /// Registered plugins in id order
    pub fn plugins(&self) -> Vec<PluginInfo> {
        self.plugins
            .iter()
            .map(|p| PluginInfo {
                id: p.id,
                name: p.plugin.name().into(),
            })
            .collect()
    }

    /// Number of registered plugins
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Check if no plugin is registered
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::MemoryStore;
    use crate::plugin::test_support::{CallLog, FakeDisplay, RecordingDelay, RecordingPlugin};
    use alloc::vec;
    use serde_json::json;

    fn manager(log: &CallLog) -> PluginManager<FakeDisplay, RecordingDelay> {
        let mut manager = PluginManager::new(FakeDisplay::default(), RecordingDelay::default());
        for name in ["Draw", "Clock", "Weather"] {
            manager.register(Box::new(RecordingPlugin::new(name, log)));
        }
        manager
    }

    fn take(log: &CallLog) -> Vec<alloc::string::String> {
        core::mem::take(&mut *log.borrow_mut())
    }

    #[test]
    fn test_register_assigns_sequential_ids() {
        let log = CallLog::default();
        let manager = manager(&log);
        assert_eq!(manager.id_of("Draw"), Some(1));
        assert_eq!(manager.id_of("Weather"), Some(3));
        assert_eq!(manager.name_of(2), Some("Clock"));
        assert_eq!(manager.name_of(4), None);
        assert_eq!(manager.plugins().len(), 3);
        assert_eq!(manager.active_id(), None);
    }

    #[test]
    fn test_activation_tears_down_then_sets_up() {
        let log = CallLog::default();
        let mut manager = manager(&log);

        assert_eq!(manager.activate_by_name("Clock"), Some(2));
        assert_eq!(take(&log), vec!["setup:Clock"]);
        assert_eq!(manager.delay.total_ns, 0);

        assert_eq!(manager.activate_by_id(3), Some(3));
        assert_eq!(take(&log), vec!["teardown:Clock", "setup:Weather"]);
        assert_eq!(manager.delay.total_ns, SETTLE_DELAY_MS as u64 * 1_000_000);
        assert_eq!(manager.display().clears, 2);
        assert_eq!(manager.active_name(), Some("Weather"));
    }

    #[test]
    fn test_unknown_name_leaves_slot_empty() {
        let log = CallLog::default();
        let mut manager = manager(&log);
        manager.activate_by_name("Clock");
        take(&log);

        assert_eq!(manager.activate_by_name("Snake"), None);
        assert_eq!(take(&log), vec!["teardown:Clock"]);
        assert_eq!(manager.active_id(), None);
    }

    #[test]
    fn test_unknown_id_is_ignored() {
        let log = CallLog::default();
        let mut manager = manager(&log);
        manager.activate_by_id(1);
        take(&log);

        assert_eq!(manager.activate_by_id(9), None);
        assert!(take(&log).is_empty());
        assert_eq!(manager.active_id(), Some(1));
    }

    #[test]
    fn test_activate_next_wraps() {
        let log = CallLog::default();
        let mut manager = manager(&log);
        assert_eq!(manager.activate_next(), Some(1));
        assert_eq!(manager.activate_next(), Some(2));
        assert_eq!(manager.activate_next(), Some(3));
        assert_eq!(manager.activate_next(), Some(1));
    }

    #[test]
    fn test_restore_prefers_name_over_id() {
        let log = CallLog::default();
        let mut manager = manager(&log);
        let mut store = MemoryStore::new();
        persist::store_str(&mut store, StorageKey::PluginName, "Weather");
        persist::store_i32(&mut store, StorageKey::CurrentPlugin, 2);

        assert_eq!(manager.restore_from_persistence(&mut store), Some(3));
        assert_eq!(persist::load_i32(&mut store, StorageKey::CurrentPlugin), Some(3));
    }

    #[test]
    fn test_restore_falls_back_to_legacy_id() {
        let log = CallLog::default();
        let mut manager = manager(&log);
        let mut store = MemoryStore::new();
        persist::store_str(&mut store, StorageKey::PluginName, "Removed");
        persist::store_i32(&mut store, StorageKey::CurrentPlugin, 2);

        assert_eq!(manager.restore_from_persistence(&mut store), Some(2));
        assert_eq!(
            persist::load_string(&mut store, StorageKey::PluginName).as_deref(),
            Some("Clock")
        );
    }

    #[test]
    fn test_first_boot_persists_first_plugin() {
        let log = CallLog::default();
        let mut manager = manager(&log);
        let mut store = MemoryStore::new();

        assert_eq!(manager.restore_from_persistence(&mut store), Some(1));
        assert_eq!(
            persist::load_string(&mut store, StorageKey::PluginName).as_deref(),
            Some("Draw")
        );
    }

    #[test]
    fn test_restore_with_empty_registry_is_noop() {
        let mut manager = PluginManager::new(FakeDisplay::default(), RecordingDelay::default());
        let mut store = MemoryStore::new();
        assert_eq!(manager.restore_from_persistence(&mut store), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_run_active_respects_status() {
        let log = CallLog::default();
        let mut manager = manager(&log);
        assert!(!manager.run_active(SystemStatus::None));

        manager.activate_by_id(2);
        take(&log);
        assert!(!manager.run_active(SystemStatus::Update));
        assert!(!manager.run_active(SystemStatus::WsBinary));
        assert!(take(&log).is_empty());

        assert!(manager.run_active(SystemStatus::None));
        assert_eq!(take(&log), vec!["run:Clock"]);
        assert_eq!(manager.display().lit, 1);
    }

    #[test]
    fn test_control_message_goes_to_active_plugin() {
        let log = CallLog::default();
        let mut manager = manager(&log);
        let message = json!({"event": "draw"});
        assert!(!manager.forward_control_message(&message));

        manager.activate_by_id(1);
        take(&log);
        assert!(manager.forward_control_message(&message));
        assert!(!manager.forward_control_message(&json!({"event": "info"})));
        assert_eq!(take(&log), vec!["message:Draw"]);
    }
}
