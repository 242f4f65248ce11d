//! Plugin contract and lifecycle management
//!
//! A plugin is a self-contained visual program (clock, game, data readout,
//! animation). Exactly one plugin is active at a time; the
//! [`PluginManager`] owns every registered plugin and the active slot.

mod manager;

pub use manager::{PluginManager, SETTLE_DELAY_MS};

use pixelwall_hal::FrameBuffer;
use serde_json::Value;

/// Registry id of a plugin, assigned in registration order starting at 1
pub type PluginId = u16;

/// A visual program the display can run
///
/// Plugins are registered once at startup and live for the rest of the
/// process. The manager assigns the id; the name is the durable identity
/// and must be unique across the registry.
pub trait Plugin {
    /// Stable plugin name
    fn name(&self) -> &'static str;

    /// Prepare state after becoming active
    ///
    /// The display has already been cleared.
    fn setup(&mut self, _display: &mut dyn FrameBuffer) {}

    /// Render one iteration
    fn run(&mut self, display: &mut dyn FrameBuffer);

    /// Release state before another plugin becomes active
    fn teardown(&mut self) {}

    /// Offer a control message to the plugin
    ///
    /// Returns true if the plugin consumed the message.
    fn handle_control_message(&mut self, _message: &Value) -> bool {
        false
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use alloc::rc::Rc;
    use alloc::string::String;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    use embedded_hal::delay::DelayNs;
    use pixelwall_hal::FrameBuffer;
    use serde_json::Value;

    use super::Plugin;

    /// Shared record of lifecycle calls, formatted as `"<call>:<name>"`
    pub type CallLog = Rc<RefCell<Vec<String>>>;

    pub struct RecordingPlugin {
        name: &'static str,
        log: CallLog,
    }

    impl RecordingPlugin {
        pub fn new(name: &'static str, log: &CallLog) -> Self {
            Self {
                name,
                log: log.clone(),
            }
        }

        fn record(&self, call: &str) {
            self.log
                .borrow_mut()
                .push(alloc::format!("{}:{}", call, self.name));
        }
    }

    impl Plugin for RecordingPlugin {
        fn name(&self) -> &'static str {
            self.name
        }

        fn setup(&mut self, _display: &mut dyn FrameBuffer) {
            self.record("setup");
        }

        fn run(&mut self, display: &mut dyn FrameBuffer) {
            display.set_pixel(0, 0, 255);
            self.record("run");
        }

        fn teardown(&mut self) {
            self.record("teardown");
        }

        fn handle_control_message(&mut self, message: &Value) -> bool {
            if message.get("event").and_then(Value::as_str) == Some("draw") {
                self.record("message");
                return true;
            }
            false
        }
    }

    #[derive(Debug, Default)]
    pub struct FakeDisplay {
        pub clears: u32,
        pub lit: u32,
        pub brightness: u8,
    }

    impl FrameBuffer for FakeDisplay {
        fn width(&self) -> u8 {
            16
        }

        fn height(&self) -> u8 {
            16
        }

        fn set_pixel(&mut self, _x: u8, _y: u8, value: u8) {
            if value > 0 {
                self.lit += 1;
            }
        }

        fn clear(&mut self) {
            self.clears += 1;
            self.lit = 0;
        }

        fn set_brightness(&mut self, brightness: u8) {
            self.brightness = brightness;
        }

        fn brightness(&self) -> u8 {
            self.brightness
        }
    }

    /// Delay that only sums the requested time
    #[derive(Debug, Default)]
    pub struct RecordingDelay {
        pub total_ns: u64,
    }

    impl DelayNs for RecordingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ns += ns as u64;
        }
    }
}
