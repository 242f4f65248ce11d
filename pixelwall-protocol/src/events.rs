//! Physical input events

/// Press patterns reported by the front-panel button driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonPress {
    /// Short single press
    Single,
    /// Two short presses in quick succession
    Double,
    /// Press held for at least one second
    Long,
}

impl ButtonPress {
    /// Returns true if this press changes the active plugin
    pub fn selects_plugin(&self) -> bool {
        matches!(self, ButtonPress::Single | ButtonPress::Long)
    }
}
