//! Global presentation settings shared by every panel control
//!
//! Controls never read these from global state. The panel hands out a
//! [`Settings`] snapshot whenever something changes and each control applies it.

use serde::{Deserialize, Serialize};

/// Extra pixels added around an icon by the default size computation
pub const BORDER_WIDTH: u32 = 4;

/// Icon edge length in pixels for each [`SizeClass`], smallest first
pub const ICON_SIZE: [u32; 4] = [24, 30, 45, 60];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

/// Enumerated size class of the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeClass {
    Tiny,
    #[default]
    Small,
    Medium,
    Large,
}

impl SizeClass {
    /// Icon size in pixels for this class
    #[must_use]
    pub fn icon_size(self) -> u32 {
        ICON_SIZE[self as usize]
    }

    /// Square edge a control gets when its plugin does not size itself
    #[must_use]
    pub fn default_control_size(self) -> u32 {
        self.icon_size() + BORDER_WIDTH
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    Traditional,
    #[default]
    Modern,
}

/// Snapshot of the panel-wide presentation settings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default)]
    pub size: SizeClass,
    #[serde(default)]
    pub style: Style,
    /// Icon theme name; `None` leaves every control on its initial icons
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
}
