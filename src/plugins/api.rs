/// Plugin API definitions
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

use super::control::{ControlNode, PanelControl};
use crate::scheduler::Scheduler;
use crate::settings::{Orientation, Settings, SizeClass, Style};
use crate::shell::CommandRunner;
use crate::ui::{Callback, ControlBase, IconTheme, OptionsPage, Signal, Widget, WidgetKind};

/// Plugin API version this build of the panel speaks
pub const API_VERSION: u32 = 2;

/// Check a plugin's declared API version against the panel's
///
/// Returns `None` when compatible, otherwise a message a plugin can report
/// instead of crashing on a mismatched ABI.
#[must_use]
pub fn check_version(version: u32) -> Option<&'static str> {
    if version == API_VERSION {
        None
    } else {
        Some("Incompatible plugin version")
    }
}

/// Numeric module id as persisted in the panel layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(pub i32);

impl ModuleId {
    /// The built-in launcher
    pub const ICON: Self = Self(-2);
    /// Any dynamically loaded plugin; the filename tells them apart
    pub const PLUGIN: Self = Self(-1);
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::ICON => write!(f, "icon"),
            Self::PLUGIN => write!(f, "plugin"),
            Self(id) => write!(f, "{id}"),
        }
    }
}

/// Collaborators the host lends to every control
#[derive(Clone)]
pub struct Services {
    pub icons: Rc<dyn IconTheme>,
    pub runner: Rc<dyn CommandRunner>,
    pub scheduler: Rc<dyn Scheduler>,
}

/// Everything a factory may look at while building a control
pub struct ControlContext<'a> {
    pub services: &'a Services,
    pub settings: &'a Settings,
}

/// Builds control instances for one module
///
/// A successful factory sets the control's caption, puts a child widget in
/// its base container and installs a [`ControlBackend`].
pub trait ControlFactory {
    fn create_control(&self, control: &mut PanelControl, ctx: &ControlContext<'_>) -> Result<()>;
}

impl<F> ControlFactory for F
where
    F: Fn(&mut PanelControl, &ControlContext<'_>) -> Result<()>,
{
    fn create_control(&self, control: &mut PanelControl, ctx: &ControlContext<'_>) -> Result<()> {
        self(control, ctx)
    }
}

/// Per-instance operations a plugin provides
///
/// Only `attach_callback` is required. Every other operation has a default
/// the panel falls back to when a plugin does not customize it.
pub trait ControlBackend {
    /// Connect `callback` to `signal` on the widget the user interacts with
    fn attach_callback(&self, signal: Signal, callback: Callback);

    /// Release private data and cancel any timers before the control goes away
    fn free(&mut self) {}

    fn read_config(&mut self, _node: &ControlNode) {}

    fn write_config(&self, _node: &mut ControlNode) {}

    /// Fill the configuration dialog page
    fn add_options(&mut self, page: &mut OptionsPage) {
        let mut hbox = Widget::new(WidgetKind::HBox);

        let mut image = Widget::new(WidgetKind::Image);
        image.set_icon(crate::ui::Icon::named("dialog-information"));
        hbox.children.push(image.into_ref());
        hbox.children
            .push(Widget::label("This module has no configuration options").into_ref());

        page.add(hbox.into_ref());
    }

    fn set_orientation(&mut self, _base: &mut ControlBase, _orientation: Orientation) {}

    /// Resize the control; defaults to a square of icon size plus border
    fn set_size(&mut self, base: &mut ControlBase, size: SizeClass) {
        let edge = size.default_control_size();
        base.set_size_request(edge, edge);
    }

    fn set_style(&mut self, _base: &mut ControlBase, _style: Style) {}

    fn set_theme(&mut self, _base: &mut ControlBase, _theme: &str) {}
}

/// Filled in by a plugin's initializer
#[derive(Default)]
pub struct ModuleDescriptor {
    pub name: String,
    pub caption: String,
    pub factory: Option<Rc<dyn ControlFactory>>,
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("name", &self.name)
            .field("caption", &self.caption)
            .field("factory", &self.factory.is_some())
            .finish()
    }
}

/// Signature of the `hearth_plugin_init` symbol
pub type PluginInit = fn(&mut ModuleDescriptor);

/// Name of the marker static every plugin exports; its value is the plugin's API version
pub const MARKER_SYMBOL: &[u8] = b"hearth_panel_control\0";

/// Name of the initializer every plugin exports
pub const INIT_SYMBOL: &[u8] = b"hearth_plugin_init\0";

/// Export the symbols the panel looks for in a plugin library
///
/// ```ignore
/// fn init(module: &mut hearth::plugins::ModuleDescriptor) {
///     module.name = "clock".to_string();
///     module.caption = "Clock".to_string();
///     module.factory = Some(std::rc::Rc::new(create_clock));
/// }
///
/// hearth::export_panel_plugin!(init);
/// ```
#[macro_export]
macro_rules! export_panel_plugin {
    ($init:path) => {
        #[allow(non_upper_case_globals)]
        #[no_mangle]
        pub static hearth_panel_control: u32 = $crate::plugins::API_VERSION;

        #[no_mangle]
        pub fn hearth_plugin_init(module: &mut $crate::plugins::ModuleDescriptor) {
            $init(module)
        }
    };
}
