//! Panel control instances and the factory protocol that creates them

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::cell::Cell;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, trace, warn};

use super::api::{ControlBackend, ControlContext, ModuleId, Services};
use super::launcher;
use super::loader::PluginLoader;
use crate::settings::{Orientation, Settings, SizeClass, Style};
use crate::ui::{Callback, ControlBase, Event, OptionsPage, Signal};

/// Persisted record of one control
///
/// The panel itself only reads `id` and `filename`; `options` belongs to
/// the plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlNode {
    pub id: ModuleId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Directory the library was loaded from, tried again when it is off the search path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dirname: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Mapping::is_empty")]
    pub options: Mapping,
}

impl ControlNode {
    #[must_use]
    pub fn new(id: ModuleId) -> Self {
        Self {
            id,
            filename: None,
            dirname: None,
            options: Mapping::new(),
        }
    }

    /// Record for a control created by the plugin in library `filename`
    #[must_use]
    pub fn plugin(filename: impl Into<String>) -> Self {
        Self {
            filename: Some(filename.into()),
            ..Self::new(ModuleId::PLUGIN)
        }
    }

    #[must_use]
    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    #[must_use]
    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.option(key).and_then(Value::as_str)
    }

    #[must_use]
    pub fn option_bool(&self, key: &str) -> Option<bool> {
        self.option(key).and_then(Value::as_bool)
    }

    pub fn set_option(&mut self, key: &str, value: impl Into<Value>) {
        self.options.insert(Value::from(key), value.into());
    }
}

/// Host handler for presses on any control; receives the control's current index
pub type ActivationHandler = Rc<dyn Fn(usize, &Event)>;

/// Pointer button that asks for a control's popup menu
pub const MENU_BUTTON: u32 = 3;

/// One live item on the panel
pub struct PanelControl {
    index: Rc<Cell<usize>>,
    pub id: ModuleId,
    /// Library the control came from, kept so it can be recreated
    pub filename: Option<String>,
    pub dirname: Option<PathBuf>,
    pub caption: Option<String>,
    popup: Rc<Cell<bool>>,
    // Backend before base: plugin state may hold on to base's widgets.
    backend: Option<Box<dyn ControlBackend>>,
    base: ControlBase,
    size: SizeClass,
    destroyed: bool,
}

impl PanelControl {
    /// An empty control at `index`, defaulting to the launcher id
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self {
            index: Rc::new(Cell::new(index)),
            id: ModuleId::ICON,
            filename: None,
            dirname: None,
            caption: None,
            popup: Rc::new(Cell::new(true)),
            backend: None,
            base: ControlBase::new(),
            size: SizeClass::default(),
            destroyed: false,
        }
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index.get()
    }

    pub fn set_index(&mut self, index: usize) {
        self.index.set(index);
    }

    #[must_use]
    pub fn base(&self) -> &ControlBase {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut ControlBase {
        &mut self.base
    }

    pub fn set_backend(&mut self, backend: Box<dyn ControlBackend>) {
        self.backend = Some(backend);
    }

    /// Whether menu-button presses on this control reach the host
    #[must_use]
    pub fn with_popup(&self) -> bool {
        self.popup.get()
    }

    /// Plugins without a popup menu turn this off while creating the control
    pub fn set_with_popup(&self, with_popup: bool) {
        self.popup.set(with_popup);
    }

    /// Caption, backend and child widget are all present
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.caption.is_some() && self.backend.is_some() && self.base.child().is_some()
    }

    /// Undo a failed construction so another factory can start over
    fn reset(&mut self) {
        if let Some(mut backend) = self.backend.take() {
            backend.free();
        }
        self.caption = None;
        self.popup.set(true);
        self.base.clear();
    }

    fn attach_activation(&mut self, callback: Callback) {
        if let Some(backend) = &self.backend {
            backend.attach_callback(Signal::ButtonPress, callback.clone());
        }
        self.base.connect(Signal::ButtonPress, callback);
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        if let Some(backend) = self.backend.as_mut() {
            backend.set_orientation(&mut self.base, orientation);
        }
    }

    pub fn set_size(&mut self, size: SizeClass) {
        self.size = size;
        match self.backend.as_mut() {
            Some(backend) => backend.set_size(&mut self.base, size),
            None => {
                let edge = size.default_control_size();
                self.base.set_size_request(edge, edge);
            }
        }
    }

    pub fn set_style(&mut self, style: Style) {
        if let Some(backend) = self.backend.as_mut() {
            backend.set_style(&mut self.base, style);
        }
    }

    /// Switch icon theme, then re-apply the current size for the new icons
    pub fn set_theme(&mut self, theme: &str) {
        if let Some(backend) = self.backend.as_mut() {
            backend.set_theme(&mut self.base, theme);
        }
        self.set_size(self.size);
    }

    /// Apply a settings snapshot; the theme only when one is configured
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.set_orientation(settings.orientation);
        self.set_size(settings.size);
        self.set_style(settings.style);

        if let Some(theme) = &settings.theme {
            self.set_theme(theme);
        }
    }

    pub fn read_config(&mut self, node: &ControlNode) {
        if let Some(backend) = self.backend.as_mut() {
            backend.read_config(node);
        }
    }

    /// Persisted record: id and, for plugins, filename and dirname, plus the plugin's options
    #[must_use]
    pub fn write_config(&self) -> ControlNode {
        let mut node = ControlNode::new(self.id);

        if self.id == ModuleId::PLUGIN {
            node.filename.clone_from(&self.filename);
            node.dirname.clone_from(&self.dirname);
        }

        if let Some(backend) = &self.backend {
            backend.write_config(&mut node);
        }
        node
    }

    pub fn add_options(&mut self, page: &mut OptionsPage) {
        if let Some(backend) = self.backend.as_mut() {
            backend.add_options(page);
        }
    }

    /// Free the plugin's state, then release the container
    ///
    /// Safe to call more than once; dropping a control calls it too.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;

        if let Some(mut backend) = self.backend.take() {
            backend.free();
        }
        self.base.clear();
        debug!("Destroyed control {}", self.index());
    }
}

impl Drop for PanelControl {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for PanelControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanelControl")
            .field("index", &self.index())
            .field("id", &self.id)
            .field("filename", &self.filename)
            .field("caption", &self.caption)
            .field("with_popup", &self.with_popup())
            .field("base", &self.base)
            .finish()
    }
}

/// Creates controls from registered modules
pub struct ControlHost {
    loader: PluginLoader,
    services: Services,
}

impl ControlHost {
    #[must_use]
    pub fn new(loader: PluginLoader, services: Services) -> Self {
        Self { loader, services }
    }

    #[must_use]
    pub fn loader(&self) -> &PluginLoader {
        &self.loader
    }

    #[must_use]
    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Create the control at `index`, from a saved record when there is one
    ///
    /// A plugin record whose library is not loaded yet is loaded from its
    /// saved directory first. Never fails: a missing module, a failing
    /// factory or an incomplete result all end up as a launcher.
    pub fn instantiate(
        &mut self,
        index: usize,
        node: Option<&ControlNode>,
        settings: &Settings,
        on_activate: &ActivationHandler,
    ) -> PanelControl {
        let mut control = PanelControl::new(index);

        if let Some(node) = node {
            control.id = node.id;
            if node.id == ModuleId::PLUGIN {
                control.filename.clone_from(&node.filename);
                if let Some(filename) = node.filename.as_deref() {
                    self.load_saved_plugin(filename, node.dirname.as_deref());
                }
                control.dirname = node
                    .filename
                    .as_deref()
                    .and_then(|f| self.loader.registry().find_by_filename(f))
                    .and_then(|m| m.path())
                    .and_then(Path::parent)
                    .map(Path::to_path_buf)
                    .or_else(|| node.dirname.clone());
            }
        }

        let ctx = ControlContext {
            services: &self.services,
            settings,
        };

        self.create(&mut control, &ctx);

        if !control.is_complete() {
            warn!(
                "Control {} ({}) is incomplete, using a launcher instead",
                index,
                control.filename.as_deref().unwrap_or("builtin")
            );
            control.reset();
            self.create_launcher(&mut control, &ctx);
        }

        let handler = on_activate.clone();
        let control_index = control.index.clone();
        let popup = control.popup.clone();
        control.attach_activation(Rc::new(move |event: &Event| {
            let menu_press = matches!(event, Event::ButtonPress { button } if *button == MENU_BUTTON);
            if menu_press && !popup.get() {
                trace!("Control {} has no popup menu", control_index.get());
                return;
            }
            handler(control_index.get(), event);
        }));

        control.apply_settings(settings);

        if let Some(node) = node {
            control.read_config(node);
        }

        control
    }

    /// Load `dirname/filename` unless a library of that name is registered
    fn load_saved_plugin(&mut self, filename: &str, dirname: Option<&Path>) {
        if self.loader.registry().find_by_filename(filename).is_some() {
            return;
        }
        if let Some(dir) = dirname {
            debug!("Loading {} from saved directory {}", filename, dir.display());
            self.loader.load(dir.join(filename));
        }
    }

    fn create(&self, control: &mut PanelControl, ctx: &ControlContext<'_>) {
        let (factory, label) = match control.id {
            ModuleId::ICON => {
                self.create_launcher(control, ctx);
                return;
            }
            ModuleId::PLUGIN => match control.filename.clone() {
                Some(filename) => (self.loader.factory_by_filename(&filename), filename),
                None => (None, "<no filename>".to_string()),
            },
            id => (self.loader.factory_by_id(id), format!("id {id}")),
        };

        let Some(factory) = factory else {
            warn!("Failed to find module {}", label);
            self.create_launcher(control, ctx);
            return;
        };

        if let Err(e) = factory.create_control(control, ctx) {
            warn!("Failed to create control from module {}: {:#}", label, e);
            control.reset();
            self.create_launcher(control, ctx);
        }
    }

    fn create_launcher(&self, control: &mut PanelControl, ctx: &ControlContext<'_>) {
        if let Some(factory) = self.loader.factory_by_id(ModuleId::ICON) {
            match factory.create_control(control, ctx) {
                Ok(()) if control.is_complete() => return,
                Ok(()) => warn!("Launcher module produced an incomplete control"),
                Err(e) => warn!("Launcher module failed: {:#}", e),
            }
            control.reset();
        }
        launcher::build(control, ctx);
    }

    /// Release all modules; every control must be destroyed before this
    pub fn shutdown(&mut self) {
        self.loader.shutdown();
    }
}
