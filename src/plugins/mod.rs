// Panel control plugins:
// - Module registry keyed by name, id and library filename
// - Dynamic loading of plugin libraries with libloading
// - Capability trait every control backend implements
// - Built-in launcher and the trash monitor reference plugin
pub mod api;
pub mod control;
pub mod launcher;
pub mod loader;
pub mod registry;
pub mod trash;

pub use api::{
    check_version, ControlBackend, ControlContext, ControlFactory, ModuleDescriptor, ModuleId,
    Services, API_VERSION,
};
pub use control::{ActivationHandler, ControlHost, ControlNode, PanelControl, MENU_BUTTON};
pub use loader::{LoadError, PluginLoader};
pub use registry::{ModuleRegistry, PanelModule};
