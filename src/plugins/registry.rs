//! Module registry
//!
//! Every module the panel knows about, built-in or loaded from a shared
//! object, in the order it was registered. Names are unique without regard
//! to ASCII case.

use libloading::Library;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

use super::api::{ControlFactory, ModuleId};

/// Where a module's code lives
pub enum ModuleSource {
    Builtin,
    Library { path: PathBuf, library: Library },
}

/// Static descriptor of a module controls are created from
pub struct PanelModule {
    pub name: String,
    pub caption: String,
    pub id: ModuleId,
    // Declared before `source`: the factory's code may live in the library,
    // so it has to be dropped first.
    factory: Rc<dyn ControlFactory>,
    source: ModuleSource,
}

impl PanelModule {
    /// A module compiled into the panel
    pub fn builtin(
        id: ModuleId,
        name: impl Into<String>,
        caption: impl Into<String>,
        factory: Rc<dyn ControlFactory>,
    ) -> Self {
        Self {
            name: name.into(),
            caption: caption.into(),
            id,
            factory,
            source: ModuleSource::Builtin,
        }
    }

    /// A module loaded from `library`, opened from `path`
    pub fn from_library(
        name: impl Into<String>,
        caption: impl Into<String>,
        factory: Rc<dyn ControlFactory>,
        path: PathBuf,
        library: Library,
    ) -> Self {
        Self {
            name: name.into(),
            caption: caption.into(),
            id: ModuleId::PLUGIN,
            factory,
            source: ModuleSource::Library { path, library },
        }
    }

    #[must_use]
    pub fn factory(&self) -> &Rc<dyn ControlFactory> {
        &self.factory
    }

    /// Path the library was opened from, `None` for built-ins
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            ModuleSource::Builtin => None,
            ModuleSource::Library { path, .. } => Some(path),
        }
    }

    /// Base name of the library file, `None` for built-ins
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.path()
            .and_then(Path::file_name)
            .and_then(|name| name.to_str())
    }

    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        matches!(self.source, ModuleSource::Library { .. })
    }
}

impl fmt::Debug for PanelModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanelModule")
            .field("name", &self.name)
            .field("caption", &self.caption)
            .field("id", &self.id)
            .field("path", &self.path())
            .finish()
    }
}

/// Ordered, name-unique collection of modules
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: Vec<PanelModule>,
}

impl ModuleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `module` unless one with the same name is already registered
    ///
    /// A rejected module is dropped right away, which closes its library.
    /// Returns whether the module was added.
    pub fn register(&mut self, module: PanelModule) -> bool {
        if self.find_by_name(&module.name).is_some() {
            debug!("Rejecting duplicate module {}", module.name);
            return false;
        }
        self.modules.push(module);
        true
    }

    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&PanelModule> {
        self.modules
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn find_by_id(&self, id: ModuleId) -> Option<&PanelModule> {
        self.modules.iter().find(|m| m.id == id)
    }

    /// Find the dynamic module whose library file is named `filename`
    ///
    /// Only the base name of `filename` is compared, ignoring ASCII case.
    #[must_use]
    pub fn find_by_filename(&self, filename: &str) -> Option<&PanelModule> {
        let wanted = Path::new(filename)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(filename);

        self.modules.iter().find(|m| {
            m.filename()
                .is_some_and(|name| name.eq_ignore_ascii_case(wanted))
        })
    }

    /// All modules in registration order
    #[must_use]
    pub fn all(&self) -> &[PanelModule] {
        &self.modules
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Drop every module, closing their libraries
    pub fn clear(&mut self) {
        // Later modules first, mirroring load order
        while let Some(module) = self.modules.pop() {
            debug!("Releasing module {}", module.name);
        }
    }
}
