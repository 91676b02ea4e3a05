use libloading::{Library, Symbol};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info, trace, warn};

use super::api::{check_version, ModuleDescriptor, ModuleId, PluginInit, INIT_SYMBOL, MARKER_SYMBOL};
use super::launcher;
use super::registry::{ModuleRegistry, PanelModule};

/// Modules compiled into the panel, registered at startup after the launcher
const BUILTIN_MODULES: &[fn() -> PanelModule] = &[];

/// Why a shared object was not turned into a module
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("module {} cannot be opened ({source})", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
    #[error("incompatible module {}", path.display())]
    Incompatible { path: PathBuf },
    #[error("module {}: {message} (plugin API {found}, panel API {expected})", path.display())]
    Version {
        path: PathBuf,
        message: &'static str,
        found: u32,
        expected: u32,
    },
    #[error("module {name} has already been loaded")]
    Duplicate { name: String },
}

/// Discovers plugin libraries and keeps the module registry
#[derive(Debug, Default)]
pub struct PluginLoader {
    registry: ModuleRegistry,
}

impl PluginLoader {
    /// Create a loader with an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: ModuleRegistry::new(),
        }
    }

    /// Register the launcher and the other built-ins, then scan `search_paths` in order
    ///
    /// When two directories provide a module with the same name, the one
    /// found first wins.
    pub fn init<P: AsRef<Path>>(&mut self, search_paths: &[P]) {
        self.registry.register(launcher::module());

        for builtin in BUILTIN_MODULES {
            self.register_builtin(builtin());
        }

        for dir in search_paths {
            self.scan_directory(dir);
        }

        info!("{} panel modules available", self.registry.len());
    }

    /// Register a module compiled into the host
    pub fn register_builtin(&mut self, module: PanelModule) -> bool {
        let name = module.name.clone();
        let added = self.registry.register(module);
        if added {
            debug!("Registered builtin module {}", name);
        } else {
            info!("Module {} has already been loaded", name);
        }
        added
    }

    /// Load every shared object in `dir`
    ///
    /// A directory that cannot be read is skipped; plugin directories are
    /// optional.
    pub fn scan_directory<P: AsRef<Path>>(&mut self, dir: P) {
        let dir = dir.as_ref();

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                trace!("Skipping plugin directory {}: {}", dir.display(), e);
                return;
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| is_shared_object(path))
            .collect();
        paths.sort();

        for path in paths {
            self.load(&path);
        }
    }

    /// Load one plugin library, logging instead of failing
    pub fn load<P: AsRef<Path>>(&mut self, path: P) {
        match self.try_load(path) {
            Ok(name) => info!("Module {} successfully loaded", name),
            Err(e @ LoadError::Duplicate { .. }) => info!("{}", e),
            Err(e) => warn!("{}", e),
        }
    }

    /// Load one plugin library and register the module it describes
    ///
    /// On any error the library is closed again and the registry is left
    /// untouched. Returns the name of the registered module.
    ///
    /// # Errors
    /// See [`LoadError`]
    pub fn try_load<P: AsRef<Path>>(&mut self, path: P) -> Result<String, LoadError> {
        let path = path.as_ref().to_path_buf();

        // Safety: loading a library runs its initializers. Plugin directories
        // are expected to contain only panel plugins built for this panel.
        let library = unsafe { Library::new(&path) }.map_err(|source| LoadError::Open {
            path: path.clone(),
            source,
        })?;

        let descriptor = match Self::describe(&library, &path) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                drop(library);
                return Err(e);
            }
        };

        let ModuleDescriptor {
            name,
            caption,
            factory,
        } = descriptor;

        let Some(factory) = factory.filter(|_| !name.is_empty()) else {
            return Err(LoadError::Incompatible { path });
        };

        let module = PanelModule::from_library(name.clone(), caption, factory, path, library);
        if self.registry.register(module) {
            Ok(name)
        } else {
            Err(LoadError::Duplicate { name })
        }
    }

    /// Check the plugin's symbols and let it fill a fresh descriptor
    fn describe(library: &Library, path: &Path) -> Result<ModuleDescriptor, LoadError> {
        // Safety: the marker is declared by `export_panel_plugin!` as a `u32`
        // static and the initializer with the `PluginInit` signature.
        unsafe {
            let marker: Symbol<*const u32> = library
                .get(MARKER_SYMBOL)
                .map_err(|_| LoadError::Incompatible {
                    path: path.to_path_buf(),
                })?;

            let version = **marker;
            if let Some(message) = check_version(version) {
                return Err(LoadError::Version {
                    path: path.to_path_buf(),
                    message,
                    found: version,
                    expected: super::api::API_VERSION,
                });
            }

            let init: Symbol<PluginInit> =
                library
                    .get(INIT_SYMBOL)
                    .map_err(|_| LoadError::Incompatible {
                        path: path.to_path_buf(),
                    })?;

            let mut descriptor = ModuleDescriptor::default();
            init(&mut descriptor);
            Ok(descriptor)
        }
    }

    /// Release every module and close all libraries
    pub fn shutdown(&mut self) {
        self.registry.clear();
    }

    #[must_use]
    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Factory of the module registered under `id`
    #[must_use]
    pub fn factory_by_id(&self, id: ModuleId) -> Option<Rc<dyn super::ControlFactory>> {
        self.registry.find_by_id(id).map(|m| m.factory().clone())
    }

    /// Factory of the dynamic module loaded from a library named `filename`
    #[must_use]
    pub fn factory_by_filename(&self, filename: &str) -> Option<Rc<dyn super::ControlFactory>> {
        self.registry
            .find_by_filename(filename)
            .map(|m| m.factory().clone())
    }
}

impl Drop for PluginLoader {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Whether `path` ends with this platform's dynamic library suffix
fn is_shared_object(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| {
            name.len() > std::env::consts::DLL_SUFFIX.len()
                && name.ends_with(std::env::consts::DLL_SUFFIX)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env::consts::DLL_SUFFIX;
    use tempfile::tempdir;

    #[test]
    fn test_init_registers_launcher_first() {
        let mut loader = PluginLoader::new();
        loader.init::<PathBuf>(&[]);

        let first = &loader.registry().all()[0];
        assert_eq!(first.name, "icon");
        assert_eq!(first.caption, "Launcher");
        assert_eq!(first.id, ModuleId::ICON);
        assert!(!first.is_dynamic());
    }

    #[test]
    fn test_missing_directory_is_skipped() {
        let mut loader = PluginLoader::new();
        loader.init(&["/nonexistent/hearth/plugins"]);
        assert_eq!(loader.registry().len(), 1);
    }

    #[test]
    fn test_non_library_files_ignored() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("README"), b"not a plugin").unwrap();
        std::fs::write(dir.path().join(DLL_SUFFIX), b"suffix only").unwrap();

        let mut loader = PluginLoader::new();
        loader.scan_directory(dir.path());
        assert!(loader.registry().is_empty());
    }

    #[test]
    fn test_broken_library_fails_to_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(format!("libbroken{DLL_SUFFIX}"));
        std::fs::write(&path, b"this is not an object file").unwrap();

        let mut loader = PluginLoader::new();
        let err = loader.try_load(&path).unwrap_err();
        assert!(matches!(err, LoadError::Open { .. }));
        assert!(err.to_string().contains("cannot be opened"));

        // scanning logs and carries on
        loader.scan_directory(dir.path());
        assert!(loader.registry().is_empty());
    }

    #[test]
    fn test_is_shared_object() {
        assert!(is_shared_object(Path::new(&format!("/x/libtrash{DLL_SUFFIX}"))));
        assert!(!is_shared_object(Path::new("/x/libtrash.txt")));
        assert!(!is_shared_object(Path::new(DLL_SUFFIX)));
    }
}
