use std::path::{Path, PathBuf};
use tracing::trace;

/// Icon name used when a theme cannot resolve the requested icon
pub const UNKNOWN_ICON: &str = "unknown";

const ICON_EXTENSIONS: &[&str] = &["png", "svg", "xpm"];

/// A resolved icon: the name it was requested by and, when found on disk, its file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    pub name: String,
    pub path: Option<PathBuf>,
}

impl Icon {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
        }
    }

    #[must_use]
    pub fn unknown() -> Self {
        Self::named(UNKNOWN_ICON)
    }
}

/// Icon lookup provided by the host
pub trait IconTheme {
    /// Find `name` in `theme`, or unthemed when `theme` is `None`
    fn lookup(&self, theme: Option<&str>, name: &str) -> Option<Icon>;

    /// Like [`IconTheme::lookup`] but never fails; misses become the unknown icon
    fn resolve(&self, theme: Option<&str>, name: &str) -> Icon {
        self.lookup(theme, name).unwrap_or_else(|| {
            trace!("Icon {} not found in theme {:?}", name, theme);
            self.lookup(theme, UNKNOWN_ICON).unwrap_or_else(Icon::unknown)
        })
    }
}

/// Icon theme backed by plain directories
///
/// For every search directory, `<dir>/<theme>/<name>.<ext>` is tried first,
/// then `<dir>/<name>.<ext>`.
#[derive(Debug, Clone, Default)]
pub struct DirectoryIconTheme {
    search_dirs: Vec<PathBuf>,
}

impl DirectoryIconTheme {
    #[must_use]
    pub fn new(search_dirs: Vec<PathBuf>) -> Self {
        Self { search_dirs }
    }

    fn find_in(dir: &Path, name: &str) -> Option<PathBuf> {
        ICON_EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{name}.{ext}")))
            .find(|candidate| candidate.is_file())
    }
}

impl IconTheme for DirectoryIconTheme {
    fn lookup(&self, theme: Option<&str>, name: &str) -> Option<Icon> {
        for dir in &self.search_dirs {
            let themed = theme.and_then(|t| Self::find_in(&dir.join(t), name));
            if let Some(path) = themed.or_else(|| Self::find_in(dir, name)) {
                return Some(Icon {
                    name: name.to_string(),
                    path: Some(path),
                });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_themed_icon_preferred() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Curve")).unwrap();
        fs::write(dir.path().join("Curve").join("trash_full.png"), b"").unwrap();
        fs::write(dir.path().join("trash_full.png"), b"").unwrap();

        let theme = DirectoryIconTheme::new(vec![dir.path().to_path_buf()]);

        let icon = theme.lookup(Some("Curve"), "trash_full").unwrap();
        assert_eq!(icon.path.unwrap(), dir.path().join("Curve").join("trash_full.png"));

        let icon = theme.lookup(Some("Other"), "trash_full").unwrap();
        assert_eq!(icon.path.unwrap(), dir.path().join("trash_full.png"));
    }

    #[test]
    fn test_resolve_falls_back_to_unknown() {
        let theme = DirectoryIconTheme::default();
        assert_eq!(theme.resolve(None, "trash_empty"), Icon::unknown());
    }
}
