//! Trash can monitor
//!
//! Polls a trash directory every two seconds and shows whether it holds
//! anything, with file count and total size in the tooltip. Clicking runs the
//! trash command; items dropped on the button are handed to the same command.

use anyhow::Result;
use std::cell::RefCell;
use std::fs;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};
use std::time::Duration;
use tracing::{debug, warn};

use super::api::{ControlBackend, ControlContext, ModuleDescriptor, ModuleId};
use super::control::{ControlNode, PanelControl};
use super::registry::PanelModule;
use crate::scheduler::{Scheduler, TimerId};
use crate::shell::CommandRunner;
use crate::ui::{Callback, ControlBase, Event, Icon, IconTheme, Signal, Widget, WidgetRef};

pub const NAME: &str = "trash";
pub const CAPTION: &str = "Trash can";
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_COMMAND: &str = "xftrash";

const EMPTY_ICON: &str = "trash_empty";
const FULL_ICON: &str = "trash_full";
const EMPTY_TOOLTIP: &str = "Trashcan: 0 files";

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;

/// Fill in the module descriptor; the plugin library's initializer
pub fn init_module(module: &mut ModuleDescriptor) {
    module.name = NAME.to_string();
    module.caption = CAPTION.to_string();
    module.factory = Some(Rc::new(create_trash_control));
}

/// The trash monitor as a module compiled into the host under `id`
#[must_use]
pub fn builtin_module(id: ModuleId) -> PanelModule {
    PanelModule::builtin(id, NAME, CAPTION, Rc::new(create_trash_control))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrashState {
    Empty,
    Full,
}

/// What a poll found in the trash directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrashContents {
    pub files: u64,
    pub bytes: u64,
}

/// Count the entries of `dir` and add up their sizes
///
/// Returns `None` when the directory cannot be read or is empty. An entry
/// whose size cannot be read counts as zero bytes.
#[must_use]
pub fn scan_trash(dir: &Path) -> Option<TrashContents> {
    let entries = fs::read_dir(dir).ok()?;

    let mut contents = TrashContents::default();
    for entry in entries.filter_map(Result::ok) {
        contents.files += 1;
        contents.bytes += fs::metadata(entry.path()).map(|m| m.len()).unwrap_or(0);
    }

    (contents.files > 0).then_some(contents)
}

/// Size with the unit picked by magnitude: B below 1 KiB, KB below 1 MiB, else MB
#[must_use]
pub fn format_size(bytes: u64) -> String {
    if bytes < KIB {
        format!("{bytes} B")
    } else if bytes < MIB {
        format!("{} KB", bytes / KIB)
    } else {
        format!("{} MB", bytes / MIB)
    }
}

#[must_use]
pub fn format_tooltip(contents: &TrashContents) -> String {
    format!(
        "Trashcan: {} files / {}",
        contents.files,
        format_size(contents.bytes)
    )
}

struct TrashInner {
    dirname: Option<PathBuf>,
    command: String,
    in_terminal: bool,
    state: TrashState,
    empty_icon: Icon,
    full_icon: Icon,
    button: WidgetRef,
}

impl TrashInner {
    fn current_icon(&self) -> Icon {
        match self.state {
            TrashState::Empty => self.empty_icon.clone(),
            TrashState::Full => self.full_icon.clone(),
        }
    }

    fn poll(&mut self) {
        let Some(dir) = &self.dirname else { return };

        match scan_trash(dir) {
            None => {
                if self.state != TrashState::Empty {
                    self.state = TrashState::Empty;
                    let mut button = self.button.borrow_mut();
                    button.set_icon(self.empty_icon.clone());
                    button.set_tooltip(EMPTY_TOOLTIP);
                    debug!("Trash at {} is now empty", dir.display());
                }
            }
            Some(contents) => {
                let mut button = self.button.borrow_mut();
                if self.state == TrashState::Empty {
                    self.state = TrashState::Full;
                    button.set_icon(self.full_icon.clone());
                    debug!("Trash at {} is now full", dir.display());
                }
                button.set_tooltip(format_tooltip(&contents));
            }
        }
    }
}

/// Backend of one trash control
pub struct Trash {
    inner: Rc<RefCell<TrashInner>>,
    icons: Rc<dyn IconTheme>,
    scheduler: Rc<dyn Scheduler>,
    theme: Option<String>,
    timer: Option<TimerId>,
}

fn trash_icons(icons: &dyn IconTheme, theme: Option<&str>) -> (Icon, Icon) {
    (icons.resolve(theme, EMPTY_ICON), icons.resolve(theme, FULL_ICON))
}

fn default_trash_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".hearth").join("trash"))
}

/// Factory for trash controls
pub fn create_trash_control(control: &mut PanelControl, ctx: &ControlContext<'_>) -> Result<()> {
    let services = ctx.services;
    let theme = ctx.settings.theme.clone();
    let (empty_icon, full_icon) = trash_icons(services.icons.as_ref(), theme.as_deref());

    let button = Widget::icon_button(empty_icon.clone()).into_ref();
    button.borrow_mut().set_tooltip(EMPTY_TOOLTIP);

    let inner = Rc::new(RefCell::new(TrashInner {
        dirname: default_trash_dir(),
        command: DEFAULT_COMMAND.to_string(),
        in_terminal: false,
        state: TrashState::Empty,
        empty_icon,
        full_icon,
        button: button.clone(),
    }));

    connect_actions(&button, Rc::downgrade(&inner), services.runner.clone());

    let mut trash = Trash {
        inner,
        icons: services.icons.clone(),
        scheduler: services.scheduler.clone(),
        theme,
        timer: None,
    };
    trash.start_polling();

    control.base_mut().set_child(button);
    control.caption = Some(CAPTION.to_string());
    control.set_backend(Box::new(trash));
    Ok(())
}

/// Clicking runs the trash command; dropping runs it once per dropped item
fn connect_actions(button: &WidgetRef, inner: Weak<RefCell<TrashInner>>, runner: Rc<dyn CommandRunner>) {
    let clicked_inner = inner.clone();
    let clicked_runner = runner.clone();
    button.borrow_mut().connect(
        Signal::Clicked,
        Rc::new(move |_: &Event| {
            let Some(inner) = clicked_inner.upgrade() else { return };
            let inner = inner.borrow();
            if let Err(e) = clicked_runner.spawn(&inner.command, &[], inner.in_terminal) {
                warn!("Failed to run trash command: {:#}", e);
            }
        }),
    );

    button.borrow_mut().connect(
        Signal::Drop,
        Rc::new(move |event: &Event| {
            let Event::Drop { items } = event else { return };
            let Some(inner) = inner.upgrade() else { return };
            let inner = inner.borrow();

            for item in items {
                if let Err(e) = runner.spawn(&inner.command, std::slice::from_ref(item), false) {
                    debug!("Trash command failed for {}: {:#}", item, e);
                }
            }
        }),
    );
}

impl Trash {
    fn start_polling(&mut self) {
        self.stop_polling();

        let inner = Rc::downgrade(&self.inner);
        let id = self.scheduler.add_timeout(
            POLL_INTERVAL,
            Box::new(move || match inner.upgrade() {
                Some(inner) => {
                    inner.borrow_mut().poll();
                    ControlFlow::Continue(())
                }
                None => ControlFlow::Break(()),
            }),
        );
        self.timer = Some(id);
    }

    fn stop_polling(&mut self) {
        if let Some(id) = self.timer.take() {
            self.scheduler.remove(id);
        }
    }

    #[must_use]
    pub fn state(&self) -> TrashState {
        self.inner.borrow().state
    }
}

impl ControlBackend for Trash {
    fn attach_callback(&self, signal: Signal, callback: Callback) {
        self.inner.borrow().button.borrow_mut().connect(signal, callback);
    }

    fn free(&mut self) {
        self.stop_polling();
    }

    fn read_config(&mut self, node: &ControlNode) {
        let mut inner = self.inner.borrow_mut();
        if let Some(dirname) = node.option_str("dirname") {
            inner.dirname = Some(PathBuf::from(dirname));
        }
        if let Some(command) = node.option_str("command") {
            inner.command = command.to_string();
        }
        if let Some(in_terminal) = node.option_bool("in_terminal") {
            inner.in_terminal = in_terminal;
        }
    }

    fn write_config(&self, node: &mut ControlNode) {
        let inner = self.inner.borrow();
        if let Some(dirname) = &inner.dirname {
            node.set_option("dirname", dirname.to_string_lossy().as_ref());
        }
        node.set_option("command", inner.command.as_str());
        node.set_option("in_terminal", inner.in_terminal);
    }

    fn set_theme(&mut self, _base: &mut ControlBase, theme: &str) {
        self.theme = Some(theme.to_string());
        let (empty_icon, full_icon) = trash_icons(self.icons.as_ref(), self.theme.as_deref());

        let mut inner = self.inner.borrow_mut();
        inner.empty_icon = empty_icon;
        inner.full_icon = full_icon;
        let icon = inner.current_icon();
        inner.button.borrow_mut().set_icon(icon);
    }
}

impl Drop for Trash {
    fn drop(&mut self) {
        self.stop_polling();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::api::Services;
    use crate::scheduler::ManualScheduler;
    use crate::settings::Settings;
    use proptest::prelude::*;
    use tempfile::tempdir;

    struct NamedIcons;

    impl IconTheme for NamedIcons {
        fn lookup(&self, theme: Option<&str>, name: &str) -> Option<Icon> {
            Some(Icon {
                name: name.to_string(),
                path: theme.map(|t| PathBuf::from(t).join(name)),
            })
        }
    }

    #[derive(Default)]
    struct RecordingRunner {
        calls: RefCell<Vec<(String, Vec<String>, bool)>>,
    }

    impl CommandRunner for RecordingRunner {
        fn spawn(&self, command: &str, args: &[String], in_terminal: bool) -> Result<()> {
            self.calls
                .borrow_mut()
                .push((command.to_string(), args.to_vec(), in_terminal));
            Ok(())
        }
    }

    struct Fixture {
        scheduler: Rc<ManualScheduler>,
        runner: Rc<RecordingRunner>,
        control: PanelControl,
    }

    impl Fixture {
        fn new(dir: &Path) -> Self {
            let scheduler = Rc::new(ManualScheduler::new());
            let runner = Rc::new(RecordingRunner::default());
            let services = Services {
                icons: Rc::new(NamedIcons),
                runner: runner.clone(),
                scheduler: scheduler.clone(),
            };
            let settings = Settings::default();
            let ctx = ControlContext {
                services: &services,
                settings: &settings,
            };

            let mut control = PanelControl::new(0);
            create_trash_control(&mut control, &ctx).unwrap();

            let mut node = ControlNode::plugin("libtrash.so");
            node.set_option("dirname", dir.to_string_lossy().as_ref());
            control.read_config(&node);

            Self {
                scheduler,
                runner,
                control,
            }
        }

        fn button(&self) -> WidgetRef {
            self.control.base().child().unwrap().clone()
        }

        fn icon_name(&self) -> String {
            self.button().borrow().icon.clone().unwrap().name
        }

        fn tooltip(&self) -> String {
            self.button().borrow().tooltip.clone().unwrap()
        }

        fn poll(&self) {
            self.scheduler.advance(POLL_INTERVAL);
        }
    }

    #[test]
    fn test_format_size_units() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1 KB");
        assert_eq!(format_size(1_048_575), "1023 KB");
        assert_eq!(format_size(1_048_576), "1 MB");
    }

    #[test]
    fn test_scan_missing_or_empty_dir() {
        let dir = tempdir().unwrap();
        assert!(scan_trash(dir.path()).is_none());
        assert!(scan_trash(&dir.path().join("missing")).is_none());
    }

    #[test]
    fn test_scan_sums_sizes() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a"), vec![0u8; 10]).unwrap();
        fs::write(dir.path().join("b"), vec![0u8; 2000]).unwrap();

        let contents = scan_trash(dir.path()).unwrap();
        assert_eq!(contents, TrashContents { files: 2, bytes: 2010 });
        assert_eq!(format_tooltip(&contents), "Trashcan: 2 files / 1 KB");
    }

    #[test]
    fn test_poll_transitions() {
        let dir = tempdir().unwrap();
        let fixture = Fixture::new(dir.path());

        assert_eq!(fixture.icon_name(), EMPTY_ICON);
        assert_eq!(fixture.tooltip(), EMPTY_TOOLTIP);

        fs::write(dir.path().join("old.txt"), vec![0u8; 100]).unwrap();
        fixture.poll();
        assert_eq!(fixture.icon_name(), FULL_ICON);
        assert_eq!(fixture.tooltip(), "Trashcan: 1 files / 100 B");

        fs::write(dir.path().join("big.bin"), vec![0u8; 2 * 1024 * 1024]).unwrap();
        fixture.poll();
        assert_eq!(fixture.tooltip(), "Trashcan: 2 files / 2 MB");

        fs::remove_file(dir.path().join("old.txt")).unwrap();
        fs::remove_file(dir.path().join("big.bin")).unwrap();
        fixture.poll();
        assert_eq!(fixture.icon_name(), EMPTY_ICON);
        assert_eq!(fixture.tooltip(), EMPTY_TOOLTIP);
    }

    #[test]
    fn test_unreadable_dir_counts_as_empty() {
        let dir = tempdir().unwrap();
        let fixture = Fixture::new(&dir.path().join("gone"));
        fixture.poll();
        assert_eq!(fixture.icon_name(), EMPTY_ICON);
    }

    #[test]
    fn test_destroy_cancels_poll_timer() {
        let dir = tempdir().unwrap();
        let mut fixture = Fixture::new(dir.path());
        assert_eq!(fixture.scheduler.pending(), 1);

        fixture.control.destroy();
        assert_eq!(fixture.scheduler.pending(), 0);
        assert_eq!(fixture.scheduler.advance(Duration::from_secs(10)), 0);

        fixture.control.destroy();
        assert_eq!(fixture.scheduler.pending(), 0);
    }

    #[test]
    fn test_click_runs_command() {
        let dir = tempdir().unwrap();
        let fixture = Fixture::new(dir.path());

        Widget::emit(&fixture.button(), &Event::Clicked);

        let calls = fixture.runner.calls.borrow();
        assert_eq!(calls.as_slice(), &[(DEFAULT_COMMAND.to_string(), vec![], false)]);
    }

    #[test]
    fn test_drop_runs_command_per_item() {
        let dir = tempdir().unwrap();
        let fixture = Fixture::new(dir.path());

        Widget::emit(
            &fixture.button(),
            &Event::Drop {
                items: vec!["/tmp/a".to_string(), "/tmp/b c".to_string()],
            },
        );

        let calls = fixture.runner.calls.borrow();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].1, vec!["/tmp/a".to_string()]);
        assert_eq!(calls[1].1, vec!["/tmp/b c".to_string()]);
        assert!(calls.iter().all(|(cmd, _, term)| cmd == DEFAULT_COMMAND && !term));
    }

    #[test]
    fn test_theme_change_reresolves_icons() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("x"), b"x").unwrap();
        let mut fixture = Fixture::new(dir.path());
        fixture.poll();

        fixture.control.set_theme("Curve");

        let icon = fixture.button().borrow().icon.clone().unwrap();
        assert_eq!(icon.name, FULL_ICON);
        assert_eq!(icon.path, Some(PathBuf::from("Curve").join(FULL_ICON)));
    }

    #[test]
    fn test_config_round_trip() {
        let dir = tempdir().unwrap();
        let fixture = Fixture::new(dir.path());

        let node = fixture.control.write_config();
        assert_eq!(node.option_str("command"), Some(DEFAULT_COMMAND));
        assert_eq!(node.option_bool("in_terminal"), Some(false));
        assert_eq!(
            node.option_str("dirname").map(PathBuf::from),
            Some(dir.path().to_path_buf())
        );
    }

    proptest! {
        #[test]
        fn prop_units_match_magnitude(bytes in 0u64..(8 * MIB)) {
            let text = format_size(bytes);
            if bytes < KIB {
                prop_assert_eq!(text, format!("{bytes} B"));
            } else if bytes < MIB {
                prop_assert!(text.ends_with(" KB"));
            } else {
                prop_assert!(text.ends_with(" MB"));
            }
        }

        #[test]
        fn prop_state_follows_latest_poll(sizes in prop::collection::vec(
            prop::collection::vec(0usize..3000, 0..4), 1..5)
        ) {
            let dir = tempdir().unwrap();
            let fixture = Fixture::new(dir.path());

            for round in &sizes {
                for entry in fs::read_dir(dir.path()).unwrap() {
                    fs::remove_file(entry.unwrap().path()).unwrap();
                }
                for (i, size) in round.iter().enumerate() {
                    fs::write(dir.path().join(format!("f{i}")), vec![0u8; *size]).unwrap();
                }

                fixture.poll();

                if round.is_empty() {
                    prop_assert_eq!(fixture.icon_name(), EMPTY_ICON);
                    prop_assert_eq!(fixture.tooltip(), EMPTY_TOOLTIP);
                } else {
                    let total: u64 = round.iter().map(|s| *s as u64).sum();
                    let expected = format_tooltip(&TrashContents {
                        files: round.len() as u64,
                        bytes: total,
                    });
                    prop_assert_eq!(fixture.icon_name(), FULL_ICON);
                    prop_assert_eq!(fixture.tooltip(), expected);
                }
            }
        }
    }
}
