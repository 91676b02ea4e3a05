// Headless presentation layer: widget tree and icon lookup
pub mod icons;
pub mod widget;

pub use icons::{DirectoryIconTheme, Icon, IconTheme};
pub use widget::{Callback, ControlBase, Event, OptionsPage, Signal, Widget, WidgetKind, WidgetRef};
