//! Built-in launcher
//!
//! The one control that is always available. Every failed plugin control is
//! replaced by one of these.

use anyhow::Result;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::warn;

use super::api::{ControlBackend, ControlContext, ModuleId};
use super::control::{ControlNode, PanelControl};
use super::registry::PanelModule;
use crate::shell::CommandRunner;
use crate::ui::{Callback, ControlBase, Event, IconTheme, Signal, Widget, WidgetRef};

pub const NAME: &str = "icon";
pub const CAPTION: &str = "Launcher";
pub const DEFAULT_ICON: &str = "application-x-executable";

/// Registry entry for the launcher
#[must_use]
pub fn module() -> PanelModule {
    PanelModule::builtin(ModuleId::ICON, NAME, CAPTION, Rc::new(create_launcher_control))
}

/// Factory entry point; building a launcher cannot fail
pub fn create_launcher_control(control: &mut PanelControl, ctx: &ControlContext<'_>) -> Result<()> {
    build(control, ctx);
    Ok(())
}

#[derive(Debug, Clone)]
struct LauncherState {
    command: Option<String>,
    icon: String,
    tooltip: Option<String>,
    in_terminal: bool,
}

struct Launcher {
    state: Rc<RefCell<LauncherState>>,
    button: WidgetRef,
    icons: Rc<dyn IconTheme>,
    theme: Option<String>,
}

/// Turn `control` into a launcher
pub fn build(control: &mut PanelControl, ctx: &ControlContext<'_>) {
    let state = Rc::new(RefCell::new(LauncherState {
        command: None,
        icon: DEFAULT_ICON.to_string(),
        tooltip: None,
        in_terminal: false,
    }));

    let theme = ctx.settings.theme.clone();
    let icon = ctx.services.icons.resolve(theme.as_deref(), DEFAULT_ICON);
    let button = Widget::icon_button(icon).into_ref();
    button.borrow_mut().set_tooltip(CAPTION);

    let runner: Rc<dyn CommandRunner> = ctx.services.runner.clone();
    let clicked_state = state.clone();
    button.borrow_mut().connect(
        Signal::Clicked,
        Rc::new(move |_: &Event| {
            let state = clicked_state.borrow();
            if let Some(command) = &state.command {
                if let Err(e) = runner.spawn(command, &[], state.in_terminal) {
                    warn!("Launcher failed: {:#}", e);
                }
            }
        }),
    );

    control.base_mut().set_child(button.clone());
    control.caption = Some(CAPTION.to_string());
    control.set_backend(Box::new(Launcher {
        state,
        button,
        icons: ctx.services.icons.clone(),
        theme,
    }));
}

impl Launcher {
    fn refresh(&self) {
        let state = self.state.borrow();
        let mut button = self.button.borrow_mut();
        button.set_icon(self.icons.resolve(self.theme.as_deref(), &state.icon));
        button.set_tooltip(
            state
                .tooltip
                .clone()
                .or_else(|| state.command.clone())
                .unwrap_or_else(|| CAPTION.to_string()),
        );
    }
}

impl ControlBackend for Launcher {
    fn attach_callback(&self, signal: Signal, callback: Callback) {
        self.button.borrow_mut().connect(signal, callback);
    }

    fn read_config(&mut self, node: &ControlNode) {
        {
            let mut state = self.state.borrow_mut();
            if let Some(command) = node.option_str("command") {
                state.command = Some(command.to_string());
            }
            if let Some(icon) = node.option_str("icon") {
                state.icon = icon.to_string();
            }
            if let Some(tooltip) = node.option_str("tooltip") {
                state.tooltip = Some(tooltip.to_string());
            }
            if let Some(in_terminal) = node.option_bool("in_terminal") {
                state.in_terminal = in_terminal;
            }
        }
        self.refresh();
    }

    fn write_config(&self, node: &mut ControlNode) {
        let state = self.state.borrow();
        if let Some(command) = &state.command {
            node.set_option("command", command.as_str());
        }
        node.set_option("icon", state.icon.as_str());
        if let Some(tooltip) = &state.tooltip {
            node.set_option("tooltip", tooltip.as_str());
        }
        node.set_option("in_terminal", state.in_terminal);
    }

    fn set_theme(&mut self, _base: &mut ControlBase, theme: &str) {
        self.theme = Some(theme.to_string());
        self.refresh();
    }
}
