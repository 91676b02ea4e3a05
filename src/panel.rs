//! The panel: an ordered row of controls sharing one settings snapshot

use anyhow::{anyhow, Result};
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{debug, info};

use crate::config::Config;
use crate::plugins::{
    ActivationHandler, ControlHost, ControlNode, PanelControl, PanelModule, PluginLoader, Services,
    MENU_BUTTON,
};
use crate::settings::{Orientation, Settings, SizeClass, Style};
use crate::ui::{Event, OptionsPage};

pub struct Panel {
    // Controls go before the host so they are destroyed before modules unload.
    controls: Vec<PanelControl>,
    host: ControlHost,
    settings: Settings,
    on_activate: ActivationHandler,
}

impl Panel {
    /// Build the panel from a saved layout; an empty layout gets one launcher
    pub fn new(
        host: ControlHost,
        settings: Settings,
        layout: &[ControlNode],
        on_activate: ActivationHandler,
    ) -> Self {
        let mut panel = Self {
            controls: Vec::with_capacity(layout.len().max(1)),
            host,
            settings,
            on_activate,
        };

        if layout.is_empty() {
            let control = panel.instantiate(0, None);
            panel.controls.push(control);
        } else {
            for (index, node) in layout.iter().enumerate() {
                let control = panel.instantiate(index, Some(node));
                panel.controls.push(control);
            }
        }

        info!("Panel started with {} controls", panel.controls.len());
        panel
    }

    /// Load modules from the configured search path and restore the saved layout
    ///
    /// `extra_dirs` are scanned before any configured directory.
    pub fn from_config(
        config: &Config,
        extra_dirs: &[PathBuf],
        services: Services,
        on_activate: ActivationHandler,
    ) -> Self {
        let mut loader = PluginLoader::new();
        loader.init(&config.plugin_search_path(extra_dirs));

        Self::new(
            ControlHost::new(loader, services),
            config.panel.clone(),
            &config.controls,
            on_activate,
        )
    }

    /// Handler that logs presses and popup menu requests
    #[must_use]
    pub fn logging_activation_handler() -> ActivationHandler {
        Rc::new(|index: usize, event: &Event| match event {
            Event::ButtonPress { button } if *button == MENU_BUTTON => {
                info!("Popup menu requested for control {}", index);
            }
            _ => debug!("Control {} activated: {:?}", index, event),
        })
    }

    fn instantiate(&mut self, index: usize, node: Option<&ControlNode>) -> PanelControl {
        self.host
            .instantiate(index, node, &self.settings, &self.on_activate)
    }

    #[must_use]
    pub fn controls(&self) -> &[PanelControl] {
        &self.controls
    }

    #[must_use]
    pub fn control(&self, index: usize) -> Option<&PanelControl> {
        self.controls.get(index)
    }

    pub fn control_mut(&mut self, index: usize) -> Option<&mut PanelControl> {
        self.controls.get_mut(index)
    }

    /// Modules controls can be created from, in registration order
    #[must_use]
    pub fn modules(&self) -> &[PanelModule] {
        self.host.loader().registry().all()
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn host(&self) -> &ControlHost {
        &self.host
    }

    /// Append a control created from the module called `module_name`
    ///
    /// # Errors
    /// Returns an error if no module has that name
    pub fn add_control(&mut self, module_name: &str) -> Result<usize> {
        let module = self
            .host
            .loader()
            .registry()
            .find_by_name(module_name)
            .ok_or_else(|| anyhow!("No panel module named '{module_name}'"))?;

        let node = match module.filename() {
            Some(filename) => ControlNode::plugin(filename),
            None => ControlNode::new(module.id),
        };

        let index = self.controls.len();
        let control = self.instantiate(index, Some(&node));
        self.controls.push(control);
        info!("Added {} control at {}", module_name, index);
        Ok(index)
    }

    /// Destroy the control at `index` and close the gap
    ///
    /// # Errors
    /// Returns an error if there is no such control
    pub fn remove_control(&mut self, index: usize) -> Result<()> {
        if index >= self.controls.len() {
            return Err(anyhow!("No control at index {index}"));
        }

        let mut control = self.controls.remove(index);
        control.destroy();

        for (i, control) in self.controls.iter_mut().enumerate().skip(index) {
            control.set_index(i);
        }
        Ok(())
    }

    /// Options page for the control at `index`
    pub fn options(&mut self, index: usize) -> Option<OptionsPage> {
        let control = self.controls.get_mut(index)?;
        let mut page = OptionsPage::new();
        control.add_options(&mut page);
        Some(page)
    }

    /// Replace the settings snapshot and push it to every control
    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
        for control in &mut self.controls {
            control.apply_settings(&self.settings);
        }
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.settings.orientation = orientation;
        for control in &mut self.controls {
            control.set_orientation(orientation);
        }
    }

    pub fn set_size(&mut self, size: SizeClass) {
        self.settings.size = size;
        for control in &mut self.controls {
            control.set_size(size);
        }
    }

    pub fn set_style(&mut self, style: Style) {
        self.settings.style = style;
        for control in &mut self.controls {
            control.set_style(style);
        }
    }

    pub fn set_theme(&mut self, theme: &str) {
        self.settings.theme = Some(theme.to_string());
        for control in &mut self.controls {
            control.set_theme(theme);
        }
    }

    /// Saved records of all controls, in panel order
    #[must_use]
    pub fn layout(&self) -> Vec<ControlNode> {
        self.controls.iter().map(PanelControl::write_config).collect()
    }

    /// Destroy every control, then release the modules
    pub fn shutdown(&mut self) {
        for mut control in self.controls.drain(..) {
            control.destroy();
        }
        self.host.shutdown();
    }
}

impl Drop for Panel {
    fn drop(&mut self) {
        self.shutdown();
    }
}
