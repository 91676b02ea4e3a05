//! Hearth - A desktop panel built from plugin controls
//!
//! This library provides the core of the Hearth panel: the module registry,
//! dynamic loading of control plugins, the dispatch table every control
//! implements, and the controls that ship with the panel.
//!
//! # Modules
//!
//! - [`config`]: Configuration management and the saved panel layout
//! - [`panel`]: The panel host that owns and lays out controls
//! - [`plugins`]: Module registry, plugin loader and control protocol
//! - [`scheduler`]: Periodic timers lent to controls
//! - [`settings`]: Panel-wide orientation, size, style and theme
//! - [`shell`]: Running user commands, optionally in a terminal
//! - [`ui`]: Headless widget tree and icon theme lookup

pub mod config;
pub mod panel;
pub mod plugins;
pub mod scheduler;
pub mod settings;
pub mod shell;
pub mod ui;
