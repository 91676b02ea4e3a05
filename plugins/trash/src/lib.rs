//! Trash monitor panel plugin
//!
//! Build with `cargo build --release` from `plugins/` and copy
//! `libhearth_trash.so` into a plugin directory.

hearth::export_panel_plugin!(hearth::plugins::trash::init_module);
