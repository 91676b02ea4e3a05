//! Test fixture: the trash plugin built against the previous plugin API

#[allow(non_upper_case_globals)]
#[no_mangle]
pub static hearth_panel_control: u32 = hearth::plugins::API_VERSION - 1;

#[no_mangle]
pub fn hearth_plugin_init(module: &mut hearth::plugins::ModuleDescriptor) {
    hearth::plugins::trash::init_module(module);
}
