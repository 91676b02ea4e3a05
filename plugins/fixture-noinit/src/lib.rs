//! Test fixture: carries the panel marker but no initializer

#[allow(non_upper_case_globals)]
#[no_mangle]
pub static hearth_panel_control: u32 = hearth::plugins::API_VERSION;
