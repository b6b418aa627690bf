pub mod bracket_sync;
pub mod chart_surface;
pub mod state_store;
