pub mod menu_cache;
pub mod session_store;
