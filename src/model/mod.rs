pub mod attendance;
pub mod break_entry;
pub mod role;
pub mod shift;
pub mod work_session;
