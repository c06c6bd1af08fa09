pub mod attendance;
pub mod shift_catalog;
pub mod time_accounting;

pub use attendance::AttendanceService;
pub use shift_catalog::ShiftCatalog;
