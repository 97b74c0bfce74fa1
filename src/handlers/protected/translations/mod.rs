pub mod status;

pub use status::translations_status_get;
