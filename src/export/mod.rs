pub mod csv;
pub mod tasks;

pub use csv::CsvError;
pub use tasks::{parse_import, tasks_to_csv, ImportRow, EXPORT_HEADER};
