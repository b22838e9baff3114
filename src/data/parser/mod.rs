pub mod table;

// Expose the main loading functions
pub use table::{read_table, read_table_from_reader, ColumnLayout, Delimiter, TableOptions};
