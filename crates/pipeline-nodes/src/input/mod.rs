//! Input nodes
//!
//! Source nodes whose columns are fetched from the schema library.

mod csv_input;
mod dataframe_input;

pub use csv_input::CsvInput;
pub use dataframe_input::DataFrameInput;
