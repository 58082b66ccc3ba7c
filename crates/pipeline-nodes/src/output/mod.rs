//! Output nodes
//!
//! Sink nodes that write results and publish no columns.

mod csv_output;

pub use csv_output::CsvOutput;
