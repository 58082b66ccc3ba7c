//! Processing nodes
//!
//! Transform nodes. Each one derives its output columns from its input
//! columns and values through [`graph_compiler::ColumnTransform`].

mod concat;
mod custom_code;
mod drop_columns;
mod drop_missing;
mod filter_rows;
mod group_by;
mod merge;
mod one_hot_encode;
mod rename_columns;
mod select_columns;
mod sort_rows;

pub use concat::Concat;
pub use custom_code::CustomCode;
pub use drop_columns::DropColumns;
pub use drop_missing::DropMissing;
pub use filter_rows::FilterRows;
pub use group_by::GroupBy;
pub use merge::Merge;
pub use one_hot_encode::OneHotEncode;
pub use rename_columns::RenameColumns;
pub use select_columns::SelectColumns;
pub use sort_rows::SortRows;
