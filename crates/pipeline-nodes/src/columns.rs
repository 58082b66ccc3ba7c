//! Helpers shared by the column transforms

use graph_compiler::{Column, CompilerError, PortColumns, Result, Values};
use serde_json::Value;

/// Columns arriving on an input port; empty until upstream is known
pub fn on_port<'a>(inputs: &'a PortColumns, port: &str) -> &'a [Column] {
    inputs.get(port).map(Vec::as_slice).unwrap_or(&[])
}

/// Column names held by a parameter
///
/// Only a list of names is accepted; null means none. A bare string would
/// render as a variable reference in generated code.
pub fn names(values: &Values, parameter: &str) -> Result<Vec<String>> {
    match values.get(parameter) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| not_a_name_list(parameter))
            })
            .collect(),
        Some(_) => Err(not_a_name_list(parameter)),
    }
}

fn not_a_name_list(parameter: &str) -> CompilerError {
    CompilerError::transform(format!("'{}' must be a list of column names", parameter))
}

/// Fail when a named column is not among the known ones
///
/// Nothing is checked while the incoming columns are still unknown.
pub fn ensure_known(columns: &[Column], names: &[String]) -> Result<()> {
    if columns.is_empty() {
        return Ok(());
    }
    match names.iter().find(|name| !contains(columns, name)) {
        Some(missing) => Err(CompilerError::transform(format!("unknown column '{}'", missing))),
        None => Ok(()),
    }
}

pub fn contains(columns: &[Column], name: &str) -> bool {
    columns.iter().any(|c| c.name == name)
}

pub fn find<'a>(columns: &'a [Column], name: &str) -> Option<&'a Column> {
    columns.iter().find(|c| c.name == name)
}

/// Input columns for tests: one port with `(name, type)` pairs
#[cfg(test)]
pub(crate) fn fixture(port: &str, columns: &[(&str, &str)]) -> PortColumns {
    let mut inputs = PortColumns::new();
    inputs.insert(
        port.to_string(),
        columns.iter().map(|(name, ty)| Column::new(*name, *ty)).collect(),
    );
    inputs
}
