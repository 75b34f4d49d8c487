//! DataFrame column helpers with validation
//!
//! Explicit column checks and typed extraction so a missing or mistyped
//! column surfaces as a `HabitatError` naming the column, not a bare polars
//! error deep inside a loader.

use polars::prelude::*;

use crate::error::{HabitatError, HabitatResult};

fn available_columns(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

/// Check every required column is present
///
/// # Example
/// ```rust,ignore
/// require_columns(&df, &["aphia_id", "event_id", "abundance"], "observations")?;
/// ```
pub fn require_columns(df: &DataFrame, columns: &[&str], context: &str) -> HabitatResult<()> {
    for &expected in columns {
        if df.column(expected).is_err() {
            return Err(HabitatError::MissingColumn {
                context: context.to_string(),
                column: expected.to_string(),
                available: available_columns(df),
            });
        }
    }
    Ok(())
}

fn get_column<'a>(df: &'a DataFrame, name: &str, context: &str) -> HabitatResult<&'a Column> {
    df.column(name).map_err(|_| HabitatError::MissingColumn {
        context: context.to_string(),
        column: name.to_string(),
        available: available_columns(df),
    })
}

/// Read a column as strings; numeric identifiers become their decimal text
pub fn string_values(df: &DataFrame, name: &str, context: &str) -> HabitatResult<Vec<Option<String>>> {
    let column = get_column(df, name, context)?;
    let as_str = column.cast(&DataType::String).map_err(|e| HabitatError::InvalidColumn {
        context: context.to_string(),
        column: name.to_string(),
        expected: "text",
        reason: e.to_string(),
    })?;

    let ca = as_str.str().map_err(|e| HabitatError::InvalidColumn {
        context: context.to_string(),
        column: name.to_string(),
        expected: "text",
        reason: e.to_string(),
    })?;

    Ok(ca.into_iter().map(|v| v.map(str::to_string)).collect())
}

/// Read a column as f64, rejecting values that do not parse as numbers
pub fn float_values(df: &DataFrame, name: &str, context: &str) -> HabitatResult<Vec<Option<f64>>> {
    let column = get_column(df, name, context)?;
    let invalid = |reason: String| HabitatError::InvalidColumn {
        context: context.to_string(),
        column: name.to_string(),
        expected: "numeric",
        reason,
    };

    if matches!(column.dtype(), DataType::Boolean) {
        return Err(invalid("boolean column".to_string()));
    }

    // Unparseable values become null under a lenient cast; any new null is a failure
    let as_f64 = column
        .cast(&DataType::Float64)
        .map_err(|e| invalid(e.to_string()))?;
    let unparsed = as_f64.null_count().saturating_sub(column.null_count());
    if unparsed > 0 {
        return Err(invalid(format!("{} value(s) are not numbers", unparsed)));
    }
    let ca = as_f64.f64().map_err(|e| invalid(e.to_string()))?;

    Ok(ca.into_iter().collect())
}

/// Read a boolean column
pub fn bool_values(df: &DataFrame, name: &str, context: &str) -> HabitatResult<Vec<Option<bool>>> {
    let column = get_column(df, name, context)?;
    let ca = column.bool().map_err(|e| HabitatError::InvalidColumn {
        context: context.to_string(),
        column: name.to_string(),
        expected: "boolean",
        reason: e.to_string(),
    })?;

    Ok(ca.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_columns_success() {
        let df = df![
            "aphia_id" => &[1i64, 2],
            "abundance" => &[1.0, 2.0],
        ].unwrap();

        assert!(require_columns(&df, &["aphia_id", "abundance"], "test").is_ok());
    }

    #[test]
    fn test_require_columns_missing() {
        let df = df![
            "aphia_id" => &[1i64],
        ].unwrap();

        let err = require_columns(&df, &["event_id"], "test").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("event_id"));
        assert!(msg.contains("aphia_id"));
    }

    #[test]
    fn test_string_values_from_integers() {
        let df = df![
            "aphia_id" => &[Some(103228i64), None],
        ].unwrap();

        let ids = string_values(&df, "aphia_id", "test").unwrap();
        assert_eq!(ids, vec![Some("103228".to_string()), None]);
    }

    #[test]
    fn test_float_values_parse_text_numbers() {
        let df = df![
            "abundance" => &[Some("5"), Some("2.5"), None],
        ].unwrap();

        let values = float_values(&df, "abundance", "test").unwrap();
        assert_eq!(values, vec![Some(5.0), Some(2.5), None]);
    }

    #[test]
    fn test_float_values_reject_malformed() {
        let df = df![
            "abundance" => &["5", "lots"],
        ].unwrap();

        let err = float_values(&df, "abundance", "test").unwrap_err();
        assert!(matches!(err, HabitatError::InvalidColumn { expected: "numeric", .. }));
    }

    #[test]
    fn test_float_values_reject_malformed_multi_chunk() {
        let mut df = df!["abundance" => &["5", "2"]].unwrap();
        let tail = df!["abundance" => &["3", "lots"]].unwrap();
        df.vstack_mut(&tail).unwrap();
        assert_eq!(df.column("abundance").unwrap().n_chunks(), 2);

        let err = float_values(&df, "abundance", "test").unwrap_err();
        assert!(matches!(err, HabitatError::InvalidColumn { expected: "numeric", .. }));
    }

    #[test]
    fn test_bool_values() {
        let df = df![
            "soft" => &[Some(true), None],
        ].unwrap();

        assert_eq!(bool_values(&df, "soft", "test").unwrap(), vec![Some(true), None]);
        assert!(bool_values(&df, "missing", "test").is_err());
    }
}
