use crate::DatabaseColumn;
use std::fmt;

/// Outcome of interpreting a column's default value expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedDefault {
    /// Use this expression as the property's default value SQL
    Sql(String),

    /// The default carries no information for the model
    Omitted,

    /// The expression could not be interpreted
    Unrecognized,
}

/// Turns the default value expression a database catalog reports into the
/// expression recorded in the model.
pub trait DefaultValueNormalizer: Send + Sync + fmt::Debug {
    fn normalize(&self, column: &DatabaseColumn, default_value_sql: &str) -> NormalizedDefault;
}

/// Strips the parentheses some databases wrap default expressions in, so
/// `((0))` becomes `0`. A `NULL` default on a nullable column is omitted.
///
/// Catalogs that do not parenthesize report short literals bare, so a
/// single alphanumeric character such as `0` is kept. Any other expression
/// shorter than two characters is unrecognized.
#[derive(Debug, Default, Clone, Copy)]
pub struct ParenthesizedDefaultValue;

impl DefaultValueNormalizer for ParenthesizedDefaultValue {
    fn normalize(&self, column: &DatabaseColumn, default_value_sql: &str) -> NormalizedDefault {
        let mut sql = default_value_sql.trim();
        if sql.len() < 2 && !sql.chars().all(|c| c.is_ascii_alphanumeric()) {
            return NormalizedDefault::Unrecognized;
        }

        while is_enclosed(sql) {
            sql = sql[1..sql.len() - 1].trim();
        }

        if sql.is_empty() {
            return NormalizedDefault::Unrecognized;
        }

        if sql.eq_ignore_ascii_case("NULL") && column.is_nullable {
            return NormalizedDefault::Omitted;
        }

        NormalizedDefault::Sql(sql.to_string())
    }
}

/// Whether the first `(` of `sql` is closed by its last `)`.
fn is_enclosed(sql: &str) -> bool {
    if !sql.starts_with('(') || !sql.ends_with(')') {
        return false;
    }

    let mut depth = 0usize;
    for (i, c) in sql.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i == sql.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}
