use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use dalschema_core::{Column, Constraint, Error, Result, Script, Table};

use crate::executor::ResultSet;

use super::queries::{RawColumn, RawConstraint, RawDefault, RawScript};

/// Number of rows a phase applied, and how many default rows had no target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub applied: usize,
    pub skipped: usize,
}

/// Insert every column row, creating tables on first sight.
///
/// Stops at the first duplicate column; rows before it stay merged.
pub fn merge_columns(
    tables: &mut BTreeMap<String, Table>,
    result: &ResultSet,
) -> Result<MergeStats> {
    let mut stats = MergeStats::default();
    if result.is_empty() {
        return Ok(stats);
    }

    for row in result.rows() {
        let raw = RawColumn::from_row(row)?;
        let table = tables
            .entry(raw.table.clone())
            .or_insert_with(|| Table::new(raw.schema.clone(), raw.table.clone()));

        match table.columns.entry(raw.name.clone()) {
            Entry::Occupied(_) => {
                return Err(Error::DuplicateColumn {
                    table: table.name.clone(),
                    column: raw.name,
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(Column {
                    schema: raw.schema,
                    table: raw.table,
                    name: raw.name,
                    data_type: raw.data_type,
                    length: raw.length,
                    precision: raw.precision,
                    scale: raw.scale,
                    is_nullable: raw.is_nullable,
                    is_pk: raw.is_pk,
                    is_identity: raw.is_identity,
                    ordinal: raw.ordinal,
                    default_value: None,
                });
            }
        }
        stats.applied += 1;
    }

    Ok(stats)
}

/// Collect routine rows, appending bodies for names seen before.
///
/// Catalog storage splits long definitions into ordered fragments, so a
/// repeated name continues the previous body rather than replacing it.
pub fn merge_scripts(
    scripts: &mut BTreeMap<String, Script>,
    result: &ResultSet,
) -> Result<MergeStats> {
    let mut stats = MergeStats::default();
    if result.is_empty() {
        return Ok(stats);
    }

    for row in result.rows() {
        let raw = RawScript::from_row(row)?;
        match scripts.entry(raw.name) {
            Entry::Occupied(mut slot) => slot.get_mut().body.push_str(&raw.body),
            Entry::Vacant(slot) => {
                let name = slot.key().clone();
                slot.insert(Script {
                    name,
                    body: raw.body,
                });
            }
        }
        stats.applied += 1;
    }

    Ok(stats)
}

/// Insert every foreign-key edge. Stops at the first duplicate name.
pub fn merge_constraints(
    constraints: &mut BTreeMap<String, Constraint>,
    result: &ResultSet,
) -> Result<MergeStats> {
    let mut stats = MergeStats::default();
    if result.is_empty() {
        return Ok(stats);
    }

    for row in result.rows() {
        let raw = RawConstraint::from_row(row)?;
        match constraints.entry(raw.name) {
            Entry::Occupied(slot) => {
                return Err(Error::DuplicateConstraint(slot.key().clone()));
            }
            Entry::Vacant(slot) => {
                let name = slot.key().clone();
                slot.insert(Constraint {
                    name,
                    fk_table: raw.fk_table,
                    fk_column: raw.fk_column,
                    pk_table: raw.pk_table,
                    pk_column: raw.pk_column,
                });
            }
        }
        stats.applied += 1;
    }

    Ok(stats)
}

/// Attach cleaned defaults to columns that were already loaded.
///
/// Rows naming an unknown table or column are counted as skipped.
pub fn attach_defaults(
    tables: &mut BTreeMap<String, Table>,
    result: &ResultSet,
) -> Result<MergeStats> {
    let mut stats = MergeStats::default();
    if result.is_empty() {
        return Ok(stats);
    }

    for row in result.rows() {
        let raw = RawDefault::from_row(row)?;
        let column = tables
            .get_mut(&raw.table)
            .and_then(|table| table.columns.get_mut(&raw.column));

        match column {
            Some(column) => {
                column.default_value = Some(remove_wrapping_characters(&raw.value).to_string());
                stats.applied += 1;
            }
            None => {
                tracing::debug!(
                    event = "default_skipped",
                    table = %raw.table,
                    column = %raw.column
                );
                stats.skipped += 1;
            }
        }
    }

    Ok(stats)
}

/// Strip the characters that wrap a stored default expression.
///
/// Two passes, each dropping the first and last character when the value is
/// longer than one character and starts with `(` or `'`:
/// `('Something')` becomes `Something`, `((0))` becomes `0`.
pub fn remove_wrapping_characters(input: &str) -> &str {
    strip_wrapper(strip_wrapper(input))
}

fn strip_wrapper(input: &str) -> &str {
    let mut chars = input.chars();
    match (chars.next(), chars.next_back()) {
        (Some('(' | '\''), Some(_)) => chars.as_str(),
        _ => input,
    }
}
