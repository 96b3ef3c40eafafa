use crate::error::{Error, Result};
use crate::snapshot::DatabaseSnapshot;

/// Validate internal consistency of a loaded snapshot.
///
/// This checks:
/// - table, column, and constraint keys match the names they index
/// - every column points back at the table that holds it
/// - both ends of every foreign-key edge are loaded tables and columns
pub fn validate_snapshot(snapshot: &DatabaseSnapshot) -> Result<()> {
    for (key, table) in &snapshot.tables {
        if key != &table.name {
            return Err(Error::InvalidSnapshot(format!(
                "table keyed as {key} is named {}",
                table.name
            )));
        }

        for (column_key, column) in &table.columns {
            if column_key != &column.name {
                return Err(Error::InvalidSnapshot(format!(
                    "column keyed as {}.{column_key} is named {}",
                    table.name, column.name
                )));
            }
            if column.table != table.name {
                return Err(Error::InvalidSnapshot(format!(
                    "column {}.{} claims table {}",
                    table.name, column.name, column.table
                )));
            }
        }
    }

    for (key, constraint) in &snapshot.constraints {
        if key != &constraint.name {
            return Err(Error::InvalidSnapshot(format!(
                "constraint keyed as {key} is named {}",
                constraint.name
            )));
        }

        if snapshot
            .column(&constraint.fk_table, &constraint.fk_column)
            .is_none()
        {
            return Err(Error::InvalidSnapshot(format!(
                "foreign key column not found for {}: {}.{}",
                constraint.name, constraint.fk_table, constraint.fk_column
            )));
        }

        if snapshot
            .column(&constraint.pk_table, &constraint.pk_column)
            .is_none()
        {
            return Err(Error::InvalidSnapshot(format!(
                "referenced column not found for {}: {}.{}",
                constraint.name, constraint.pk_table, constraint.pk_column
            )));
        }
    }

    Ok(())
}
