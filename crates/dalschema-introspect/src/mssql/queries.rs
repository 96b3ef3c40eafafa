use dalschema_core::{Phase, Result};

use crate::executor::Row;

/// Data types the columns phase leaves out.
pub const UNSUPPORTED_TYPES: [&str; 5] = ["sysname", "timestamp", "hierarchyid", "geometry", "geography"];

// User-table columns with primary-key membership. Updated for SQL 2008;
// see UNSUPPORTED_TYPES for the types that are filtered out.
const TABLE_DATA_SQL: &str = r#"
SELECT sys.schemas.[Name] AS [SchemaName],
 sys.objects.[Name] AS [TableName],
 sys.columns.[Name] AS [ColumnName],
 sys.types.[name] AS [DataType],
 sys.columns.[max_length] AS [Length],
 sys.columns.[precision] AS [Precision],
 sys.columns.[scale] AS [Scale],
 sys.columns.[is_nullable] AS [IsNullable],
 CAST(ISNULL(PrimaryKeys.IsPK,0) AS BIT) AS [IsPK],
 sys.columns.[is_identity] AS [IsIdentity],
 sys.columns.column_id AS [ColumnOrdinal]
FROM sys.objects
 INNER JOIN sys.columns ON sys.objects.object_id = sys.columns.object_id
 INNER JOIN sys.types ON sys.columns.system_type_id = sys.types.system_type_id
 INNER JOIN sys.schemas ON sys.objects.schema_id = sys.schemas.schema_id
 LEFT JOIN
 (
  SELECT DISTINCT C.[TABLE_NAME] AS [TableName],
   K.[COLUMN_NAME] AS [ColumnName],
   1 AS [IsPK]
  FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE K
   INNER JOIN INFORMATION_SCHEMA.TABLE_CONSTRAINTS C ON K.CONSTRAINT_NAME = C.CONSTRAINT_NAME AND K.TABLE_NAME = C.TABLE_NAME
  WHERE C.CONSTRAINT_TYPE = 'PRIMARY KEY'
 ) PrimaryKeys ON PrimaryKeys.[TableName] = sys.objects.[Name] AND PrimaryKeys.[ColumnName] = sys.columns.[Name]
WHERE sys.objects.type = 'U'
 AND sys.types.[name] NOT IN ('sysname','timestamp','hierarchyid','geometry','geography')
 AND sys.types.is_user_defined = 0
ORDER BY sys.schemas.[Name], sys.objects.[name], sys.columns.[column_id]
"#;

const STORED_PROCEDURES_SQL: &str = r#"
SELECT sys.objects.name AS [Name],
 syscomments.text AS [Body]
FROM sys.objects
 INNER JOIN syscomments ON sys.objects.object_id = syscomments.id
WHERE sys.objects.type = 'p'
 AND sys.objects.is_ms_shipped = 0
ORDER BY sys.objects.name, syscomments.colid
"#;

const FUNCTIONS_SQL: &str = r#"
SELECT sys.objects.name AS [Name],
 syscomments.text AS [Body]
FROM sys.objects
 INNER JOIN syscomments ON sys.objects.object_id = syscomments.id
WHERE sys.objects.type = 'fn'
 AND sys.objects.is_ms_shipped = 0
ORDER BY sys.objects.name, syscomments.colid
"#;

const CONSTRAINTS_SQL: &str = r#"
SELECT C.CONSTRAINT_NAME AS [ConstraintName],
 FK.TABLE_NAME AS [FKTable],
 CU.COLUMN_NAME AS [FKColumn],
 PK.TABLE_NAME AS [PKTable],
 PT.COLUMN_NAME AS [PKColumn]
FROM INFORMATION_SCHEMA.REFERENTIAL_CONSTRAINTS C
 INNER JOIN INFORMATION_SCHEMA.TABLE_CONSTRAINTS FK ON C.CONSTRAINT_NAME = FK.CONSTRAINT_NAME
 INNER JOIN INFORMATION_SCHEMA.TABLE_CONSTRAINTS PK ON C.UNIQUE_CONSTRAINT_NAME = PK.CONSTRAINT_NAME
 INNER JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE CU ON C.CONSTRAINT_NAME = CU.CONSTRAINT_NAME
 INNER JOIN
 (
  SELECT i1.TABLE_NAME,
   i2.COLUMN_NAME
  FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS i1
   INNER JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE i2 ON i1.CONSTRAINT_NAME = i2.CONSTRAINT_NAME
  WHERE i1.CONSTRAINT_TYPE = 'PRIMARY KEY'
 ) PT ON PT.TABLE_NAME = PK.TABLE_NAME
ORDER BY C.CONSTRAINT_NAME
"#;

const DEFAULT_VALUES_SQL: &str = r#"
SELECT sys.objects.[Name] AS [TableName],
 syscolumns.[Name] AS [ColumnName],
 syscomments.text AS [DefaultValue]
FROM sys.objects
 INNER JOIN syscolumns ON sys.objects.[object_id] = syscolumns.[id]
 INNER JOIN syscomments ON syscomments.id = syscolumns.cdefault
WHERE syscolumns.cdefault > 0
 AND is_ms_shipped = 0
ORDER BY sys.objects.[name], syscolumns.colorder
"#;

/// Build the SQL batch a phase sends for `database`.
///
/// Every batch starts with `USE [<database>]` so that one connection string
/// can serve any database on the server.
pub fn build_query(phase: Phase, database: &str) -> String {
    let body = match phase {
        Phase::Columns => TABLE_DATA_SQL,
        Phase::StoredProcedures => STORED_PROCEDURES_SQL,
        Phase::Functions => FUNCTIONS_SQL,
        Phase::Constraints => CONSTRAINTS_SQL,
        Phase::DefaultValues => DEFAULT_VALUES_SQL,
    };
    format!(" USE [{}]{body}", database.replace(']', "]]"))
}

pub struct RawColumn {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub data_type: String,
    pub length: i32,
    pub precision: i32,
    pub scale: i32,
    pub is_nullable: bool,
    pub is_pk: bool,
    pub is_identity: bool,
    pub ordinal: i32,
}

impl RawColumn {
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            schema: row.get_str("SchemaName")?,
            table: row.get_str("TableName")?,
            name: row.get_str("ColumnName")?,
            data_type: row.get_str("DataType")?,
            length: row.get_i32("Length")?,
            precision: row.get_i32("Precision")?,
            scale: row.get_i32("Scale")?,
            is_nullable: row.get_bool("IsNullable")?,
            is_pk: row.get_bool("IsPK")?,
            is_identity: row.get_bool("IsIdentity")?,
            ordinal: row.get_i32("ColumnOrdinal")?,
        })
    }
}

pub struct RawScript {
    pub name: String,
    pub body: String,
}

impl RawScript {
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            name: row.get_str("Name")?,
            body: row.get_str("Body")?,
        })
    }
}

pub struct RawConstraint {
    pub name: String,
    pub fk_table: String,
    pub fk_column: String,
    pub pk_table: String,
    pub pk_column: String,
}

impl RawConstraint {
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            name: row.get_str("ConstraintName")?,
            fk_table: row.get_str("FKTable")?,
            fk_column: row.get_str("FKColumn")?,
            pk_table: row.get_str("PKTable")?,
            pk_column: row.get_str("PKColumn")?,
        })
    }
}

pub struct RawDefault {
    pub table: String,
    pub column: String,
    pub value: String,
}

impl RawDefault {
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            table: row.get_str("TableName")?,
            column: row.get_str("ColumnName")?,
            value: row.get_str("DefaultValue")?,
        })
    }
}
