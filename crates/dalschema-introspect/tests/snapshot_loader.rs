use anyhow::{Context, Result, anyhow};
use dalschema_core::{Error, LoadState, Phase};
use dalschema_introspect::{
    ConnectionDescriptor, LoaderOptions, ResultSet, SnapshotLoader, StaticExecutor, Value,
    build_query, load_snapshot,
};

const COLUMN_HEADERS: [&str; 11] = [
    "SchemaName",
    "TableName",
    "ColumnName",
    "DataType",
    "Length",
    "Precision",
    "Scale",
    "IsNullable",
    "IsPK",
    "IsIdentity",
    "ColumnOrdinal",
];

fn column_row(table: &str, column: &str, data_type: &str, ordinal: i32, is_pk: bool) -> Vec<Value> {
    vec![
        "dbo".into(),
        table.into(),
        column.into(),
        data_type.into(),
        Value::Int(4),
        Value::Int(10),
        Value::Int(0),
        Value::Bool(!is_pk),
        Value::Bool(is_pk),
        Value::Bool(is_pk),
        Value::Int(ordinal.into()),
    ]
}

fn columns(rows: Vec<Vec<Value>>) -> ResultSet {
    let mut result = ResultSet::new(COLUMN_HEADERS);
    for row in rows {
        result.push_row(row);
    }
    result
}

fn scripts(rows: &[(&str, &str)]) -> ResultSet {
    let mut result = ResultSet::new(["Name", "Body"]);
    for (name, body) in rows {
        result.push_row([*name, *body]);
    }
    result
}

fn constraints(rows: &[[&str; 5]]) -> ResultSet {
    let mut result = ResultSet::new(["ConstraintName", "FKTable", "FKColumn", "PKTable", "PKColumn"]);
    for row in rows {
        result.push_row(*row);
    }
    result
}

fn defaults(rows: &[[&str; 3]]) -> ResultSet {
    let mut result = ResultSet::new(["TableName", "ColumnName", "DefaultValue"]);
    for row in rows {
        result.push_row(*row);
    }
    result
}

fn shop_executor(database: &str) -> StaticExecutor {
    StaticExecutor::new()
        .respond(
            build_query(Phase::Columns, database),
            columns(vec![
                column_row("Customers", "Id", "int", 1, true),
                column_row("Customers", "Status", "varchar", 2, false),
                column_row("Orders", "Id", "int", 1, true),
                column_row("Orders", "CustomerId", "int", 2, false),
            ]),
        )
        .respond(
            build_query(Phase::StoredProcedures, database),
            scripts(&[("P1", "SELECT 1"), ("P1", " UNION SELECT 2")]),
        )
        .respond(
            build_query(Phase::Functions, database),
            scripts(&[("P1", "RETURN 1")]),
        )
        .respond(
            build_query(Phase::Constraints, database),
            constraints(&[["FK_Orders_Customers", "Orders", "CustomerId", "Customers", "Id"]]),
        )
        .respond(
            build_query(Phase::DefaultValues, database),
            defaults(&[
                ["Customers", "Status", "('active')"],
                ["Orders", "Id", "((0))"],
                ["Archive", "Id", "((1))"],
                ["Orders", "Missing", "((2))"],
            ]),
        )
}

fn conn() -> ConnectionDescriptor {
    ConnectionDescriptor::new("Server=localhost;User Id=sa;Password=secret")
}

#[tokio::test]
async fn loads_consistent_snapshot() -> Result<()> {
    let (snapshot, consistent) = load_snapshot(shop_executor("Shop"), "Shop", conn()).await?;

    assert!(consistent);
    assert_eq!(snapshot.state, LoadState::Consistent);
    assert!(snapshot.errors.is_empty());
    assert_eq!(snapshot.name, "Shop");
    assert_eq!(snapshot.tables.len(), 2);

    let customer_id = snapshot
        .column("Orders", "CustomerId")
        .context("expected Orders.CustomerId")?;
    assert_eq!(customer_id.table, "Orders");
    assert_eq!(customer_id.schema, "dbo");
    assert_eq!(customer_id.ordinal, 2);
    assert!(!customer_id.is_pk);

    let status = snapshot
        .column("Customers", "Status")
        .context("expected Customers.Status")?;
    assert_eq!(status.default_value.as_deref(), Some("active"));
    assert_eq!(
        snapshot
            .column("Orders", "Id")
            .and_then(|column| column.default_value.as_deref()),
        Some("0")
    );

    assert_eq!(snapshot.stored_procedures["P1"].body, "SELECT 1 UNION SELECT 2");
    assert_eq!(snapshot.functions["P1"].body, "RETURN 1");
    assert_eq!(snapshot.constraints["FK_Orders_Customers"].pk_table, "Customers");
    dalschema_core::validate_snapshot(&snapshot)?;
    Ok(())
}

#[tokio::test]
async fn runs_phases_in_fixed_order() -> Result<()> {
    let mut loader = SnapshotLoader::new(shop_executor("Shop"));
    loader.load_snapshot("Shop", conn()).await?;

    let expected: Vec<String> = Phase::ALL
        .into_iter()
        .map(|phase| build_query(phase, "Shop"))
        .collect();
    assert_eq!(loader.executor().calls(), expected);
    Ok(())
}

#[tokio::test]
async fn empty_name_fails_before_any_query() -> Result<()> {
    let mut loader = SnapshotLoader::new(shop_executor("Shop"));

    let err = loader
        .load_snapshot("", conn())
        .await
        .err()
        .ok_or_else(|| anyhow!("empty name should be rejected"))?;

    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(loader.executor().calls().is_empty());
    assert!(loader.snapshot().errors.is_empty());
    assert_eq!(loader.snapshot().state, LoadState::Empty);
    Ok(())
}

#[tokio::test]
async fn duplicate_column_keeps_first_and_records_one_error() -> Result<()> {
    let executor = shop_executor("Shop").respond(
        build_query(Phase::Columns, "Shop"),
        columns(vec![
            column_row("Customers", "Id", "int", 1, true),
            column_row("Customers", "Id", "bigint", 2, false),
            column_row("Orders", "Id", "int", 1, true),
        ]),
    );

    let (snapshot, consistent) = load_snapshot(executor, "Shop", conn()).await?;

    assert!(!consistent);
    assert_eq!(snapshot.state, LoadState::PartiallyLoaded);
    let customers = snapshot.table("Customers").context("expected Customers")?;
    assert_eq!(customers.columns.len(), 1);
    assert_eq!(customers.columns["Id"].data_type, "int");
    assert!(snapshot.table("Orders").is_none());

    assert_eq!(snapshot.errors.len(), 1);
    assert_eq!(snapshot.errors[0].phase, Phase::Columns);
    assert!(snapshot.errors[0].message.contains("Id"));

    assert_eq!(snapshot.stored_procedures.len(), 1);
    assert_eq!(snapshot.constraints.len(), 1);
    Ok(())
}

#[tokio::test]
async fn duplicate_constraint_keeps_first_occurrence() -> Result<()> {
    let executor = shop_executor("Shop").respond(
        build_query(Phase::Constraints, "Shop"),
        constraints(&[
            ["FK_Orders_Customers", "Orders", "CustomerId", "Customers", "Id"],
            ["FK_Orders_Customers", "Orders", "Id", "Customers", "Id"],
        ]),
    );

    let (snapshot, consistent) = load_snapshot(executor, "Shop", conn()).await?;

    assert!(!consistent);
    assert_eq!(snapshot.errors.len(), 1);
    assert_eq!(snapshot.errors[0].phase, Phase::Constraints);
    assert_eq!(snapshot.constraints.len(), 1);
    assert_eq!(snapshot.constraints["FK_Orders_Customers"].fk_column, "CustomerId");
    assert_eq!(
        snapshot
            .column("Customers", "Status")
            .and_then(|column| column.default_value.as_deref()),
        Some("active")
    );
    Ok(())
}

#[tokio::test]
async fn failing_query_does_not_stop_later_phases() -> Result<()> {
    let executor = shop_executor("Shop")
        .fail(build_query(Phase::StoredProcedures, "Shop"), "timeout expired")
        .fail(build_query(Phase::Functions, "Shop"), "permission denied");

    let (snapshot, consistent) = load_snapshot(executor, "Shop", conn()).await?;

    assert!(!consistent);
    let phases: Vec<Phase> = snapshot.errors.iter().map(|err| err.phase).collect();
    assert_eq!(phases, vec![Phase::StoredProcedures, Phase::Functions]);
    assert!(snapshot.errors[0].message.contains("timeout expired"));
    assert!(snapshot.stored_procedures.is_empty());
    assert!(snapshot.functions.is_empty());
    assert_eq!(snapshot.tables.len(), 2);
    assert_eq!(snapshot.constraints.len(), 1);
    Ok(())
}

#[tokio::test]
async fn default_for_unknown_table_is_skipped_silently() -> Result<()> {
    let executor = shop_executor("Shop").respond(
        build_query(Phase::DefaultValues, "Shop"),
        defaults(&[["T1", "C1", "('active')"]]),
    );

    let (snapshot, consistent) = load_snapshot(executor, "Shop", conn()).await?;

    assert!(consistent);
    assert!(snapshot.errors.is_empty());
    assert!(
        snapshot
            .tables
            .values()
            .flat_map(|table| table.columns.values())
            .all(|column| column.default_value.is_none())
    );
    Ok(())
}

#[tokio::test]
async fn reload_replaces_previous_snapshot() -> Result<()> {
    let executor = StaticExecutor::new()
        .respond(
            build_query(Phase::Columns, "First"),
            columns(vec![column_row("Legacy", "Id", "int", 1, true)]),
        )
        .respond(
            build_query(Phase::StoredProcedures, "First"),
            scripts(&[("OldProc", "SELECT 0")]),
        )
        .respond(
            build_query(Phase::Columns, "Second"),
            columns(vec![column_row("Current", "Id", "int", 1, true)]),
        );

    let mut loader = SnapshotLoader::new(executor);
    let first = loader.load_snapshot("First", conn()).await?;
    assert!(!first);
    assert!(loader.snapshot().table("Legacy").is_some());

    let second = loader
        .load_snapshot("Second", ConnectionDescriptor::local())
        .await?;

    let snapshot = loader.snapshot();
    assert!(!second);
    assert_eq!(snapshot.name, "Second");
    assert_eq!(snapshot.connection, ConnectionDescriptor::local());
    assert!(snapshot.table("Legacy").is_none());
    assert!(snapshot.table("Current").is_some());
    assert!(snapshot.stored_procedures.is_empty());
    assert_eq!(snapshot.errors.len(), 4);
    assert!(snapshot.errors.iter().all(|err| err.phase != Phase::Columns));
    Ok(())
}

#[tokio::test]
async fn skipped_phases_run_no_query() -> Result<()> {
    let options = LoaderOptions::default()
        .skip(Phase::StoredProcedures)
        .skip(Phase::Functions);
    let executor = StaticExecutor::new()
        .respond(
            build_query(Phase::Columns, "Shop"),
            columns(vec![column_row("Customers", "Status", "varchar", 1, false)]),
        )
        .respond(build_query(Phase::Constraints, "Shop"), constraints(&[]))
        .respond(
            build_query(Phase::DefaultValues, "Shop"),
            defaults(&[["Customers", "Status", "('')"]]),
        );

    let mut loader = SnapshotLoader::with_options(executor, options);
    let consistent = loader.load_snapshot("Shop", conn()).await?;

    assert!(consistent);
    assert_eq!(loader.executor().calls().len(), 3);
    assert_eq!(
        loader
            .snapshot()
            .column("Customers", "Status")
            .and_then(|column| column.default_value.as_deref()),
        Some("")
    );
    Ok(())
}

#[tokio::test]
async fn null_text_cell_is_a_phase_error() -> Result<()> {
    let mut broken = ResultSet::new(["Name", "Body"]);
    broken.push_row(vec![Value::from("P1"), Value::Null]);
    let executor = shop_executor("Shop").respond(build_query(Phase::StoredProcedures, "Shop"), broken);

    let (snapshot, consistent) = load_snapshot(executor, "Shop", conn()).await?;

    assert!(!consistent);
    assert_eq!(snapshot.errors.len(), 1);
    assert_eq!(snapshot.errors[0].phase, Phase::StoredProcedures);
    assert!(snapshot.errors[0].message.contains("Body"));
    Ok(())
}

#[tokio::test]
async fn serialized_snapshot_hides_password() -> Result<()> {
    let (snapshot, _) = load_snapshot(shop_executor("Shop"), "Shop", conn()).await?;

    let json = serde_json::to_string(&snapshot)?;
    assert!(!json.contains("secret"));
    assert!(json.contains("Password=***"));
    Ok(())
}

#[tokio::test]
async fn whitespace_name_is_passed_through() -> Result<()> {
    let mut loader = SnapshotLoader::new(StaticExecutor::new());

    let consistent = loader.load_snapshot(" ", conn()).await?;

    assert!(!consistent);
    assert_eq!(loader.snapshot().name, " ");
    let calls = loader.executor().calls();
    assert_eq!(calls.len(), 5);
    assert!(calls[0].starts_with(" USE [ ]"));
    Ok(())
}

#[tokio::test]
async fn null_numeric_cells_fail_the_columns_phase() -> Result<()> {
    let mut row = column_row("Customers", "Id", "int", 1, true);
    for cell in &mut row[4..] {
        *cell = Value::Null;
    }
    let executor = shop_executor("Shop").respond(build_query(Phase::Columns, "Shop"), columns(vec![row]));

    let (snapshot, consistent) = load_snapshot(executor, "Shop", conn()).await?;

    assert!(!consistent);
    assert_eq!(snapshot.errors.len(), 1);
    assert_eq!(snapshot.errors[0].phase, Phase::Columns);
    assert!(snapshot.errors[0].message.contains("Length"));
    assert!(snapshot.tables.is_empty());
    Ok(())
}
