use anyhow::Context;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};
use rowbind::{Connection, QueryOutput, Record, Registry, RegistryConfig, Row, Value};

use crate::cli::{ConnArgs, DescribeArgs, GetArgs, QueryArgs};

/// Open the connection named by `args`.
///
/// `--database` wins over the config file: a `postgres://` URL opens
/// PostgreSQL, anything else is a SQLite path.
pub(crate) fn connect(args: &ConnArgs) -> anyhow::Result<Connection> {
    let conn = match &args.database {
        Some(database) if is_postgres_url(database) => Connection::open_postgres(database)?,
        Some(database) => Connection::open_sqlite(database)?,
        None => {
            let config = RegistryConfig::load(&args.config)
                .with_context(|| format!("failed to load {}", args.config.display()))?;
            let Some(entry) = config.get(&args.connection) else {
                anyhow::bail!(
                    "connection `{}` is not defined in {}",
                    args.connection,
                    args.config.display()
                );
            };
            entry.open()?
        }
    };

    let mut registry = Registry::new();
    registry.add(&args.connection, conn);
    Ok(registry.get(&args.connection)?)
}

fn is_postgres_url(database: &str) -> bool {
    database.starts_with("postgres://") || database.starts_with("postgresql://")
}

/// Interpret a key argument: integers compare as numbers.
pub(crate) fn parse_key_value(raw: &str) -> Value {
    match raw.parse::<i64>() {
        Ok(i) => Value::Int(i),
        Err(_) => Value::from(raw),
    }
}

fn header_cell(name: &str) -> Cell {
    Cell::new(name).add_attribute(Attribute::Bold).fg(Color::Cyan)
}

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| header_cell(h)).collect::<Vec<_>>());
    table
}

fn value_cell(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::new("NULL").fg(Color::DarkGrey),
        other => Cell::new(other.to_string()),
    }
}

pub(crate) fn rows_table(fields: &[String], rows: &[Row]) -> Table {
    let headers: Vec<&str> = fields.iter().map(String::as_str).collect();
    let mut table = new_table(&headers);
    for row in rows {
        table.add_row(
            fields
                .iter()
                .map(|f| row.get(f).map(value_cell).unwrap_or_else(|| Cell::new("")))
                .collect::<Vec<_>>(),
        );
    }
    table
}

pub fn tables(args: ConnArgs) -> anyhow::Result<()> {
    let conn = connect(&args)?;
    for table in conn.tables(false)? {
        println!("{table}");
    }
    conn.close();
    Ok(())
}

pub fn describe(args: DescribeArgs) -> anyhow::Result<()> {
    let conn = connect(&args.conn)?;
    let fields = conn.fields(&args.table, true)?;
    if fields.is_empty() {
        anyhow::bail!("table `{}` not found", args.table);
    }
    let primary_key = conn.primary_key(&args.table, true)?;
    let autoincrement = conn.autoincrement_key(&args.table, true)?;

    let mut table = new_table(&["Column", "Primary key", "Autoincrement"]);
    for field in &fields {
        let pk = primary_key
            .iter()
            .position(|c| c == field)
            .map(|i| (i + 1).to_string())
            .unwrap_or_default();
        let auto = if autoincrement.as_deref() == Some(field.as_str()) {
            "yes"
        } else {
            ""
        };
        table.add_row(vec![Cell::new(field), Cell::new(pk), Cell::new(auto)]);
    }
    println!("{table}");
    conn.close();
    Ok(())
}

pub fn query(args: QueryArgs) -> anyhow::Result<()> {
    let conn = connect(&args.conn)?;
    match conn.query(&args.sql)? {
        QueryOutput::Rows(mut result) => {
            let fields = result.fields()?;
            let rows = result.all_rows()?;
            result.free();
            println!("{}", rows_table(&fields, &rows));
            println!("({} row{})", rows.len(), if rows.len() == 1 { "" } else { "s" });
        }
        QueryOutput::InsertId(id) => println!("inserted id {id}"),
        QueryOutput::Affected(n) => println!("{n} row(s) affected"),
    }
    conn.close();
    Ok(())
}

pub fn get(args: GetArgs) -> anyhow::Result<()> {
    let conn = connect(&args.conn)?;
    let key: Vec<Value> = args.key.iter().map(|k| parse_key_value(k)).collect();
    let mut record = Record::new(conn.clone(), args.table.as_str(), key, args.columns)?;

    let Some(row) = record.current_data()? else {
        anyhow::bail!(
            "no row in `{}` matches {}",
            args.table,
            record.key_predicate_sql()?
        );
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&row.to_json())?);
    } else {
        let mut table = new_table(&["Field", "Value"]);
        for (field, value) in row.iter() {
            table.add_row(vec![Cell::new(field), value_cell(value)]);
        }
        println!("{table}");
    }
    conn.close();
    Ok(())
}
