use rusqlite::Connection;
use tablet_core::{
    driver::{ColumnInfo, ForeignKeyInfo},
    stmt::Type,
    Error, Result,
};
use tablet_sql::Serializer;

struct TableColumn {
    name: String,
    ty: String,
    not_null: bool,
    /// 1-based position in the primary key, 0 if not part of it
    pk: i64,
}

struct ForeignKey {
    table: String,
    from: String,
    to: Option<String>,
}

/// Reads the catalog through the `pragma_*` functions, tables in creation
/// order.
pub(crate) fn columns(connection: &Connection, serializer: &Serializer) -> Result<Vec<ColumnInfo>> {
    let tables: Vec<String> = query(
        connection,
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY rowid",
        |row| row.get(0),
    )?;

    let mut ret = vec![];

    for table in &tables {
        let quoted = serializer.escape_id(table);

        let columns = query(
            connection,
            &format!("PRAGMA table_info({quoted})"),
            |row| {
                Ok(TableColumn {
                    name: row.get(1)?,
                    ty: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    not_null: row.get(3)?,
                    pk: row.get(5)?,
                })
            },
        )?;

        let foreign_keys = query(
            connection,
            &format!("PRAGMA foreign_key_list({quoted})"),
            |row| {
                Ok(ForeignKey {
                    table: row.get(2)?,
                    from: row.get(3)?,
                    to: row.get(4)?,
                })
            },
        )?;

        // (name, unique, origin)
        let indices: Vec<(String, bool, String)> = query(
            connection,
            &format!("PRAGMA index_list({quoted})"),
            |row| Ok((row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;

        let mut unique_columns = vec![];
        let mut unique_keys = vec![];

        for (name, unique, origin) in indices {
            if !unique || origin == "pk" {
                continue;
            }

            let index_columns: Vec<String> = query(
                connection,
                &format!("PRAGMA index_info({})", serializer.escape_id(&name)),
                |row| row.get(2),
            )?;

            match &index_columns[..] {
                [column] => unique_columns.push(column.clone()),
                _ => unique_keys.push((name, index_columns)),
            }
        }

        let pk_len = columns.iter().filter(|column| column.pk > 0).count();

        for column in &columns {
            let foreign_key = foreign_keys
                .iter()
                .find(|fk| fk.from == column.name)
                .map(|fk| -> Result<ForeignKeyInfo> {
                    let referenced_column = match &fk.to {
                        Some(to) => to.clone(),
                        None => primary_key_column(connection, serializer, &fk.table)?,
                    };

                    Ok(ForeignKeyInfo {
                        referenced_table: fk.table.clone(),
                        referenced_column,
                    })
                })
                .transpose()?;

            let is_primary_key = column.pk > 0;

            ret.push(ColumnInfo {
                table: table.clone(),
                column: column.name.clone(),
                ty: Type::from_sql_name(&column.ty),
                nullable: !column.not_null && !is_primary_key,
                is_primary_key,
                is_unique: unique_columns.contains(&column.name),
                unique_key: unique_keys
                    .iter()
                    .find(|(_, columns)| columns.contains(&column.name))
                    .map(|(name, _)| name.clone()),
                // `INTEGER PRIMARY KEY` aliases the rowid
                auto_increment: is_primary_key
                    && pk_len == 1
                    && column.ty.eq_ignore_ascii_case("integer"),
                foreign_key,
            });
        }
    }

    tracing::debug!(tables = tables.len(), columns = ret.len(), "introspected sqlite catalog");

    Ok(ret)
}

fn primary_key_column(connection: &Connection, serializer: &Serializer, table: &str) -> Result<String> {
    let columns: Vec<(String, i64)> = query(
        connection,
        &format!("PRAGMA table_info({})", serializer.escape_id(table)),
        |row| Ok((row.get(1)?, row.get(5)?)),
    )?;

    match &columns.iter().filter(|(_, pk)| *pk > 0).collect::<Vec<_>>()[..] {
        [(name, _)] => Ok(name.clone()),
        _ => Err(Error::invalid_schema(format!(
            "foreign key references table `{table}` without a single-column primary key"
        ))),
    }
}

fn query<T>(
    connection: &Connection,
    sql: &str,
    f: impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
) -> Result<Vec<T>> {
    tracing::trace!(sql = %sql, "sqlite catalog query");

    let mut stmt = connection
        .prepare(sql)
        .map_err(Error::driver_operation_failed)?;

    let rows = stmt
        .query_map([], f)
        .map_err(Error::driver_operation_failed)?;

    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Error::driver_operation_failed)
}
