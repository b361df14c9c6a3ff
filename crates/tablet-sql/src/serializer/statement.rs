use super::{Comma, Flavor, Formatter, Ident, Params, ToSql};

use tablet_core::stmt::{
    Delete, Direction, Expr, Insert, OrderBy, Projection, Select, Statement, Update,
};

impl ToSql for &Statement {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        match self {
            Statement::Select(stmt) => stmt.to_sql(f),
            Statement::Insert(stmt) => stmt.to_sql(f),
            Statement::Update(stmt) => stmt.to_sql(f),
            Statement::Delete(stmt) => stmt.to_sql(f),
        }
    }
}

impl ToSql for &Select {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let projection = &self.projection;

        fmt!(f, "SELECT " projection " FROM " Ident(&self.table) Filter(&self.filter));

        if !self.order_by.is_empty() {
            fmt!(f, " ORDER BY " Comma(&self.order_by));
        }

        match (self.limit, self.offset) {
            (Some(limit), _) => fmt!(f, " LIMIT " limit),
            (None, Some(_)) => match f.serializer.flavor {
                Flavor::Sqlite => fmt!(f, " LIMIT -1"),
                Flavor::Mysql => fmt!(f, " LIMIT " u64::MAX),
            },
            (None, None) => {}
        }

        if let Some(offset) = self.offset {
            fmt!(f, " OFFSET " offset);
        }

        if self.lock.is_some() && f.serializer.flavor.supports_skip_locked() {
            fmt!(f, " FOR UPDATE SKIP LOCKED");
        }
    }
}

impl ToSql for &Projection {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        match self {
            Projection::All => fmt!(f, "*"),
            Projection::Columns(columns) => fmt!(f, Comma(columns.iter().map(Ident))),
            Projection::Count => fmt!(f, "COUNT(*) AS " Ident("count")),
        }
    }
}

impl ToSql for &OrderBy {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let direction = match self.direction {
            Direction::Asc => "",
            Direction::Desc => " DESC",
        };
        fmt!(f, Ident(&self.column) direction);
    }
}

impl ToSql for &Insert {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        fmt!(f, "INSERT INTO " Ident(&self.table));

        if self.values.is_empty() {
            match f.serializer.flavor {
                Flavor::Mysql => fmt!(f, " () VALUES ()"),
                Flavor::Sqlite => fmt!(f, " DEFAULT VALUES"),
            }
            return;
        }

        let columns = self.values.iter().map(|(column, _)| Ident(column));
        let values = self.values.iter().map(|(_, expr)| expr);

        fmt!(f, " (" Comma(columns) ") VALUES (" Comma(values) ")");
    }
}

impl ToSql for &Update {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let assignments = self
            .assignments
            .iter()
            .map(|(column, expr)| Assignment(column, expr));

        fmt!(f, "UPDATE " Ident(&self.table) " SET " Comma(assignments) Filter(&self.filter));
    }
}

impl ToSql for &Delete {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        fmt!(f, "DELETE FROM " Ident(&self.table) Filter(&self.filter));
    }
}

/// ` WHERE <expr>`, omitted for a constant `true` filter
struct Filter<'a>(&'a Expr);

impl ToSql for Filter<'_> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        if !self.0.is_true() {
            fmt!(f, " WHERE " self.0);
        }
    }
}

struct Assignment<'a>(&'a String, &'a Expr);

impl ToSql for Assignment<'_> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        fmt!(f, Ident(self.0) " = " self.1);
    }
}
