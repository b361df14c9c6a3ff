use super::Serializer;

#[derive(Debug)]
pub(super) enum Flavor {
    Sqlite,
    Mysql,
}

impl Flavor {
    pub(super) fn ident_quote(&self) -> char {
        match self {
            Flavor::Mysql => '`',
            Flavor::Sqlite => '"',
        }
    }

    /// Row locking clauses are emitted only where the database supports them.
    pub(super) fn supports_skip_locked(&self) -> bool {
        !matches!(self, Flavor::Sqlite)
    }
}

impl Serializer {
    pub fn sqlite() -> Serializer {
        Serializer {
            flavor: Flavor::Sqlite,
        }
    }

    pub fn mysql() -> Serializer {
        Serializer {
            flavor: Flavor::Mysql,
        }
    }
}
