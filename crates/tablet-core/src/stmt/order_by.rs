#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> OrderBy {
        OrderBy {
            column: column.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> OrderBy {
        OrderBy {
            column: column.into(),
            direction: Direction::Desc,
        }
    }
}
