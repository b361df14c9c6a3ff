use serde::{Deserialize, Serialize};

/// Logical type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Type {
    #[default]
    String,
    Number,
    Boolean,
    Date,
}

impl Type {
    /// Maps a catalog type name (`varchar(255)`, `INTEGER`, `tinyint(1)`,
    /// `datetime`, ...) to a logical type.
    pub fn from_sql_name(name: &str) -> Type {
        let name = name.trim().to_ascii_lowercase();

        if name.starts_with("bool") || name == "tinyint(1)" || name == "bit(1)" {
            Type::Boolean
        } else if name.contains("date") || name.contains("time") {
            Type::Date
        } else if name.contains("int")
            || name.contains("dec")
            || name.contains("num")
            || name.contains("real")
            || name.contains("float")
            || name.contains("double")
            || name.contains("serial")
        {
            Type::Number
        } else {
            Type::String
        }
    }
}
