use super::ModelId;
use crate::stmt::Type;

use std::fmt;

#[derive(Debug, Clone)]
pub struct Field {
    /// Uniquely identifies the field within the schema.
    pub id: FieldId,

    /// The field name, as used in payloads, filters and returned rows
    pub name: String,

    /// Scalar, foreign key or related
    pub ty: FieldTy,

    /// True if the column accepts `NULL`. Always false for related fields.
    pub nullable: bool,

    /// True if the field is part of the primary key
    pub primary_key: bool,

    /// True if the database assigns the column value on insert
    pub auto_increment: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId {
    pub model: ModelId,
    pub index: usize,
}

#[derive(Debug, Clone)]
pub enum FieldTy {
    /// A plain column
    Primitive(Primitive),

    /// A column referencing the key of another model
    ForeignKey(ForeignKey),

    /// The reverse side of a foreign key, or a many-to-many accessor
    /// mediated by a junction model. Has no column.
    Related(Related),
}

#[derive(Debug, Clone)]
pub struct Primitive {
    pub column: String,
    pub ty: Type,
}

#[derive(Debug, Clone)]
pub struct ForeignKey {
    pub column: String,

    pub ty: Type,

    /// The referenced field on the target model
    pub target: FieldId,

    /// The related field on the target model pointing back at this foreign
    /// key. `None` for junction columns and suppressed relations.
    pub related: Option<FieldId>,
}

#[derive(Debug, Clone)]
pub struct Related {
    /// Model whose rows the field yields
    pub target: ModelId,

    /// Foreign key referencing the model that owns this field. For a
    /// one-to-many relation it lives on `target`; for a many-to-many
    /// relation it lives on the junction model.
    pub pair: FieldId,

    /// For many-to-many relations, the junction's other foreign key, the one
    /// referencing `target`.
    pub through: Option<FieldId>,

    /// The relation yields at most one row
    pub unique: bool,
}

impl Field {
    /// Gets the id.
    pub fn id(&self) -> FieldId {
        self.id
    }

    /// Storage column, for scalar and foreign key fields
    pub fn column(&self) -> Option<&str> {
        match &self.ty {
            FieldTy::Primitive(primitive) => Some(&primitive.column),
            FieldTy::ForeignKey(fk) => Some(&fk.column),
            FieldTy::Related(_) => None,
        }
    }

    #[track_caller]
    pub fn expect_column(&self) -> &str {
        match self.column() {
            Some(column) => column,
            None => panic!("field `{}` has no column", self.name),
        }
    }

    /// Logical type of the stored value
    pub fn value_ty(&self) -> Option<Type> {
        match &self.ty {
            FieldTy::Primitive(primitive) => Some(primitive.ty),
            FieldTy::ForeignKey(fk) => Some(fk.ty),
            FieldTy::Related(_) => None,
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self.ty, FieldTy::Primitive(_))
    }

    pub fn is_foreign_key(&self) -> bool {
        matches!(self.ty, FieldTy::ForeignKey(_))
    }

    pub fn is_related(&self) -> bool {
        matches!(self.ty, FieldTy::Related(_))
    }

    pub fn as_foreign_key(&self) -> Option<&ForeignKey> {
        match &self.ty {
            FieldTy::ForeignKey(fk) => Some(fk),
            _ => None,
        }
    }

    pub fn as_related(&self) -> Option<&Related> {
        match &self.ty {
            FieldTy::Related(related) => Some(related),
            _ => None,
        }
    }
}

impl Related {
    pub fn is_many_to_many(&self) -> bool {
        self.through.is_some()
    }

    /// The junction model of a many-to-many relation
    pub fn junction(&self) -> Option<ModelId> {
        self.through.map(|through| through.model)
    }
}

impl fmt::Debug for FieldId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "FieldId({}/{})", self.model.0, self.index)
    }
}
