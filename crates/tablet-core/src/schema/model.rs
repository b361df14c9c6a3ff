use super::{Field, FieldId, FieldTy};

use std::fmt;

#[derive(Debug, Clone)]
pub struct Model {
    /// Uniquely identifies the model within the schema
    pub id: ModelId,

    /// Name of the model, `PascalCase` by default
    pub name: String,

    /// Table the model maps to
    pub table: String,

    /// Column fields in table order, followed by related fields
    pub fields: Vec<Field>,

    /// Fields making up the primary key
    pub primary_key: Vec<FieldId>,

    /// Field combinations identifying at most one row. The primary key comes
    /// first, then single-column unique fields in column order, then composite
    /// constraints in declaration order.
    pub unique_keys: Vec<UniqueKey>,

    /// The table only links two other models
    pub junction: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueKey {
    pub fields: Vec<FieldId>,
    pub primary_key: bool,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ModelId(pub usize);

impl Model {
    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn field_by_column(&self, column: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|field| field.column() == Some(column))
    }

    /// Scalar and foreign key fields, in table order
    pub fn column_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|field| !field.is_related())
    }

    pub fn related_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|field| field.is_related())
    }

    pub fn primary_key_fields(&self) -> impl Iterator<Item = &Field> {
        self.primary_key.iter().map(|id| &self.fields[id.index])
    }

    /// The single primary key field, if the key is not composite
    pub fn key_field(&self) -> Option<&Field> {
        match &self.primary_key[..] {
            [id] => Some(&self.fields[id.index]),
            _ => None,
        }
    }

    /// Number of foreign keys on this model referencing `target`
    pub fn foreign_key_count(&self, target: ModelId) -> usize {
        self.fields
            .iter()
            .filter(|field| match &field.ty {
                FieldTy::ForeignKey(fk) => fk.target.model == target,
                _ => false,
            })
            .count()
    }

    /// Returns the first unique key (in tie-break order) whose fields are all
    /// accepted by `covered`.
    pub fn find_unique_key(&self, mut covered: impl FnMut(&Field) -> bool) -> Option<&UniqueKey> {
        self.unique_keys
            .iter()
            .find(|key| key.fields.iter().all(|id| covered(&self.fields[id.index])))
    }
}

impl fmt::Debug for ModelId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "ModelId({})", self.0)
    }
}
