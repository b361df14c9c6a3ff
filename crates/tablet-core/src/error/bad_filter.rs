use super::Error;

/// Error when a filter that must identify a single row does not cover the
/// model's primary key or any of its unique constraints.
///
/// This is raised before any statement is sent to the database.
#[derive(Debug)]
pub(super) struct BadFilterError {
    model: Box<str>,
    fields: Box<[String]>,
}

impl std::error::Error for BadFilterError {}

impl core::fmt::Display for BadFilterError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "bad filter for `{}`: [{}] does not cover a unique key",
            self.model,
            self.fields.join(", ")
        )
    }
}

impl Error {
    /// Creates a bad filter error for `model`, listing the fields the filter
    /// constrained.
    pub fn bad_filter<I>(model: impl Into<String>, fields: I) -> Error
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Error::from(super::ErrorKind::BadFilter(BadFilterError {
            model: model.into().into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }))
    }

    /// Returns `true` if this error is a bad filter error.
    pub fn is_bad_filter(&self) -> bool {
        self.any(|kind| matches!(kind, super::ErrorKind::BadFilter(_)))
    }
}
