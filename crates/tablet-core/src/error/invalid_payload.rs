use super::Error;

/// Error when a mutation payload, filter, or selection cannot be interpreted
/// against the schema.
///
/// This occurs when:
/// - A payload names a field the model does not have
/// - A relation operation (`connect`, `create`, ...) is used on the wrong kind of field
/// - A value has the wrong shape (a list where a record is expected, etc.)
/// - A table or model name is unknown
#[derive(Debug)]
pub(super) struct InvalidPayload {
    message: Box<str>,
}

impl std::error::Error for InvalidPayload {}

impl core::fmt::Display for InvalidPayload {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "invalid payload: {}", self.message)
    }
}

impl Error {
    /// Creates an invalid payload error.
    pub fn invalid_payload(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::InvalidPayload(InvalidPayload {
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error is an invalid payload error.
    pub fn is_invalid_payload(&self) -> bool {
        self.any(|kind| matches!(kind, super::ErrorKind::InvalidPayload(_)))
    }
}
