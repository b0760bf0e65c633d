use amqp_codec::macros::{DeserializeComposite, SerializeComposite};

use super::{ErrorCondition, Fields};

#[derive(Debug, Clone, PartialEq, SerializeComposite, DeserializeComposite)]
#[amqp_contract(
    name = "amqp:error:list",
    code = 0x0000_0000_0000_001d,
    encoding = "list",
    rename_all = "kebab-case"
)]
pub struct Error {
    condition: ErrorCondition,
    description: Option<String>,
    info: Option<Fields>,
}

impl Error {
    pub fn new(
        condition: impl Into<ErrorCondition>,
        description: Option<String>,
        info: Option<Fields>,
    ) -> Self {
        Self {
            condition: condition.into(),
            description: description.map(Into::into),
            info: info.map(Into::into),
        }
    }

    /// The error condition carried by this error.
    pub fn condition(&self) -> &ErrorCondition {
        &self.condition
    }

    /// The optional human-readable description carried by this error.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Additional information carried by this error.
    pub fn info(&self) -> Option<&Fields> {
        self.info.as_ref()
    }
}

impl<T> From<T> for Error
where
    T: Into<ErrorCondition>,
{
    fn from(condition: T) -> Self {
        Self {
            condition: condition.into(),
            description: None,
            info: None,
        }
    }
}

#[cfg(test)]
mod tests {

    use amqp_codec::{from_slice, to_vec};

    use crate::definitions::AmqpError;

    use super::Error;

    #[test]
    fn test_serde_error() {
        let expected = Error::new(AmqpError::DecodeError, None, None);
        let serialized = to_vec(&expected).unwrap();
        let deserialized: Error = from_slice(&serialized).unwrap();
        assert_eq!(expected, deserialized)
    }
}
