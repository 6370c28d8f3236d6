// Post-extraction validation hook
use crate::error::Result;

/// Semantic checks run after a configuration has been extracted.
///
/// The default implementation accepts everything.
pub trait Validate {
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Fail with a validation error unless `condition` holds
pub fn ensure(condition: bool, message: impl Into<String>) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(crate::error::ConfigError::ValidationError(message.into()))
    }
}
