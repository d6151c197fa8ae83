use cnb_shim_data::stack_id::{StackId, StackIdError};
use std::env;

/// Name of the environment variable the platform sets to the current stack.
pub const STACK_ENV_VAR: &str = "CF_STACK";

/// Name of the environment variable the lifecycle binaries read the CNB stack ID from.
pub const STACK_ID_ENV_VAR: &str = "CNB_STACK_ID";

/// The stack the app is staged on, both as the platform names it and as a CNB stack ID.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Stack {
    name: String,
    id: StackId,
}

#[derive(thiserror::Error, Debug)]
pub enum StackError {
    #[error("Could not determine stack, {var} is not set: {0}", var = STACK_ENV_VAR)]
    NotSet(#[source] env::VarError),

    #[error("Invalid stack {0:?}: {1}")]
    Invalid(String, #[source] StackIdError),
}

impl Stack {
    /// ```
    /// use cnb_shim::Stack;
    ///
    /// let stack = Stack::new("cflinuxfs3").unwrap();
    /// assert_eq!(stack.name(), "cflinuxfs3");
    /// assert_eq!(stack.id().as_str(), "org.cloudfoundry.stacks.cflinuxfs3");
    /// ```
    pub fn new(name: impl Into<String>) -> Result<Self, StackError> {
        let name = name.into();
        let id = StackId::from_platform_stack(&name)
            .map_err(|error| StackError::Invalid(name.clone(), error))?;

        Ok(Self { name, id })
    }

    /// Reads the stack from the `CF_STACK` environment variable.
    pub fn from_env() -> Result<Self, StackError> {
        env::var(STACK_ENV_VAR)
            .map_err(StackError::NotSet)
            .and_then(Self::new)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn id(&self) -> &StackId {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_malformed_stacks() {
        assert!(matches!(Stack::new(""), Err(StackError::Invalid(_, _))));
        assert!(matches!(
            Stack::new("cflinuxfs 3"),
            Err(StackError::Invalid(_, _))
        ));
    }
}
