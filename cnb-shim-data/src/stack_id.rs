use crate::newtypes::shim_newtype;

/// Prefix that turns a platform stack name (`CF_STACK`) into a CNB stack ID.
pub const CLOUDFOUNDRY_STACK_PREFIX: &str = "org.cloudfoundry.stacks.";

shim_newtype!(
    /// The ID of a stack.
    ///
    /// It MUST only contain numbers, letters, and the characters `.`, `/`, and `-`.
    StackId,
    StackIdError,
    r"^[[:alnum:]./-]+$"
);

impl StackId {
    /// Derives the CNB stack ID from the name of the platform stack.
    ///
    /// # Examples
    /// ```
    /// use cnb_shim_data::stack_id::StackId;
    ///
    /// let stack_id = StackId::from_platform_stack("cflinuxfs3").unwrap();
    /// assert_eq!(stack_id.as_str(), "org.cloudfoundry.stacks.cflinuxfs3");
    /// ```
    pub fn from_platform_stack(stack_name: &str) -> Result<Self, StackIdError> {
        if stack_name.is_empty() {
            return Err(StackIdError::InvalidValue(String::new()));
        }

        format!("{CLOUDFOUNDRY_STACK_PREFIX}{stack_name}").parse()
    }
}
