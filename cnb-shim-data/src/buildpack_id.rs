use crate::newtypes::shim_newtype;

shim_newtype!(
    /// The ID of a buildpack, as referenced from `order.toml` and `group.toml` and used as the
    /// dependency name in the buildpack manifest.
    ///
    /// It MUST only contain numbers, letters, and the characters `.`, `/`, and `-`.
    /// It also MUST NOT be `config` or `app`, since those names are reserved in the layers
    /// directory.
    ///
    /// # Examples
    /// ```
    /// use cnb_shim_data::buildpack_id::BuildpackId;
    ///
    /// let id: BuildpackId = "org.cloudfoundry.nodejs".parse().unwrap();
    /// assert_eq!(id.as_str(), "org.cloudfoundry.nodejs");
    ///
    /// let invalid: Result<BuildpackId, _> = "config".parse();
    /// assert!(invalid.is_err());
    /// ```
    BuildpackId,
    BuildpackIdError,
    r"^(?!app$|config$)[[:alnum:]./-]+$"
);

impl BuildpackId {
    /// The ID under which the legacy buildpack that ran at the given phase index is wrapped.
    ///
    /// ```
    /// use cnb_shim_data::buildpack_id::BuildpackId;
    ///
    /// assert_eq!(BuildpackId::legacy(2).as_str(), "buildpack.2");
    /// ```
    #[must_use]
    pub fn legacy(phase_index: usize) -> Self {
        Self(format!("buildpack.{phase_index}"))
    }
}
