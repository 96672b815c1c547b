//! Error types.

/// Error enumerates the possible hostsmith error states.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Returned when a template ID (or reservation ID) isn't known to the store it was looked
    /// up in.
    #[error("{0} not found")]
    NotFound(String),

    /// Returned when a supplied parameter breaks the rule of the
    /// [`Group`][crate::template::Group] it was supplied for.
    #[error("group \"{group}\": {reason}")]
    ValidationFailure { group: String, reason: String },

    /// Returned when a required group has no value in the request parameters.
    #[error("missing required parameter \"{0}\"")]
    MissingParameter(String),

    /// Returned when a parameter is supplied for a `sequence` group, or for a name that isn't a
    /// group of the template at all.
    #[error("unexpected parameter \"{0}\"")]
    UnexpectedParameter(String),

    /// Returned when the value for a template's sequence group no longer fits the group's
    /// declared length. No further hostnames can be allocated from the template until it is
    /// widened or rotated.
    #[error("sequence {value} overflows the {length} digit sequence group of template {template_id}")]
    SequenceOverflow {
        template_id: u64,
        value: u64,
        length: usize,
    },

    /// Returned when a (template, sequence number) pair has already been reserved.
    #[error("sequence {sequence_num} of template {template_id} is already reserved")]
    AlreadyReserved { template_id: u64, sequence_num: u64 },

    /// Returned when reserving from a template that has no sequence group to key the
    /// reservation on.
    #[error("template {0} has no sequence group and cannot be reserved from")]
    NotReservable(u64),

    /// Returned when scan bounds or the scan concurrency limit are unusable.
    #[error("invalid scan range: {0}")]
    InvalidRange(String),

    /// Returned when a DNS lookup fails for a reason other than the name not existing.
    #[error("resolver error for \"{hostname}\": {reason}")]
    ResolverError { hostname: String, reason: String },

    /// Returned when a template definition breaks an invariant while the store is loading.
    #[error("invalid template \"{template}\": {reason}")]
    InvalidTemplate { template: String, reason: String },

    /// Returned when the [`Config::api_bind_addr`][`crate::config::Config::api_bind_addr`] is
    /// not a loopback address, or an address within a private network space.
    #[error("API bind address ({0}) must be a loopback or private IP")]
    InsecureAPIBind(std::net::IpAddr),

    /// Returned when a configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Returned when a generic IO error occurs.
    #[error("an IO error occurred")]
    IO(#[from] std::io::Error),

    /// Returned when processing JSON from disk (the config, the template definitions or the
    /// reservation state file) fails due to invalid JSON content.
    #[error("invalid JSON")]
    InvalidJSON(#[from] serde_json::Error),
}

impl Error {
    /// A stable, machine-readable name for the error state, returned to API clients alongside
    /// the human-readable message.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "not_found",
            Error::ValidationFailure { .. } => "validation_failure",
            Error::MissingParameter(_) => "missing_parameter",
            Error::UnexpectedParameter(_) => "unexpected_parameter",
            Error::SequenceOverflow { .. } => "sequence_overflow",
            Error::AlreadyReserved { .. } => "already_reserved",
            Error::NotReservable(_) => "not_reservable",
            Error::InvalidRange(_) => "invalid_range",
            Error::ResolverError { .. } => "resolver_error",
            Error::InvalidTemplate { .. } => "invalid_template",
            Error::InsecureAPIBind(_) | Error::InvalidConfig(_) => "invalid_config",
            Error::IO(_) | Error::InvalidJSON(_) => "internal",
        }
    }

    pub(crate) fn validation(group: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::ValidationFailure {
            group: group.into(),
            reason: reason.into(),
        }
    }
}
