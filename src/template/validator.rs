use crate::error::Error;
use crate::template::{Group, Rule};

/// Checks candidate values against the [`Rule`] of a [`Group`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupValidator {
    /// Compare `list` values without regard to ASCII case.
    pub case_insensitive_lists: bool,
}

impl GroupValidator {
    #[must_use]
    pub fn new(case_insensitive_lists: bool) -> Self {
        Self {
            case_insensitive_lists,
        }
    }

    /// Validate a user supplied value for `group`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedParameter`] for `sequence` groups, which are never
    /// user-supplied, and [`Error::ValidationFailure`] when the value breaks the group's rule or
    /// length.
    pub fn validate(&self, group: &Group, value: &str) -> Result<(), Error> {
        self.canonical(group, value).map(|_| ())
    }

    /// Render the segment for `group` from an optional user supplied value.
    ///
    /// Optional groups without a value render as the empty string. `fixed` groups without a
    /// value render their literal. The sequence group renders as `None`; its value is filled in
    /// by the [`Assembler`][crate::assembler::Assembler].
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingParameter`] when a required group has no value, otherwise the
    /// errors of [`GroupValidator::validate`].
    pub fn render(&self, group: &Group, value: Option<&str>) -> Result<Option<String>, Error> {
        match (&group.rule, value) {
            (Rule::Sequence, None) => Ok(None),
            (Rule::Fixed(literal), None) => Ok(Some(literal.clone())),
            (_, None) if group.is_required => Err(Error::MissingParameter(group.name.clone())),
            (_, None) => Ok(Some(String::new())),
            (_, Some(value)) => self.canonical(group, value).map(Some),
        }
    }

    fn canonical(&self, group: &Group, value: &str) -> Result<String, Error> {
        let rendered = match &group.rule {
            Rule::Sequence => return Err(Error::UnexpectedParameter(group.name.clone())),
            Rule::Fixed(literal) => {
                if value != literal {
                    return Err(Error::validation(
                        &group.name,
                        format!("\"{value}\" isn't the fixed value \"{literal}\""),
                    ));
                }
                value.to_string()
            }
            Rule::List(allowed) => {
                let trimmed = value.trim();
                let found = allowed.iter().find(|candidate| {
                    if self.case_insensitive_lists {
                        candidate.eq_ignore_ascii_case(trimmed)
                    } else {
                        *candidate == trimmed
                    }
                });
                match found {
                    // List values may be narrower than the group; they are range checked on
                    // template load.
                    Some(candidate) => return Ok(candidate.clone()),
                    None => {
                        return Err(Error::validation(
                            &group.name,
                            format!("\"{trimmed}\" isn't one of {}", allowed.join(",")),
                        ))
                    }
                }
            }
            Rule::Regex { pattern, compiled } => {
                if !compiled.is_match(value) {
                    return Err(Error::validation(
                        &group.name,
                        format!("\"{value}\" doesn't match /{pattern}/"),
                    ));
                }
                value.to_string()
            }
        };

        // Lengths are in bytes, as on template load and in `max_length`.
        let length = rendered.len();
        if length != group.length {
            return Err(Error::validation(
                &group.name,
                format!("\"{rendered}\" is {length} bytes, expected {}", group.length),
            ));
        }
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    fn group(rule: Rule, length: usize, is_required: bool) -> Group {
        Group {
            name: "g".into(),
            length,
            is_required,
            rule,
        }
    }

    fn list(values: &[&str]) -> Rule {
        Rule::List(values.iter().map(ToString::to_string).collect())
    }

    fn regex(pattern: &str) -> Rule {
        Rule::Regex {
            pattern: pattern.into(),
            compiled: Regex::new(&format!("^(?:{pattern})$")).unwrap(),
        }
    }

    #[test]
    fn test_list_accepts_member_and_rejects_other() {
        let g = group(list(&["US", "EU", "AP"]), 2, true);
        let v = GroupValidator::default();
        assert!(v.validate(&g, "US").is_ok());
        assert!(matches!(
            v.validate(&g, "FR"),
            Err(Error::ValidationFailure { group, .. }) if group == "g"
        ));
    }

    #[test]
    fn test_list_trims_and_is_case_sensitive_by_default() {
        let g = group(list(&["US", "EU"]), 2, true);
        assert!(GroupValidator::default().validate(&g, " EU ").is_ok());
        assert!(GroupValidator::default().validate(&g, "eu").is_err());
        assert_eq!(
            GroupValidator::new(true).render(&g, Some("eu")).unwrap(),
            Some("EU".to_string())
        );
    }

    #[test]
    fn test_fixed_requires_exact_value() {
        let g = group(Rule::Fixed("srv".into()), 3, true);
        let v = GroupValidator::default();
        assert!(v.validate(&g, "srv").is_ok());
        assert!(v.validate(&g, "SRV").is_err());
        assert_eq!(v.render(&g, None).unwrap(), Some("srv".to_string()));
    }

    #[test]
    fn test_regex_is_a_full_match() {
        let g = group(regex("[a-z]{2}"), 2, true);
        let v = GroupValidator::default();
        assert!(v.validate(&g, "ab").is_ok());
        assert!(v.validate(&g, "abc").is_err());
        assert!(v.validate(&g, "1ab").is_err());
    }

    #[test]
    fn test_length_must_match_group() {
        let g = group(regex("[a-z]+"), 3, true);
        let err = GroupValidator::default().validate(&g, "ab").unwrap_err();
        assert!(err.to_string().contains("expected 3"), "{err}");
    }

    #[test]
    fn test_sequence_values_are_unexpected() {
        let g = group(Rule::Sequence, 3, true);
        let v = GroupValidator::default();
        assert!(matches!(
            v.validate(&g, "001"),
            Err(Error::UnexpectedParameter(_))
        ));
        assert_eq!(v.render(&g, None).unwrap(), None);
    }

    #[test]
    fn test_missing_values() {
        let v = GroupValidator::default();
        let required = group(regex("[a-z]"), 1, true);
        let optional = group(regex("[a-z]"), 1, false);
        assert!(matches!(
            v.render(&required, None),
            Err(Error::MissingParameter(_))
        ));
        assert_eq!(v.render(&optional, None).unwrap(), Some(String::new()));
    }
}
