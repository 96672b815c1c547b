//! Hostname assembly.
//!
//! The [`Assembler`] turns a template and a parameter set into a [`Candidate`] hostname. All
//! user supplied values are validated first, in group order, and the first failure aborts the
//! assembly. Only then is a sequence number taken from the [`SequenceAllocator`], so a rejected
//! request never consumes one.
//!
//! [`Assembler::render`] is the allocator-free variant used to preview hostnames for arbitrary
//! sequence values, e.g. by the [DNS scanner][crate::dns::scanner].
//!
//! [`SequenceAllocator`]: crate::sequence::SequenceAllocator

use crate::error::Error;
use crate::sequence::SharedAllocator;
use crate::template::{GroupValidator, SharedTemplateStore, Template};
use serde::Serialize;
use std::collections::HashMap;

/// Parameter values keyed by group name.
pub type Params = HashMap<String, String>;

/// An assembled hostname that hasn't been reserved.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub template_id: u64,
    /// The rendered value of each group, in template order.
    pub values: Vec<String>,
    /// The sequence number rendered into the hostname, if the template has a sequence group.
    pub sequence_num: Option<u64>,
    pub hostname: String,
}

/// The validated, rendered groups of a template with the sequence slot left open.
#[derive(Debug, Clone)]
pub struct Validated {
    template_id: u64,
    segments: Vec<Option<String>>,
}

pub struct Assembler {
    templates: SharedTemplateStore,
    allocator: SharedAllocator,
    validator: GroupValidator,
}

impl Assembler {
    #[must_use]
    pub fn new(
        templates: SharedTemplateStore,
        allocator: SharedAllocator,
        validator: GroupValidator,
    ) -> Self {
        Self {
            templates,
            allocator,
            validator,
        }
    }

    #[must_use]
    pub fn templates(&self) -> &SharedTemplateStore {
        &self.templates
    }

    /// Assemble a hostname for `template_id`, allocating the next sequence number.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for unknown templates, the first parameter error found in
    /// group order, and [`Error::SequenceOverflow`] when the allocated value doesn't fit the
    /// sequence group.
    pub fn assemble(&self, template_id: u64, params: &Params) -> Result<Candidate, Error> {
        let template = self.templates.get(template_id)?;
        let validated = self.validate_params(&template, params)?;
        let sequence_num = template
            .sequence_group()
            .map(|_| self.allocator.next(template.id));
        let candidate = self.finish(&template, &validated, sequence_num);
        match &candidate {
            Err(err @ Error::SequenceOverflow { .. }) => {
                tracing::error!("template {} can't allocate hostnames: {err}", template.id);
            }
            Ok(c) => tracing::debug!("assembled \"{}\" from template {}", c.hostname, c.template_id),
            Err(_) => {}
        }
        candidate
    }

    /// Render the hostname `template` would produce for `params` and a given sequence value,
    /// without touching the allocator.
    ///
    /// # Errors
    ///
    /// As [`Assembler::assemble`].
    pub fn render(
        &self,
        template: &Template,
        params: &Params,
        sequence_num: Option<u64>,
    ) -> Result<Candidate, Error> {
        let validated = self.validate_params(template, params)?;
        self.finish(template, &validated, sequence_num)
    }

    /// Validate and render every non-sequence group of `template`.
    ///
    /// # Errors
    ///
    /// Returns the first group failure in template order, then
    /// [`Error::UnexpectedParameter`] for parameters that name no group, then
    /// [`Error::ValidationFailure`] when the hostname would exceed the template's `max_length`.
    pub fn validate_params(&self, template: &Template, params: &Params) -> Result<Validated, Error> {
        let mut segments = Vec::with_capacity(template.groups.len());
        for group in &template.groups {
            let value = params.get(&group.name).map(String::as_str);
            segments.push(self.validator.render(group, value)?);
        }

        if let Some(unknown) = params.keys().find(|name| template.group(name).is_none()) {
            return Err(Error::UnexpectedParameter(unknown.clone()));
        }

        // The sequence segment always renders at its group length unless it overflows, so the
        // final length is known before a value is allocated.
        if let Some(max_length) = template.max_length {
            let length: usize = template
                .groups
                .iter()
                .zip(&segments)
                .map(|(group, segment)| segment.as_ref().map_or(group.length, String::len))
                .sum();
            if length > max_length {
                return Err(Error::validation(
                    "hostname",
                    format!("hostname would be {length} bytes, longer than {max_length}"),
                ));
            }
        }

        Ok(Validated {
            template_id: template.id,
            segments,
        })
    }

    /// Fill the sequence slot of a validated parameter set and concatenate the segments.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SequenceOverflow`] when `sequence_num` has more digits than the sequence
    /// group.
    pub fn finish(
        &self,
        template: &Template,
        validated: &Validated,
        sequence_num: Option<u64>,
    ) -> Result<Candidate, Error> {
        debug_assert_eq!(template.id, validated.template_id);

        let mut values = Vec::with_capacity(template.groups.len());
        for (group, segment) in template.groups.iter().zip(&validated.segments) {
            let value = match (segment, sequence_num) {
                (Some(value), _) => value.clone(),
                (None, Some(seq)) => pad_sequence(template.id, seq, group.length)?,
                (None, None) => {
                    return Err(Error::InvalidRange(format!(
                        "template {} needs a sequence value for group \"{}\"",
                        template.id, group.name
                    )))
                }
            };
            values.push(value);
        }

        Ok(Candidate {
            template_id: template.id,
            hostname: values.concat(),
            values,
            sequence_num: template.sequence_group().and(sequence_num),
        })
    }
}

fn pad_sequence(template_id: u64, value: u64, length: usize) -> Result<String, Error> {
    let rendered = format!("{value:0length$}");
    if rendered.len() > length {
        return Err(Error::SequenceOverflow {
            template_id,
            value,
            length,
        });
    }
    Ok(rendered)
}
