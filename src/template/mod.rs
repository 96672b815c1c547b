//! Hostname templates.
//!
//! A [`Template`] is an ordered list of [`Group`]s. Each group renders one fixed-width segment of
//! a hostname, and the segments are concatenated in template order without separators.
//!
//! Templates are configuration data: they are loaded once from a JSON file at start-up into a
//! [`TemplateStore`] and only read afterwards. A definition file looks like:
//!
//! ```json
//! [
//!   {
//!     "id": 1,
//!     "name": "datacenter servers",
//!     "max_length": 15,
//!     "groups": [
//!       { "name": "region", "length": 2, "is_required": true,
//!         "validation_type": "list", "validation_value": "US,EU,AP" },
//!       { "name": "role", "length": 3, "is_required": true,
//!         "validation_type": "regex", "validation_value": "[a-z]{3}" },
//!       { "name": "seq", "length": 4, "is_required": true,
//!         "validation_type": "sequence" }
//!     ]
//!   }
//! ]
//! ```
//!
//! The `validation_type`/`validation_value` pair is only the wire form. On load it is turned into
//! a [`Rule`], compiling regular expressions once, and every template invariant is checked. A
//! malformed definition fails the load rather than individual requests.

use crate::error::Error;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

pub mod validator;

pub use validator::GroupValidator;

/// `SharedTemplateStore` is a read-only [`TemplateStore`] shared between request handlers.
#[allow(clippy::module_name_repetitions)]
pub type SharedTemplateStore = Arc<TemplateStore>;

/// The validation rule of a [`Group`]. Each case carries only the data it needs.
#[derive(Debug, Clone)]
pub enum Rule {
    /// The segment is always this literal.
    Fixed(String),
    /// The segment is one of these values.
    List(Vec<String>),
    /// The segment must fully match the pattern.
    Regex {
        pattern: String,
        compiled: Regex,
    },
    /// The segment is the allocator-issued sequence number, zero-padded to the group length.
    Sequence,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ValidationType {
    Fixed,
    List,
    Regex,
    Sequence,
}

impl Rule {
    #[must_use]
    pub fn validation_type(&self) -> ValidationType {
        match self {
            Rule::Fixed(_) => ValidationType::Fixed,
            Rule::List(_) => ValidationType::List,
            Rule::Regex { .. } => ValidationType::Regex,
            Rule::Sequence => ValidationType::Sequence,
        }
    }

    fn validation_value(&self) -> Option<String> {
        match self {
            Rule::Fixed(literal) => Some(literal.clone()),
            Rule::List(allowed) => Some(allowed.join(",")),
            Rule::Regex { pattern, .. } => Some(pattern.clone()),
            Rule::Sequence => None,
        }
    }
}

/// One fixed-width segment of a hostname.
#[derive(Serialize, Debug, Clone)]
#[serde(into = "GroupDef")]
pub struct Group {
    pub name: String,
    pub length: usize,
    pub is_required: bool,
    pub rule: Rule,
}

impl Group {
    #[must_use]
    pub fn is_sequence(&self) -> bool {
        matches!(self.rule, Rule::Sequence)
    }
}

/// A named, ordered set of groups defining the shape of a hostname.
#[derive(Serialize, Debug, Clone)]
#[serde(into = "TemplateDef")]
pub struct Template {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub max_length: Option<usize>,
    pub groups: Vec<Group>,
}

impl Template {
    /// The template's sequence group, if it has one.
    #[must_use]
    pub fn sequence_group(&self) -> Option<&Group> {
        self.groups.iter().find(|g| g.is_sequence())
    }

    #[must_use]
    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }
}

/// The wire form of a [`Group`], matching the JSON contract of the template API.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GroupDef {
    pub name: String,
    pub length: usize,
    #[serde(default)]
    pub is_required: bool,
    pub validation_type: ValidationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_value: Option<String>,
}

/// The wire form of a [`Template`].
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TemplateDef {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    pub groups: Vec<GroupDef>,
}

impl From<Group> for GroupDef {
    fn from(group: Group) -> Self {
        GroupDef {
            validation_type: group.rule.validation_type(),
            validation_value: group.rule.validation_value(),
            name: group.name,
            length: group.length,
            is_required: group.is_required,
        }
    }
}

impl From<Template> for TemplateDef {
    fn from(template: Template) -> Self {
        TemplateDef {
            id: template.id,
            name: template.name,
            description: template.description,
            max_length: template.max_length,
            groups: template.groups.into_iter().map(GroupDef::from).collect(),
        }
    }
}

impl TryFrom<TemplateDef> for Template {
    type Error = Error;

    fn try_from(def: TemplateDef) -> Result<Self, Error> {
        let invalid = |reason: String| Error::InvalidTemplate {
            template: def.name.clone(),
            reason,
        };

        if def.groups.is_empty() {
            return Err(invalid("a template needs at least one group".into()));
        }

        let mut names = HashSet::new();
        let mut groups = Vec::with_capacity(def.groups.len());
        for group_def in &def.groups {
            if !names.insert(group_def.name.as_str()) {
                return Err(invalid(format!("duplicate group \"{}\"", group_def.name)));
            }
            groups.push(group_from_def(group_def).map_err(invalid)?);
        }

        if groups.iter().filter(|g| g.is_sequence()).count() > 1 {
            return Err(invalid("more than one sequence group".into()));
        }

        if let Some(max_length) = def.max_length {
            let min_length: usize = groups
                .iter()
                .filter(|g| g.is_required || matches!(g.rule, Rule::Fixed(_)))
                .map(|g| g.length)
                .sum();
            if min_length > max_length {
                return Err(invalid(format!(
                    "required groups need {min_length} bytes, max_length is {max_length}"
                )));
            }
        }

        Ok(Template {
            id: def.id,
            name: def.name,
            description: def.description,
            max_length: def.max_length,
            groups,
        })
    }
}

fn group_from_def(def: &GroupDef) -> Result<Group, String> {
    let name = &def.name;
    if name.is_empty() {
        return Err("group names can't be empty".into());
    }
    if def.length == 0 {
        return Err(format!("group \"{name}\" has zero length"));
    }

    let value = def.validation_value.as_deref();
    let rule = match (def.validation_type, value) {
        (ValidationType::Sequence, None | Some("")) => Rule::Sequence,
        (ValidationType::Sequence, Some(_)) => {
            return Err(format!(
                "sequence group \"{name}\" can't have a validation value"
            ))
        }
        (_, None) => return Err(format!("group \"{name}\" needs a validation value")),
        (ValidationType::Fixed, Some(literal)) => {
            if literal.len() != def.length {
                return Err(format!(
                    "fixed value \"{literal}\" of group \"{name}\" isn't {} bytes",
                    def.length
                ));
            }
            Rule::Fixed(literal.to_string())
        }
        (ValidationType::List, Some(list)) => {
            let allowed: Vec<String> = list
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
                .collect();
            if allowed.is_empty() {
                return Err(format!("list group \"{name}\" allows no values"));
            }
            if let Some(too_long) = allowed.iter().find(|v| v.len() > def.length) {
                return Err(format!(
                    "list value \"{too_long}\" of group \"{name}\" is longer than {}",
                    def.length
                ));
            }
            Rule::List(allowed)
        }
        (ValidationType::Regex, Some(pattern)) => {
            // Anchor the pattern so that validation is a full match.
            let compiled = Regex::new(&format!("^(?:{pattern})$"))
                .map_err(|err| format!("pattern of group \"{name}\" doesn't compile: {err}"))?;
            Rule::Regex {
                pattern: pattern.to_string(),
                compiled,
            }
        }
    };

    Ok(Group {
        name: name.clone(),
        length: def.length,
        is_required: def.is_required,
        rule,
    })
}

/// Holds the loaded templates, keyed by ID.
#[derive(Debug, Default)]
#[allow(clippy::module_name_repetitions)]
pub struct TemplateStore {
    templates: BTreeMap<u64, Arc<Template>>,
}

impl TemplateStore {
    /// Build a store from template definitions, checking every template.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTemplate`] for the first definition that breaks an invariant, or
    /// that reuses another definition's ID.
    pub fn from_defs(defs: Vec<TemplateDef>) -> Result<Self, Error> {
        let mut templates = BTreeMap::new();
        for def in defs {
            let template = Template::try_from(def)?;
            if templates.contains_key(&template.id) {
                return Err(Error::InvalidTemplate {
                    template: template.name,
                    reason: format!("duplicate template ID {}", template.id),
                });
            }
            tracing::debug!(
                "loaded template {} \"{}\" with {} groups",
                template.id,
                template.name,
                template.groups.len()
            );
            templates.insert(template.id, Arc::new(template));
        }
        Ok(Self { templates })
    }

    /// Load a [`TemplateStore`] from a JSON file holding an array of template definitions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IO`] if the file can't be read, [`Error::InvalidJSON`] if it isn't a
    /// JSON array of definitions, and [`Error::InvalidTemplate`] if a definition is invalid.
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let f = File::open(p)?;
        let defs: Vec<TemplateDef> = serde_json::from_reader(BufReader::new(f))?;
        Self::from_defs(defs)
    }

    /// Get a template by ID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no template has the ID.
    pub fn get(&self, template_id: u64) -> Result<Arc<Template>, Error> {
        self.templates
            .get(&template_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("template {template_id}")))
    }

    /// All templates, ordered by ID.
    #[must_use]
    pub fn list(&self) -> Vec<Arc<Template>> {
        self.templates.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(name: &str, length: usize, kind: ValidationType, value: Option<&str>) -> GroupDef {
        GroupDef {
            name: name.into(),
            length,
            is_required: true,
            validation_type: kind,
            validation_value: value.map(String::from),
        }
    }

    fn template(groups: Vec<GroupDef>) -> TemplateDef {
        TemplateDef {
            id: 1,
            name: "test".into(),
            description: None,
            max_length: None,
            groups,
        }
    }

    fn reason(result: Result<Template, Error>) -> String {
        match result {
            Err(Error::InvalidTemplate { reason, .. }) => reason,
            other => panic!("expected InvalidTemplate, got {other:?}"),
        }
    }

    #[test]
    fn test_load_valid_template() {
        let t = Template::try_from(template(vec![
            group("region", 2, ValidationType::List, Some("US, EU,AP")),
            group("role", 3, ValidationType::Regex, Some("[a-z]+")),
            group("seq", 4, ValidationType::Sequence, None),
        ]))
        .unwrap();
        assert_eq!(t.groups.len(), 3);
        assert_eq!(t.sequence_group().unwrap().name, "seq");
        match &t.group("region").unwrap().rule {
            Rule::List(allowed) => assert_eq!(allowed, &["US", "EU", "AP"]),
            other => panic!("unexpected rule {other:?}"),
        }
    }

    #[test]
    fn test_rejects_two_sequence_groups() {
        let r = reason(Template::try_from(template(vec![
            group("a", 2, ValidationType::Sequence, None),
            group("b", 2, ValidationType::Sequence, None),
        ])));
        assert!(r.contains("more than one sequence"), "{r}");
    }

    #[test]
    fn test_rejects_duplicate_group_names() {
        let r = reason(Template::try_from(template(vec![
            group("a", 2, ValidationType::Fixed, Some("ab")),
            group("a", 2, ValidationType::Fixed, Some("cd")),
        ])));
        assert!(r.contains("duplicate group"), "{r}");
    }

    #[test]
    fn test_rejects_zero_length() {
        let r = reason(Template::try_from(template(vec![group(
            "a",
            0,
            ValidationType::Sequence,
            None,
        )])));
        assert!(r.contains("zero length"), "{r}");
    }

    #[test]
    fn test_rejects_malformed_regex_on_load() {
        let r = reason(Template::try_from(template(vec![group(
            "a",
            2,
            ValidationType::Regex,
            Some("[a-"),
        )])));
        assert!(r.contains("doesn't compile"), "{r}");
    }

    #[test]
    fn test_rejects_list_value_longer_than_group() {
        let r = reason(Template::try_from(template(vec![group(
            "a",
            2,
            ValidationType::List,
            Some("US,EUR"),
        )])));
        assert!(r.contains("\"EUR\""), "{r}");
    }

    #[test]
    fn test_non_ascii_fixed_literal_validates_its_own_value() {
        let t = Template::try_from(template(vec![group(
            "a",
            3,
            ValidationType::Fixed,
            Some("nœ"),
        )]))
        .unwrap();
        let validator = GroupValidator::default();
        assert!(validator.validate(&t.groups[0], "nœ").is_ok());
        assert_eq!(
            validator.render(&t.groups[0], None).unwrap(),
            Some("nœ".to_string())
        );

        let r = reason(Template::try_from(template(vec![group(
            "a",
            2,
            ValidationType::Fixed,
            Some("nœ"),
        )])));
        assert!(r.contains("isn't 2"), "{r}");
    }

    #[test]
    fn test_rejects_required_groups_over_max_length() {
        let mut def = template(vec![
            group("a", 4, ValidationType::Fixed, Some("abcd")),
            group("b", 4, ValidationType::Sequence, None),
        ]);
        def.max_length = Some(6);
        let r = reason(Template::try_from(def));
        assert!(r.contains("max_length"), "{r}");
    }

    #[test]
    fn test_wire_form_round_trips_through_json() {
        let json = r#"[{"id":7,"name":"web","groups":[
            {"name":"env","length":1,"is_required":true,"validation_type":"list","validation_value":"p,d"},
            {"name":"seq","length":3,"is_required":true,"validation_type":"sequence"}]}]"#;
        let defs: Vec<TemplateDef> = serde_json::from_str(json).unwrap();
        let store = TemplateStore::from_defs(defs).unwrap();
        let t = store.get(7).unwrap();
        let out = serde_json::to_value(&*t).unwrap();
        assert_eq!(out["groups"][0]["validation_value"], "p,d");
        assert_eq!(out["groups"][1]["validation_type"], "sequence");
        assert!(out["groups"][1].get("validation_value").is_none());
    }

    #[test]
    fn test_store_get_unknown_is_not_found() {
        let store = TemplateStore::default();
        assert!(matches!(store.get(3), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_store_rejects_duplicate_ids() {
        let defs = vec![
            template(vec![group("a", 1, ValidationType::Sequence, None)]),
            template(vec![group("a", 1, ValidationType::Sequence, None)]),
        ];
        assert!(matches!(
            TemplateStore::from_defs(defs),
            Err(Error::InvalidTemplate { .. })
        ));
    }
}
