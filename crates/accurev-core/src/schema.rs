//! AccuWork schema resolution.
//!
//! Issue queries address fields by numeric id (`fid`), while operators
//! configure them by name. [`SchemaInfo::resolve`] maps each configured name
//! to its id once; query results are then read by id only.

use std::fmt;

use serde::Serialize;

use crate::config::FieldNames;
use crate::error::{AccuRevError, Result};
use crate::xml::{Document, Element};

/// Domain kind a category field must have.
pub const CHOOSE_FIELD_TYPE: &str = "Choose";

// ---------------------------------------------------------------------------
// FieldRole
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRole {
    IssueId,
    Release,
    Title,
    Description,
    Status,
    CategoryFilter,
}

impl FieldRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldRole::IssueId => "Issue ID",
            FieldRole::Release => "Target Release",
            FieldRole::Title => "Title",
            FieldRole::Description => "Description",
            FieldRole::Status => "Status",
            FieldRole::CategoryFilter => "Filter category",
        }
    }
}

impl fmt::Display for FieldRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SchemaInfo
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryField {
    pub id: u32,
    pub name: String,
    /// `label` attribute of the field, if the schema defines one.
    pub display_name: Option<String>,
    pub values: Vec<String>,
}

/// Field ids and value domains resolved from `schema.xml`. Immutable once
/// built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaInfo {
    pub issue_id: u32,
    pub release: u32,
    pub title: u32,
    pub description: u32,
    pub status: u32,
    pub valid_statuses: Vec<String>,
    pub category: Option<CategoryField>,
}

impl SchemaInfo {
    /// Resolve every configured field name against `schema`.
    ///
    /// Each name must match exactly one `<field name="…">`. When
    /// `category_field` is given, that field must be of type `Choose`; its
    /// `<value>` children become the category values.
    pub fn resolve(
        schema: &Document,
        fields: &FieldNames,
        category_field: Option<&str>,
    ) -> Result<Self> {
        let mut ids = [0u32; 5];
        let mut status_element = None;
        for (slot, (role, name)) in ids.iter_mut().zip(fields.by_role()) {
            let element = find_field(schema, role, name)?;
            *slot = parse_field_id(element, name)?;
            if role == FieldRole::Status {
                status_element = Some(element);
            }
        }
        let [issue_id, release, title, description, status] = ids;

        let valid_statuses = status_element.map(enumerated_values).unwrap_or_default();

        let category = match category_field {
            Some(name) => Some(resolve_category(schema, name)?),
            None => None,
        };

        Ok(Self {
            issue_id,
            release,
            title,
            description,
            status,
            valid_statuses,
            category,
        })
    }

    /// Resolved id for `role`; `None` only for an unconfigured category.
    pub fn field_id(&self, role: FieldRole) -> Option<u32> {
        match role {
            FieldRole::IssueId => Some(self.issue_id),
            FieldRole::Release => Some(self.release),
            FieldRole::Title => Some(self.title),
            FieldRole::Description => Some(self.description),
            FieldRole::Status => Some(self.status),
            FieldRole::CategoryFilter => self.category.as_ref().map(|c| c.id),
        }
    }

    pub fn valid_category_values(&self) -> &[String] {
        self.category
            .as_ref()
            .map(|c| c.values.as_slice())
            .unwrap_or(&[])
    }

    /// Label shown for the category dimension: the field's `label`, falling
    /// back to its name.
    pub fn category_display_name(&self) -> Option<&str> {
        self.category
            .as_ref()
            .map(|c| c.display_name.as_deref().unwrap_or(&c.name))
    }
}

fn find_field<'a>(schema: &'a Document, role: FieldRole, name: &str) -> Result<&'a Element> {
    let mut matches = schema.select_where("field", "name", name);
    match matches.len() {
        0 => Err(AccuRevError::SchemaFieldNotFound {
            role,
            name: name.to_string(),
        }),
        1 => Ok(matches.remove(0)),
        count => Err(AccuRevError::AmbiguousSchemaField {
            role,
            name: name.to_string(),
            count,
        }),
    }
}

fn parse_field_id(field: &Element, name: &str) -> Result<u32> {
    let raw = field.attr("fid").unwrap_or_default();
    raw.trim()
        .parse()
        .map_err(|_| AccuRevError::InvalidFieldId {
            name: name.to_string(),
            value: raw.to_string(),
        })
}

fn resolve_category(schema: &Document, name: &str) -> Result<CategoryField> {
    let element = find_field(schema, FieldRole::CategoryFilter, name)?;
    let kind = element.attr("type").unwrap_or_default();
    if !kind.eq_ignore_ascii_case(CHOOSE_FIELD_TYPE) {
        return Err(AccuRevError::InvalidCategoryFieldType {
            name: name.to_string(),
            kind: kind.to_string(),
        });
    }
    Ok(CategoryField {
        id: parse_field_id(element, name)?,
        name: name.to_string(),
        display_name: element
            .attr("label")
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string),
        values: enumerated_values(element),
    })
}

/// Text of each direct `<value>` child, skipping blanks.
fn enumerated_values(field: &Element) -> Vec<String> {
    field
        .children_named("value")
        .map(|v| v.inner_text().trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &[u8] = br#"<?xml version="1.0" encoding="utf-8"?>
<template name="default">
  <field name="issueNum" type="internal" label="Issue" width="10" fid="1"></field>
  <field name="status" type="Choose" label="Status" width="10" fid="3">
    <value>New</value>
    <value>Open</value>
    <value>Closed</value>
  </field>
  <field name="shortDescription" type="Text" label="Short Description" width="60" fid="4"></field>
  <field name="description" type="Text" label="Description" width="60" fid="5"></field>
  <field name="targetRelease" type="Text" label="Target Release" width="20" fid="12"></field>
  <field name="component" type="Choose" label="Component" width="20" fid="20">
    <value>UI</value>
    <value>Server</value>
  </field>
  <field name="severity" type="Text" fid="21"></field>
</template>"#;

    fn schema() -> Document {
        Document::parse(SCHEMA).unwrap()
    }

    #[test]
    fn resolves_default_field_names() {
        let info = SchemaInfo::resolve(&schema(), &FieldNames::default(), None).unwrap();
        assert_eq!(info.field_id(FieldRole::IssueId), Some(1));
        assert_eq!(info.field_id(FieldRole::Status), Some(3));
        assert_eq!(info.field_id(FieldRole::Title), Some(4));
        assert_eq!(info.field_id(FieldRole::Description), Some(5));
        assert_eq!(info.field_id(FieldRole::Release), Some(12));
        assert_eq!(info.field_id(FieldRole::CategoryFilter), None);
        assert_eq!(info.valid_statuses, vec!["New", "Open", "Closed"]);
        assert!(info.valid_category_values().is_empty());
        assert!(info.category_display_name().is_none());
    }

    #[test]
    fn missing_title_field_names_the_role() {
        let mut names = FieldNames::default();
        names.title = "Title".into();
        let err = SchemaInfo::resolve(&schema(), &names, None).unwrap_err();
        match err {
            AccuRevError::SchemaFieldNotFound { role, name } => {
                assert_eq!(role, FieldRole::Title);
                assert_eq!(name, "Title");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn error_message_mentions_role_and_name() {
        let mut names = FieldNames::default();
        names.release = "fixVersion".into();
        let msg = SchemaInfo::resolve(&schema(), &names, None)
            .unwrap_err()
            .to_string();
        assert_eq!(msg, "Target Release field 'fixVersion' not found in AccuWork schema");
    }

    #[test]
    fn category_field_must_be_choose() {
        let err = SchemaInfo::resolve(&schema(), &FieldNames::default(), Some("severity"))
            .unwrap_err();
        assert!(
            matches!(err, AccuRevError::InvalidCategoryFieldType { ref name, ref kind } if name == "severity" && kind == "Text"),
            "{err:?}"
        );
    }

    #[test]
    fn missing_category_field_is_not_found() {
        let err = SchemaInfo::resolve(&schema(), &FieldNames::default(), Some("area"))
            .unwrap_err();
        assert!(matches!(
            err,
            AccuRevError::SchemaFieldNotFound {
                role: FieldRole::CategoryFilter,
                ..
            }
        ));
    }

    #[test]
    fn category_values_and_label_are_captured() {
        let info =
            SchemaInfo::resolve(&schema(), &FieldNames::default(), Some("component")).unwrap();
        assert_eq!(info.field_id(FieldRole::CategoryFilter), Some(20));
        assert_eq!(info.valid_category_values(), ["UI", "Server"]);
        assert_eq!(info.category_display_name(), Some("Component"));
    }

    #[test]
    fn choose_type_is_case_insensitive() {
        let doc = Document::parse(
            br#"<f><field name="issueNum" fid="1"/><field name="status" fid="3"/>
<field name="shortDescription" fid="4"/><field name="description" fid="5"/>
<field name="targetRelease" fid="12"/><field name="area" type="choose" fid="9"/></f>"#,
        )
        .unwrap();
        let info = SchemaInfo::resolve(&doc, &FieldNames::default(), Some("area")).unwrap();
        let category = info.category.as_ref().unwrap();
        assert_eq!(category.id, 9);
        assert!(category.values.is_empty());
        assert_eq!(info.category_display_name(), Some("area"));
    }

    #[test]
    fn duplicate_field_names_are_ambiguous() {
        let doc = Document::parse(
            br#"<f><field name="issueNum" fid="1"/><field name="issueNum" fid="2"/></f>"#,
        )
        .unwrap();
        let err = SchemaInfo::resolve(&doc, &FieldNames::default(), None).unwrap_err();
        assert!(matches!(
            err,
            AccuRevError::AmbiguousSchemaField {
                role: FieldRole::IssueId,
                count: 2,
                ..
            }
        ));
    }

    #[test]
    fn non_numeric_fid_is_rejected() {
        let doc = Document::parse(br#"<field name="issueNum" fid="one"/>"#).unwrap();
        let err = SchemaInfo::resolve(&doc, &FieldNames::default(), None).unwrap_err();
        assert!(matches!(err, AccuRevError::InvalidFieldId { ref value, .. } if value == "one"));
    }
}
