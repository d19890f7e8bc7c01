//! AccuWork issue queries.
//!
//! The schema (`schema.xml` of the issue depot) is fetched and resolved on
//! first use and then kept for the lifetime of the [`IssueTracker`]. A
//! schema edited on the server afterwards is only seen by a new tracker.

use std::io::Write;

use accurev_process::Invocation;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::client::AccuRev;
use crate::config::{Config, IssueTrackingConfig};
use crate::error::{AccuRevError, Result};
use crate::schema::{FieldRole, SchemaInfo};
use crate::xml::{Document, Element};

/// File name prefix of the temporary `accurev xml -l` query file.
pub const QUERY_FILE_PREFIX: &str = "accurev-query-";

// ---------------------------------------------------------------------------
// Output records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub id: String,
    pub status: String,
    pub title: String,
    pub description: String,
    /// The release the query asked for; not read back from the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
}

/// One value of the category field. AccuWork values have no separate id, so
/// both fields hold the value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

impl Category {
    fn from_value(value: &str) -> Self {
        Self {
            id: value.to_string(),
            name: value.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// IssueTracker
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct IssueTracker {
    client: AccuRev,
    settings: IssueTrackingConfig,
    schema: OnceCell<SchemaInfo>,
}

impl IssueTracker {
    /// Fails with [`AccuRevError::DepotNotConfigured`] unless the config has
    /// an `issue_tracking` section naming a depot.
    pub fn new(config: &Config) -> Result<Self> {
        let settings = config
            .issue_tracking
            .clone()
            .filter(|s| !s.depot.trim().is_empty())
            .ok_or(AccuRevError::DepotNotConfigured)?;
        Ok(Self {
            client: AccuRev::new(config),
            settings,
            schema: OnceCell::new(),
        })
    }

    pub fn settings(&self) -> &IssueTrackingConfig {
        &self.settings
    }

    pub fn is_available(&self) -> bool {
        self.client.is_available()
    }

    /// Log in, then return the resolved schema, fetching it on first call.
    ///
    /// Concurrent first calls share one fetch. A failed fetch is not
    /// remembered; the next call tries again.
    pub async fn ensure_schema(&self) -> Result<&SchemaInfo> {
        self.client.login().await?;
        self.schema.get_or_try_init(|| self.fetch_schema()).await
    }

    async fn fetch_schema(&self) -> Result<SchemaInfo> {
        let depot = self.settings.depot.as_str();
        let doc = self
            .client
            .run_xml(&Invocation::new("getconfig").args(["-p", depot, "-r", "schema.xml"]))
            .await?;
        let schema = SchemaInfo::resolve(&doc, &self.settings.fields, self.settings.category_field())?;
        info!(
            depot = %depot,
            statuses = schema.valid_statuses.len(),
            category = ?schema.category_display_name(),
            "resolved AccuWork schema"
        );
        Ok(schema)
    }

    pub async fn validate_connection(&self) -> Result<()> {
        self.ensure_schema().await.map(|_| ())
    }

    /// Issues of the configured depot, optionally narrowed to a release
    /// and/or a category value.
    pub async fn query_issues(
        &self,
        release: Option<&str>,
        category: Option<&str>,
    ) -> Result<Vec<Issue>> {
        let release = release.filter(|r| !r.is_empty());
        let category = category.filter(|c| !c.is_empty());
        for value in release.into_iter().chain(category) {
            check_query_value(value)?;
        }
        if let (Some(value), None) = (category, self.settings.category_field()) {
            return Err(AccuRevError::CategoryFilterNotConfigured(value.to_string()));
        }

        let schema = self.ensure_schema().await?;
        let release_condition = release
            .map(|r| condition(schema.release, r))
            .transpose()?;
        let category_condition = match category {
            Some(value) => {
                let fid = schema
                    .field_id(FieldRole::CategoryFilter)
                    .ok_or_else(|| AccuRevError::CategoryFilterNotConfigured(value.to_string()))?;
                Some(condition(fid, value)?)
            }
            None => None,
        };

        let query = build_query_document(
            &self.settings.depot,
            release_condition.as_deref(),
            category_condition.as_deref(),
        )?;
        let mut query_file = tempfile::Builder::new()
            .prefix(QUERY_FILE_PREFIX)
            .suffix(".xml")
            .tempfile_in(self.client.scratch_dir())?;
        query_file.write_all(&query)?;
        query_file.flush()?;

        let results = self
            .client
            .run_xml(&Invocation::new("xml").arg("-l").arg(query_file.path()))
            .await?;
        let issues = parse_issues(&results, schema, release);
        debug!(count = issues.len(), release = ?release, category = ?category, "queried AccuWork issues");
        Ok(issues)
    }

    /// `true` when the issue's status is one of the configured closed
    /// statuses. Always `false` when none are configured.
    pub fn is_issue_closed(&self, issue: &Issue) -> bool {
        self.settings
            .closed_statuses
            .iter()
            .any(|s| *s == issue.status)
    }

    /// Values of the category field; empty without a configured category
    /// field.
    pub async fn categories(&self) -> Result<Vec<Category>> {
        if self.settings.category_field().is_none() {
            return Ok(Vec::new());
        }
        let schema = self.ensure_schema().await?;
        Ok(schema
            .valid_category_values()
            .iter()
            .map(|v| Category::from_value(v))
            .collect())
    }

    /// Display name of each category dimension (at most one).
    pub async fn category_type_names(&self) -> Result<Vec<String>> {
        if self.settings.category_field().is_none() {
            return Ok(Vec::new());
        }
        let schema = self.ensure_schema().await?;
        Ok(schema
            .category_display_name()
            .map(str::to_string)
            .into_iter()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Query document
// ---------------------------------------------------------------------------

/// `<fid> == "<value>"`
///
/// AccuWork conditions have no escape for `"`, so such values are refused
/// rather than allowed to close the literal early.
pub fn condition(fid: u32, value: &str) -> Result<String> {
    check_query_value(value)?;
    Ok(format!("{fid} == \"{value}\""))
}

fn check_query_value(value: &str) -> Result<()> {
    if value.contains('"') {
        return Err(AccuRevError::InvalidQueryValue(value.to_string()));
    }
    Ok(())
}

/// Serialize an `accurev xml` issue query for `depot`.
///
/// Two conditions are combined under `<AND>` with `useAltQuery="false"`; a
/// single condition is the element's text; with none every issue matches.
pub fn build_query_document(
    depot: &str,
    release_condition: Option<&str>,
    category_condition: Option<&str>,
) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());

    let mut root = BytesStart::new("queryIssue");
    root.push_attribute(("issueDB", depot));
    match (release_condition, category_condition) {
        (Some(release), Some(category)) => {
            root.push_attribute(("useAltQuery", "false"));
            writer.write_event(Event::Start(root))?;
            writer.write_event(Event::Start(BytesStart::new("AND")))?;
            for text in [release, category] {
                writer.write_event(Event::Start(BytesStart::new("condition")))?;
                writer.write_event(Event::Text(BytesText::new(text)))?;
                writer.write_event(Event::End(BytesEnd::new("condition")))?;
            }
            writer.write_event(Event::End(BytesEnd::new("AND")))?;
        }
        (Some(only), None) | (None, Some(only)) => {
            writer.write_event(Event::Start(root))?;
            writer.write_event(Event::Text(BytesText::new(only)))?;
        }
        (None, None) => writer.write_event(Event::Start(root))?,
    }
    writer.write_event(Event::End(BytesEnd::new("queryIssue")))?;

    Ok(writer.into_inner())
}

// ---------------------------------------------------------------------------
// Query results
// ---------------------------------------------------------------------------

/// Read every `<issue>` of an `accurev xml` reply using the resolved field
/// ids. Missing fields read as empty strings.
pub fn parse_issues(doc: &Document, schema: &SchemaInfo, release: Option<&str>) -> Vec<Issue> {
    doc.select_all("issue")
        .into_iter()
        .map(|issue| Issue {
            id: field_value(issue, schema.issue_id),
            status: field_value(issue, schema.status),
            title: field_value(issue, schema.title),
            description: field_value(issue, schema.description),
            release: release.map(str::to_string),
        })
        .collect()
}

fn field_value(issue: &Element, fid: u32) -> String {
    issue
        .child_where("fid", &fid.to_string())
        .map(|e| e.inner_text())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> SchemaInfo {
        SchemaInfo {
            issue_id: 1,
            release: 12,
            title: 4,
            description: 5,
            status: 3,
            valid_statuses: vec!["Open".into(), "Closed".into()],
            category: None,
        }
    }

    fn parsed(bytes: &[u8]) -> Element {
        Document::parse(bytes)
            .unwrap()
            .roots()
            .next()
            .cloned()
            .unwrap()
    }

    #[test]
    fn query_without_conditions_is_bare() {
        let query = build_query_document("widgets", None, None).unwrap();
        assert_eq!(
            String::from_utf8(query).unwrap(),
            r#"<queryIssue issueDB="widgets"></queryIssue>"#
        );
    }

    #[test]
    fn single_condition_is_element_text() {
        let cond = condition(12, "2.1").unwrap();
        for query in [
            build_query_document("widgets", Some(&cond), None).unwrap(),
            build_query_document("widgets", None, Some(&cond)).unwrap(),
        ] {
            let root = parsed(&query);
            assert_eq!(root.name(), "queryIssue");
            assert_eq!(root.attr("issueDB"), Some("widgets"));
            assert!(!root.has_attr("useAltQuery"));
            assert_eq!(root.children().count(), 0);
            assert_eq!(root.inner_text(), r#"12 == "2.1""#);
        }
    }

    #[test]
    fn two_conditions_are_anded() {
        let release = condition(12, "2.1").unwrap();
        let category = condition(20, "UI").unwrap();
        let query = build_query_document("widgets", Some(&release), Some(&category)).unwrap();

        let text = String::from_utf8(query.clone()).unwrap();
        assert!(!text.starts_with("<?xml"));

        let root = parsed(&query);
        assert_eq!(root.attr("useAltQuery"), Some("false"));
        let and = root.children_named("AND").next().unwrap();
        let conditions: Vec<String> = and
            .children_named("condition")
            .map(|c| c.inner_text())
            .collect();
        assert_eq!(conditions, [r#"12 == "2.1""#, r#"20 == "UI""#]);
    }

    #[test]
    fn quoted_values_cannot_extend_the_condition() {
        let err = condition(12, r#"2.1" || 3 == "Open"#).unwrap_err();
        assert!(matches!(err, AccuRevError::InvalidQueryValue(ref v) if v.starts_with("2.1")));
        assert_eq!(condition(12, "R&D <2>").unwrap(), r#"12 == "R&D <2>""#);
    }

    #[tokio::test]
    async fn quoted_filter_is_refused_before_running_accurev() {
        let mut config = Config::new("/nonexistent/accurev");
        config.issue_tracking = Some(IssueTrackingConfig::new("widgets"));
        let tracker = IssueTracker::new(&config).unwrap();

        let err = tracker
            .query_issues(Some(r#"2.1" || 3 == "Open"#), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AccuRevError::InvalidQueryValue(_)));
    }

    #[test]
    fn issues_are_read_by_field_id() {
        let doc = Document::parse(
            br#"<acResponse>
  <issue>
    <issueNum fid="1">17</issueNum>
    <status fid="3">Open</status>
    <shortDescription fid="4">Crash on save</shortDescription>
    <description fid="5">Stack trace attached</description>
    <targetRelease fid="12">2.0</targetRelease>
  </issue>
  <issue>
    <issueNum fid="1">18</issueNum>
    <status fid="3">Closed</status>
  </issue>
</acResponse>"#,
        )
        .unwrap();

        let issues = parse_issues(&doc, &schema(), Some("2.1"));
        assert_eq!(issues.len(), 2);
        assert_eq!(
            issues[0],
            Issue {
                id: "17".into(),
                status: "Open".into(),
                title: "Crash on save".into(),
                description: "Stack trace attached".into(),
                release: Some("2.1".into()),
            }
        );
        assert_eq!(issues[1].id, "18");
        assert_eq!(issues[1].title, "");
        assert_eq!(issues[1].description, "");
    }

    #[test]
    fn tracker_requires_a_depot() {
        let mut config = Config::default();
        assert!(matches!(
            IssueTracker::new(&config),
            Err(AccuRevError::DepotNotConfigured)
        ));
        config.issue_tracking = Some(IssueTrackingConfig::new("  "));
        assert!(matches!(
            IssueTracker::new(&config),
            Err(AccuRevError::DepotNotConfigured)
        ));
    }

    #[test]
    fn closed_status_membership() {
        let mut config = Config::default();
        let mut settings = IssueTrackingConfig::new("widgets");
        settings.closed_statuses = vec!["Closed".into(), "Rejected".into()];
        config.issue_tracking = Some(settings);
        let tracker = IssueTracker::new(&config).unwrap();

        let mut issue = Issue {
            id: "1".into(),
            status: "Rejected".into(),
            title: String::new(),
            description: String::new(),
            release: None,
        };
        assert!(tracker.is_issue_closed(&issue));
        issue.status = "closed".into();
        assert!(!tracker.is_issue_closed(&issue));

        config.issue_tracking.as_mut().unwrap().closed_statuses.clear();
        let tracker = IssueTracker::new(&config).unwrap();
        issue.status = "Closed".into();
        assert!(!tracker.is_issue_closed(&issue));
    }

    #[tokio::test]
    async fn category_filter_without_category_field_fails_early() {
        let mut config = Config::new("/nonexistent/accurev");
        config.issue_tracking = Some(IssueTrackingConfig::new("widgets"));
        let tracker = IssueTracker::new(&config).unwrap();

        let err = tracker.query_issues(None, Some("UI")).await.unwrap_err();
        assert!(matches!(err, AccuRevError::CategoryFilterNotConfigured(ref v) if v == "UI"));
        assert!(tracker.categories().await.unwrap().is_empty());
        assert!(tracker.category_type_names().await.unwrap().is_empty());
    }
}
