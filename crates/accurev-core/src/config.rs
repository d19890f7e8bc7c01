use crate::error::{AccuRevError, Result};
use crate::schema::FieldRole;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "accurev-bridge.yaml";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// SourceControlConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceControlConfig {
    /// Report every file as last modified at the Unix epoch instead of its
    /// real `modTime`. For consumers that relied on the old behaviour.
    #[serde(default)]
    pub epoch_mod_times: bool,
}

// ---------------------------------------------------------------------------
// IssueTrackingConfig
// ---------------------------------------------------------------------------

/// AccuWork field names mapped to the roles the bridge reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldNames {
    #[serde(default = "default_issue_id_field")]
    pub issue_id: String,
    #[serde(default = "default_release_field")]
    pub release: String,
    #[serde(default = "default_title_field")]
    pub title: String,
    #[serde(default = "default_description_field")]
    pub description: String,
    #[serde(default = "default_status_field")]
    pub status: String,
}

fn default_issue_id_field() -> String {
    "issueNum".to_string()
}

fn default_release_field() -> String {
    "targetRelease".to_string()
}

fn default_title_field() -> String {
    "shortDescription".to_string()
}

fn default_description_field() -> String {
    "description".to_string()
}

fn default_status_field() -> String {
    "status".to_string()
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            issue_id: default_issue_id_field(),
            release: default_release_field(),
            title: default_title_field(),
            description: default_description_field(),
            status: default_status_field(),
        }
    }
}

impl FieldNames {
    /// Configured name for every required role.
    pub fn by_role(&self) -> [(FieldRole, &str); 5] {
        [
            (FieldRole::IssueId, self.issue_id.as_str()),
            (FieldRole::Release, self.release.as_str()),
            (FieldRole::Title, self.title.as_str()),
            (FieldRole::Description, self.description.as_str()),
            (FieldRole::Status, self.status.as_str()),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueTrackingConfig {
    /// Depot holding the AccuWork issue database.
    pub depot: String,
    #[serde(default)]
    pub fields: FieldNames,
    #[serde(default = "default_closed_statuses")]
    pub closed_statuses: Vec<String>,
    /// Name of a `Choose` field whose values are offered as categories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_field: Option<String>,
}

fn default_closed_statuses() -> Vec<String> {
    vec!["Closed".to_string()]
}

impl IssueTrackingConfig {
    pub fn new(depot: impl Into<String>) -> Self {
        Self {
            depot: depot.into(),
            fields: FieldNames::default(),
            closed_statuses: default_closed_statuses(),
            category_field: None,
        }
    }

    /// The category field, treating a blank name as unset.
    pub fn category_field(&self) -> Option<&str> {
        self.category_field
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the accurev executable, or a bare name looked up on `PATH`.
    #[serde(default = "default_executable")]
    pub executable: PathBuf,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Seconds to wait for a single accurev call; 0 waits forever.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Where `pop` staging directories and query files are created; the
    /// system temp directory when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,
    #[serde(default)]
    pub source_control: SourceControlConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_tracking: Option<IssueTrackingConfig>,
}

fn default_executable() -> PathBuf {
    PathBuf::from("accurev")
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for Config {
    fn default() -> Self {
        Self::new(default_executable())
    }
}

impl Config {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            username: String::new(),
            password: String::new(),
            timeout_secs: default_timeout_secs(),
            scratch_dir: None,
            source_control: SourceControlConfig::default(),
            issue_tracking: None,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AccuRevError::ConfigNotFound(path.display().to_string()));
        }
        let data = std::fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        // 1. Executable must be set
        if self.executable.as_os_str().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "executable is empty".to_string(),
            });
        }

        // 2. Credentials: accurev login needs a user
        if self.username.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "username is empty; 'accurev login' will fail".to_string(),
            });
        }

        let Some(issues) = &self.issue_tracking else {
            return warnings;
        };

        // 3. Depot is required for every AccuWork query
        if issues.depot.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "issue_tracking.depot is empty".to_string(),
            });
        }

        // 4. Field names: none empty, no two roles sharing a field
        let by_role = issues.fields.by_role();
        for (role, name) in &by_role {
            if name.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("issue_tracking.fields: {role} field name is empty"),
                });
            }
        }
        for (i, (role, name)) in by_role.iter().enumerate() {
            if let Some((other, _)) = by_role[i + 1..].iter().find(|(_, n)| n == name) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("{role} and {other} both read field '{name}'"),
                });
            }
        }

        // 5. Without closed statuses no issue is ever reported closed
        if issues.closed_statuses.iter().all(|s| s.trim().is_empty()) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "issue_tracking.closed_statuses is empty; no issue will be treated as closed"
                    .to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
