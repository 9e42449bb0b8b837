use crate::domain::model::Association;
use crate::utils::error::{AllocError, Result};
use crate::utils::validation::{
    validate_identifier, validate_non_empty_string, validate_path, validate_unique, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub storage: StorageConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub associations: Vec<Association>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Turning this off lets operators accept late preferences or assign early.
    #[serde(default = "default_enforce_deadlines")]
    pub enforce_deadlines: bool,
}

fn default_enforce_deadlines() -> bool {
    true
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enforce_deadlines: default_enforce_deadlines(),
        }
    }
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static pattern"))
}

impl TomlConfig {
    /// Reads and parses a TOML configuration file. Call `validate()` afterwards.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(AllocError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| AllocError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the variable's value; unset variables are left as written.
    fn substitute_env_vars(content: &str) -> String {
        env_var_pattern()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    pub fn data_dir(&self) -> &str {
        &self.storage.data_dir
    }

    pub fn enforce_deadlines(&self) -> bool {
        self.schedule.enforce_deadlines
    }

    pub fn association(&self, id: &str) -> Option<&Association> {
        self.associations.iter().find(|a| a.id == id)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_path("storage.data_dir", &self.storage.data_dir)?;

        if self.associations.is_empty() {
            return Err(AllocError::MissingConfigError {
                field: "associations".to_string(),
            });
        }

        for association in &self.associations {
            validate_identifier("associations.id", &association.id)?;
            validate_non_empty_string("associations.name", &association.name)?;
        }
        validate_unique(
            "associations.id",
            self.associations.iter().map(|a| a.id.as_str()),
        )?;

        Ok(())
    }
}
