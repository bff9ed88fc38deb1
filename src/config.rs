//! Configuration types.

use std::time::Duration;

use crate::catalog::{CatalogEntry, OptionCatalog};
use crate::error::ConfigError;

/// One free-text profile question.
#[derive(Debug, Clone)]
pub struct FreeTextQuestion {
    /// Stable field key ("hobbies").
    pub key: String,
    /// Label used in the posted summary ("Hobbies").
    pub label: String,
    /// The question sent to the user.
    pub prompt: String,
}

impl FreeTextQuestion {
    fn new(key: &str, label: &str, prompt: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            prompt: prompt.to_string(),
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct WardenConfig {
    /// Channel new members are pointed at.
    pub welcome_channel: String,
    /// Channel receiving profile summaries.
    pub summary_channel: String,
    /// Role granted at the end of the flow, pending admin review.
    pub pending_role: String,
    /// The platform's universal default role; never removed by the reset.
    pub default_role: String,
    /// Deadline for each free-text answer.
    pub free_text_timeout: Duration,
    /// Profile questions, asked in order.
    pub questions: Vec<FreeTextQuestion>,
    /// Selection categories, asked in order.
    pub catalogs: Vec<OptionCatalog>,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            welcome_channel: "welcome".to_string(),
            summary_channel: "introductions".to_string(),
            pending_role: "Pending Verification".to_string(),
            default_role: "@everyone".to_string(),
            free_text_timeout: Duration::from_secs(180), // 3 minutes
            questions: default_questions(),
            catalogs: default_catalogs(),
        }
    }
}

impl WardenConfig {
    /// Build the configuration from the environment, starting from defaults.
    ///
    /// `GATEWARDEN_CATALOG_FILE` replaces the built-in catalogs with a JSON
    /// array of catalogs; the name and timeout variables override their
    /// respective fields.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Ok(v) = std::env::var("GATEWARDEN_WELCOME_CHANNEL") {
            config.welcome_channel = v;
        }
        if let Ok(v) = std::env::var("GATEWARDEN_SUMMARY_CHANNEL") {
            config.summary_channel = v;
        }
        if let Ok(v) = std::env::var("GATEWARDEN_PENDING_ROLE") {
            config.pending_role = v;
        }
        if let Ok(v) = std::env::var("GATEWARDEN_DEFAULT_ROLE") {
            config.default_role = v;
        }
        if let Ok(v) = std::env::var("GATEWARDEN_FREETEXT_TIMEOUT_SECS") {
            config.free_text_timeout = timeout_from_secs("GATEWARDEN_FREETEXT_TIMEOUT_SECS", &v)?;
        }
        if let Ok(path) = std::env::var("GATEWARDEN_CATALOG_FILE") {
            config.catalogs = load_catalogs(&path)?;
        }
        Ok(config)
    }
}

fn timeout_from_secs(key: &str, value: &str) -> Result<Duration, ConfigError> {
    let secs: u64 = value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("not a number of seconds: {value}"),
    })?;
    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "timeout must be at least one second".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

/// Load and validate a catalog set from a JSON file.
pub fn load_catalogs(path: &str) -> Result<Vec<OptionCatalog>, ConfigError> {
    let raw = std::fs::read_to_string(path)?;
    let catalogs: Vec<OptionCatalog> = serde_json::from_str(&raw)?;
    if catalogs.is_empty() {
        return Err(ConfigError::ParseError(format!(
            "catalog file {path} contains no catalogs"
        )));
    }
    for catalog in &catalogs {
        catalog.validate()?;
    }
    Ok(catalogs)
}

fn default_questions() -> Vec<FreeTextQuestion> {
    vec![
        FreeTextQuestion::new("hobbies", "Hobbies", "What are your hobbies?"),
        FreeTextQuestion::new("skills", "Skills", "What skills would you like to share?"),
        FreeTextQuestion::new(
            "achievements",
            "Achievements",
            "Any achievements you are proud of?",
        ),
        FreeTextQuestion::new("social", "Social", "Any social links you want to share?"),
        FreeTextQuestion::new(
            "greeting",
            "Greeting",
            "Leave a short greeting for the community!",
        ),
    ]
}

fn default_catalogs() -> Vec<OptionCatalog> {
    vec![
        OptionCatalog {
            category: "location".to_string(),
            title: "Select your campus".to_string(),
            entries: vec![
                CatalogEntry::new("main", "Main Campus", Some("Main Campus")),
                CatalogEntry::new("north", "North Campus", Some("North Campus")),
                CatalogEntry::new("online", "Online", Some("Online")),
                CatalogEntry::new("other", "Other / prefer not to say", None),
            ],
            min_choices: 1,
            max_choices: None,
        },
        OptionCatalog {
            category: "occupation".to_string(),
            title: "Select your occupation(s)".to_string(),
            entries: vec![
                CatalogEntry::new("student", "Student", Some("Student")),
                CatalogEntry::new("professional", "Professional", Some("Professional")),
                CatalogEntry::new("educator", "Educator", Some("Educator")),
                CatalogEntry::new("researcher", "Researcher", Some("Researcher")),
            ],
            min_choices: 0,
            max_choices: None,
        },
        OptionCatalog {
            category: "major".to_string(),
            title: "Select your major(s)".to_string(),
            entries: vec![
                CatalogEntry::new("cs", "Computer Science", Some("Computer Science")),
                CatalogEntry::new("engineering", "Engineering", Some("Engineering")),
                CatalogEntry::new("business", "Business", Some("Business")),
                CatalogEntry::new("arts", "Arts", Some("Arts")),
                CatalogEntry::new("undecided", "Undecided", None),
            ],
            min_choices: 0,
            max_choices: None,
        },
        OptionCatalog {
            category: "level".to_string(),
            title: "Select your level(s)".to_string(),
            entries: vec![
                CatalogEntry::new("undergrad", "Undergraduate", Some("Undergraduate")),
                CatalogEntry::new("grad", "Graduate", Some("Graduate")),
                CatalogEntry::new("alumni", "Alumni", Some("Alumni")),
            ],
            min_choices: 0,
            max_choices: None,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_cover_the_four_categories_in_order() {
        let config = WardenConfig::default();
        let categories: Vec<&str> = config
            .catalogs
            .iter()
            .map(|c| c.category.as_str())
            .collect();
        assert_eq!(categories, vec!["location", "occupation", "major", "level"]);

        // Location requires a choice; the rest are optional.
        assert_eq!(config.catalogs[0].min_choices, 1);
        for catalog in &config.catalogs[1..] {
            assert_eq!(catalog.min_choices, 0);
        }
        for catalog in &config.catalogs {
            catalog.validate().unwrap();
        }

        assert_eq!(config.questions.len(), 5);
        assert_eq!(config.free_text_timeout, Duration::from_secs(180));
    }

    #[test]
    fn from_env_needs_no_variables_set() {
        // Every field has a default; the environment only overrides.
        let config = WardenConfig::from_env().unwrap();
        assert!(!config.questions.is_empty());
        assert!(!config.catalogs.is_empty());
    }

    #[test]
    fn timeout_parsing_rejects_garbage_and_zero() {
        assert_eq!(
            timeout_from_secs("T", "90").unwrap(),
            Duration::from_secs(90)
        );
        assert!(timeout_from_secs("T", "soon").is_err());
        assert!(timeout_from_secs("T", "0").is_err());
    }

    #[test]
    fn catalogs_load_from_a_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{
                "category": "location",
                "title": "Select your campus",
                "min_choices": 1,
                "entries": [
                    {{ "value": "main", "label": "Main Campus", "role": "Main Campus" }},
                    {{ "value": "other", "label": "Other" }}
                ]
            }}]"#
        )
        .unwrap();

        let catalogs = load_catalogs(file.path().to_str().unwrap()).unwrap();
        assert_eq!(catalogs.len(), 1);
        assert_eq!(catalogs[0].category, "location");
        assert_eq!(catalogs[0].entries[1].role, None);
    }

    #[test]
    fn empty_or_invalid_catalog_files_are_rejected() {
        let mut empty = tempfile::NamedTempFile::new().unwrap();
        write!(empty, "[]").unwrap();
        assert!(matches!(
            load_catalogs(empty.path().to_str().unwrap()),
            Err(ConfigError::ParseError(_))
        ));

        let mut garbage = tempfile::NamedTempFile::new().unwrap();
        write!(garbage, "not json").unwrap();
        assert!(matches!(
            load_catalogs(garbage.path().to_str().unwrap()),
            Err(ConfigError::Json(_))
        ));

        assert!(matches!(
            load_catalogs("/nonexistent/catalogs.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
