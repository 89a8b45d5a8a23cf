//! Seed option tables from a YAML file.
//!
//! ```yaml
//! sizes:
//!   - { name: "9", sort_order: 1 }
//!   - { name: "9.5", sort_order: 2 }
//! colors:
//!   - { name: Oxblood, hex_code: "#4A0000" }
//! ```
//!
//! Top-level keys are plural category names. Every entry is validated
//! before the database is touched. Names that already exist (ignoring
//! case) are left alone.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use thiserror::Error;
use tracing::{error, info};

use cobbler_admin::db::{self, OptionRepository, RepositoryError};
use cobbler_admin::models::{NewOption, OptionInput};
use cobbler_core::OptionCategory;

use super::{DATABASE_URL_VAR, database_url};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{} validation errors found", .0.len())]
    Invalid(Vec<String>),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Validated values per category, in configurator order.
pub type SeedPlan = Vec<(OptionCategory, Vec<NewOption>)>;

/// Parse and validate a seed file.
///
/// # Errors
///
/// Returns [`SeedError::Yaml`] for malformed YAML and
/// [`SeedError::Invalid`] listing every problem found.
pub fn parse_plan(content: &str) -> Result<SeedPlan, SeedError> {
    let raw: BTreeMap<String, Vec<OptionInput>> = serde_yaml::from_str(content)?;

    let mut errors = Vec::new();
    let mut by_category: BTreeMap<OptionCategory, Vec<NewOption>> = BTreeMap::new();

    for (key, entries) in raw {
        let Some(category) = OptionCategory::from_plural(&key) else {
            errors.push(format!(
                "unknown section {key:?}, expected one of: {}",
                OptionCategory::ALL.map(OptionCategory::plural).join(", ")
            ));
            continue;
        };

        let mut seen = HashSet::new();
        let values = by_category.entry(category).or_default();
        for (i, entry) in entries.into_iter().enumerate() {
            match entry.validate(category) {
                Ok(option) => {
                    if seen.insert(option.name.to_lowercase()) {
                        values.push(option);
                    } else {
                        errors.push(format!("{key}[{i}]: duplicate name {:?}", option.name));
                    }
                }
                Err(e) => errors.push(format!("{key}[{i}]: {e}")),
            }
        }
    }

    if !errors.is_empty() {
        return Err(SeedError::Invalid(errors));
    }

    Ok(OptionCategory::ALL
        .into_iter()
        .filter_map(|c| by_category.remove(&c).map(|values| (c, values)))
        .collect())
}

/// Seed option values from `file_path`.
///
/// # Errors
///
/// Returns an error if the file is missing or invalid, or if the database
/// is unreachable.
pub async fn options(file_path: &str, dry_run: bool) -> Result<(), SeedError> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(SeedError::FileNotFound(file_path.to_owned()));
    }

    info!(path = %file_path, "Loading option values from file");
    let content = tokio::fs::read_to_string(path).await?;

    let plan = match parse_plan(&content) {
        Ok(plan) => plan,
        Err(SeedError::Invalid(errors)) => {
            error!("Seed file validation failed:");
            for err in &errors {
                error!("  - {err}");
            }
            return Err(SeedError::Invalid(errors));
        }
        Err(e) => return Err(e),
    };

    for (category, values) in &plan {
        info!(category = %category, values = values.len(), "Parsed section");
    }

    if dry_run {
        info!("Dry run: validation passed, database not touched");
        return Ok(());
    }

    let url = database_url().ok_or(SeedError::MissingEnvVar(DATABASE_URL_VAR))?;
    let pool = db::create_pool(&url).await?;
    info!("Connected to database");

    let mut inserted = 0usize;
    let mut skipped = 0usize;
    for (category, values) in plan {
        let repo = OptionRepository::new(&pool, category);
        let existing: HashSet<String> = repo
            .list_all()
            .await?
            .into_iter()
            .map(|o| o.name.to_lowercase())
            .collect();

        for option in values {
            if existing.contains(&option.name.to_lowercase()) {
                skipped += 1;
                continue;
            }
            repo.create(&option).await?;
            inserted += 1;
        }
    }

    info!("Seeding complete!");
    info!("  Values inserted: {inserted}");
    info!("  Values skipped (already exist): {skipped}");

    Ok(())
}
