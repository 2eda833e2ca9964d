use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, ConnectorConfig};

/// Databases whose collections are never captured.
const BUILT_IN_DATABASES: [&str; 3] = ["admin", "config", "local"];
const SYSTEM_COLLECTION_PREFIX: &str = "system.";

/// A fully qualified collection name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CollectionId {
    pub database: String,
    pub collection: String,
}

impl CollectionId {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

#[derive(Debug, Clone)]
enum NamePredicate {
    All,
    Include(Vec<Regex>),
    Exclude(Vec<Regex>),
}

impl NamePredicate {
    fn compile(include: &[String], exclude: &[String]) -> Result<Self, ConfigError> {
        if !include.is_empty() {
            Ok(NamePredicate::Include(compile_patterns(include)?))
        } else if !exclude.is_empty() {
            Ok(NamePredicate::Exclude(compile_patterns(exclude)?))
        } else {
            Ok(NamePredicate::All)
        }
    }

    fn test(&self, name: &str) -> bool {
        match self {
            NamePredicate::All => true,
            NamePredicate::Include(patterns) => patterns.iter().any(|p| p.is_match(name)),
            NamePredicate::Exclude(patterns) => !patterns.iter().any(|p| p.is_match(name)),
        }
    }
}

/// Allow/deny predicates over database and collection names.
///
/// Patterns are regular expressions matched against the whole name, ignoring case.
/// Collection patterns are matched against `database.collection`.
#[derive(Debug, Clone)]
pub struct Filters {
    databases: NamePredicate,
    collections: NamePredicate,
}

impl Filters {
    pub fn from_config(config: &ConnectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            databases: NamePredicate::compile(
                &config.database_include_list,
                &config.database_exclude_list,
            )?,
            collections: NamePredicate::compile(
                &config.collection_include_list,
                &config.collection_exclude_list,
            )?,
        })
    }

    /// Filters that let every database and non-system collection through.
    pub fn allow_all() -> Self {
        Self {
            databases: NamePredicate::All,
            collections: NamePredicate::All,
        }
    }

    pub fn database_filter(&self, database: &str) -> bool {
        self.databases.test(database)
    }

    pub fn collection_filter(&self, id: &CollectionId) -> bool {
        if BUILT_IN_DATABASES.contains(&id.database.as_str())
            || id.collection.starts_with(SYSTEM_COLLECTION_PREFIX)
        {
            return false;
        }
        self.collections.test(&id.to_string())
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(|p| {
            RegexBuilder::new(&format!("^(?:{})$", p))
                .case_insensitive(true)
                .build()
                .map_err(|source| ConfigError::InvalidPattern {
                    pattern: p.to_string(),
                    source,
                })
        })
        .collect()
}
