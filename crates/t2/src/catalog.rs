//! Catalog of providers, platforms and operator tests.
//!
//! The catalog is read from two YAML documents:
//!
//! - `platforms.yaml` with the sections `providers` and `platforms`
//! - `operator-tests.yaml`, a top-level list of operator test definitions
//!
//! Each document may be assembled from several files which are deep-merged
//! in order (see [`load_layered`]). A [`Catalog`] is built once and then
//! passed by reference to whoever needs it.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::providers::ClusterSpec;

/// Test script used when an operator test does not select one.
pub const DEFAULT_TEST_SCRIPT: &str = "run-tests";

/// Test script which retries failed tests on its own.
pub const AUTO_RETRY_TEST_SCRIPT: &str = "auto-retry-tests.py";

const PLATFORMS_DOCUMENT: &str = "platforms.yaml";
const OPERATOR_TESTS_DOCUMENT: &str = "operator-tests.yaml";

/// Errors that can occur while loading or querying the catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// A catalog file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A catalog file is not valid YAML or does not match the schema.
    #[error("Failed to parse {document}: {source}")]
    Yaml {
        document: String,
        source: serde_yaml::Error,
    },

    /// A required section is missing.
    #[error("{document} does not contain {section}.")]
    MissingSection {
        document: &'static str,
        section: &'static str,
    },

    /// A section is present but empty.
    #[error("{document} does not contain any {section}.")]
    Empty {
        document: &'static str,
        section: &'static str,
    },

    /// Two entries of the same list share an id.
    #[error("{document} contains the {kind} id '{id}' more than once.")]
    DuplicateId {
        document: &'static str,
        kind: &'static str,
        id: String,
    },

    /// A platform without any Kubernetes version.
    #[error("The platform '{0}' does not list any versions.")]
    NoVersions(String),

    /// A platform refers to a provider that is not in the catalog.
    #[error("The platform '{platform}' refers to the unknown provider '{provider}'.")]
    UnknownProvider { platform: String, provider: String },

    #[error("The platform '{0}' does not exist.")]
    UnknownPlatform(String),

    #[error("The operator test '{0}' does not exist.")]
    UnknownOperatorTest(String),

    #[error("The test for '{operator_test}' is not defined for the platform '{platform}'.")]
    PlatformNotDefinedForTest {
        operator_test: String,
        platform: String,
    },
}

/// A cloud vendor able to host Kubernetes clusters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,
}

/// A deployment target: provider, base cluster spec and supported versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub id: String,
    /// Display name, also accepted by [`Catalog::find_platform`].
    pub name: String,
    /// Id of the [`Provider`] hosting this platform.
    pub provider: String,
    /// Base cluster spec.
    #[serde(default)]
    pub spec: ClusterSpec,
    /// Supported Kubernetes versions.
    #[serde(default)]
    pub versions: Vec<String>,
}

/// Platform-specific part of an operator test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorTestPlatform {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<ClusterSpec>,
}

/// Overrides for [`AutoRetryConfig`] as written in the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoRetryOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts_parallel: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts_serial: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_failed_namespaces: Option<bool>,
}

/// Settings for the auto-retry test script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AutoRetryConfig {
    /// Attempts of the parallel test phase.
    pub attempts_parallel: u32,
    /// Attempts of the serial test phase.
    pub attempts_serial: u32,
    /// Whether namespaces of failed tests are deleted.
    pub delete_failed_namespaces: bool,
}

impl Default for AutoRetryConfig {
    fn default() -> Self {
        Self {
            attempts_parallel: 2,
            attempts_serial: 3,
            delete_failed_namespaces: true,
        }
    }
}

impl AutoRetryConfig {
    /// Replace every field that is set in `overrides`.
    #[must_use]
    pub fn overlay(self, overrides: &AutoRetryOverrides) -> Self {
        Self {
            attempts_parallel: overrides.attempts_parallel.unwrap_or(self.attempts_parallel),
            attempts_serial: overrides.attempts_serial.unwrap_or(self.attempts_serial),
            delete_failed_namespaces: overrides
                .delete_failed_namespaces
                .unwrap_or(self.delete_failed_namespaces),
        }
    }
}

/// Integration test definition for one operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorTest {
    /// Operator repository name, e.g. `kafka-operator`.
    pub id: String,
    /// Spec overrides for every platform.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<ClusterSpec>,
    /// Platforms this test runs on.
    #[serde(default)]
    pub platforms: Vec<OperatorTestPlatform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_retry: Option<AutoRetryOverrides>,
}

impl OperatorTest {
    /// The platform-specific definition for `platform_id`, if any.
    #[must_use]
    pub fn platform(&self, platform_id: &str) -> Option<&OperatorTestPlatform> {
        self.platforms.iter().find(|p| p.id == platform_id)
    }
}

/// Providers, platforms and operator tests.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Catalog {
    pub providers: Vec<Provider>,
    pub platforms: Vec<Platform>,
    pub operator_tests: Vec<OperatorTest>,
}

/// Merge `layer` into `base`: mappings are merged key-wise and recursively,
/// anything else is replaced.
fn merge_yaml(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Mapping(base), Value::Mapping(layer)) => {
            for (key, value) in layer {
                match base.get_mut(&key) {
                    Some(existing) => merge_yaml(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (_, Value::Null) => {}
        (base, layer) => *base = layer,
    }
}

/// Load one or more YAML files and deep-merge them in order.
///
/// # Errors
/// Returns an error if a file cannot be read or parsed.
pub fn load_layered<P: AsRef<Path>>(paths: &[P]) -> Result<Value, CatalogError> {
    let mut merged = Value::Null;

    for path in paths {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading YAML layer");
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let layer: Value = serde_yaml::from_str(&content).map_err(|source| CatalogError::Yaml {
            document: path.display().to_string(),
            source,
        })?;
        if merged.is_null() {
            merged = layer;
        } else {
            merge_yaml(&mut merged, layer);
        }
    }

    Ok(merged)
}

/// Deserialize a list, rejecting missing or empty lists.
fn read_list<T: for<'de> Deserialize<'de>>(
    value: Option<&Value>,
    document: &'static str,
    section: &'static str,
) -> Result<Vec<T>, CatalogError> {
    let value = match value {
        None | Some(Value::Null) => return Err(CatalogError::MissingSection { document, section }),
        Some(value) => value,
    };
    let list: Vec<T> = serde_yaml::from_value(value.clone()).map_err(|source| CatalogError::Yaml {
        document: document.to_string(),
        source,
    })?;
    if list.is_empty() {
        return Err(CatalogError::Empty { document, section });
    }
    Ok(list)
}

fn check_unique<'a>(
    ids: impl Iterator<Item = &'a str>,
    document: &'static str,
    kind: &'static str,
) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(CatalogError::DuplicateId {
                document,
                kind,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}

impl Catalog {
    /// Load and validate the catalog from the given files.
    ///
    /// # Errors
    /// Returns an error if a file cannot be read, a section is missing or
    /// empty, or the catalog is inconsistent.
    pub fn load<P: AsRef<Path>>(
        platforms_files: &[P],
        operator_tests_files: &[P],
    ) -> Result<Self, CatalogError> {
        let platforms = load_layered(platforms_files)?;
        let operator_tests = load_layered(operator_tests_files)?;
        Self::from_documents(&platforms, &operator_tests)
    }

    /// Build and validate the catalog from already parsed documents.
    ///
    /// # Errors
    /// Returns an error if a section is missing or empty, or the catalog is
    /// inconsistent.
    pub fn from_documents(platforms: &Value, operator_tests: &Value) -> Result<Self, CatalogError> {
        let providers: Vec<Provider> =
            read_list(platforms.get("providers"), PLATFORMS_DOCUMENT, "providers")?;
        let platform_list: Vec<Platform> =
            read_list(platforms.get("platforms"), PLATFORMS_DOCUMENT, "platforms")?;
        let operator_tests: Vec<OperatorTest> =
            read_list(Some(operator_tests), OPERATOR_TESTS_DOCUMENT, "tests")?;

        let catalog = Self {
            providers,
            platforms: platform_list,
            operator_tests,
        };
        catalog.validate()?;

        info!(
            "Read {} providers: [{}]",
            catalog.providers.len(),
            catalog.providers.iter().map(|p| p.id.as_str()).collect::<Vec<_>>().join(",")
        );
        info!(
            "Read {} platforms: [{}]",
            catalog.platforms.len(),
            catalog.platforms.iter().map(|p| p.id.as_str()).collect::<Vec<_>>().join(",")
        );
        info!(
            "Read {} operator tests: [{}]",
            catalog.operator_tests.len(),
            catalog
                .operator_tests
                .iter()
                .map(|t| t.id.as_str())
                .collect::<Vec<_>>()
                .join(",")
        );

        Ok(catalog)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        check_unique(self.providers.iter().map(|p| p.id.as_str()), PLATFORMS_DOCUMENT, "provider")?;
        check_unique(self.platforms.iter().map(|p| p.id.as_str()), PLATFORMS_DOCUMENT, "platform")?;
        check_unique(
            self.operator_tests.iter().map(|t| t.id.as_str()),
            OPERATOR_TESTS_DOCUMENT,
            "operator test",
        )?;

        for platform in &self.platforms {
            if platform.versions.is_empty() {
                return Err(CatalogError::NoVersions(platform.id.clone()));
            }
            if !self.providers.iter().any(|p| p.id == platform.provider) {
                return Err(CatalogError::UnknownProvider {
                    platform: platform.id.clone(),
                    provider: platform.provider.clone(),
                });
            }
        }
        Ok(())
    }

    /// Find a platform by id, falling back to its display name.
    #[must_use]
    pub fn find_platform(&self, id_or_name: &str) -> Option<&Platform> {
        self.platforms
            .iter()
            .find(|p| p.id == id_or_name)
            .or_else(|| self.platforms.iter().find(|p| p.name == id_or_name))
    }

    #[must_use]
    pub fn operator_test(&self, id: &str) -> Option<&OperatorTest> {
        self.operator_tests.iter().find(|t| t.id == id)
    }

    /// Resolve the cluster spec for an operator test on a platform.
    ///
    /// The result is the platform's base spec, overlaid by the operator
    /// test's spec, overlaid by the spec of the test's entry for that
    /// platform. Later layers replace whole keys.
    ///
    /// # Errors
    /// Returns an error if the platform or operator test does not exist, or
    /// the test is not defined for the platform.
    pub fn resolve_spec(&self, operator_test: &str, platform: &str) -> Result<ClusterSpec, CatalogError> {
        let platform_def = self
            .platforms
            .iter()
            .find(|p| p.id == platform)
            .ok_or_else(|| CatalogError::UnknownPlatform(platform.to_string()))?;

        let test = self
            .operator_test(operator_test)
            .ok_or_else(|| CatalogError::UnknownOperatorTest(operator_test.to_string()))?;

        let test_platform =
            test.platform(platform)
                .ok_or_else(|| CatalogError::PlatformNotDefinedForTest {
                    operator_test: operator_test.to_string(),
                    platform: platform.to_string(),
                })?;

        let mut spec = platform_def.spec.clone();
        if let Some(layer) = &test.spec {
            spec = spec.overlay(layer);
        }
        if let Some(layer) = &test_platform.spec {
            spec = spec.overlay(layer);
        }
        Ok(spec)
    }

    /// Test script configured for an operator, or [`DEFAULT_TEST_SCRIPT`].
    #[must_use]
    pub fn test_script(&self, operator_test: &str) -> &str {
        self.operator_test(operator_test)
            .and_then(|t| t.test_script.as_deref())
            .unwrap_or(DEFAULT_TEST_SCRIPT)
    }

    /// Auto-retry settings for an operator: defaults overlaid by the
    /// operator's overrides.
    #[must_use]
    pub fn auto_retry_config(&self, operator_test: &str) -> AutoRetryConfig {
        let defaults = AutoRetryConfig::default();
        match self.operator_test(operator_test).and_then(|t| t.auto_retry.as_ref()) {
            Some(overrides) => defaults.overlay(overrides),
            None => defaults,
        }
    }
}
