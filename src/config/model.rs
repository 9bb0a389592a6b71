//! Serde model for the `[tool.reqtrace]` manifest section.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::base::{resolve_under_root, validate_origin_tag};
use crate::generate::{WriteMode, WriteRules};
use crate::mapping::DEFAULT_ENV;
use crate::scope::UnreachableMode;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read manifest {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse manifest {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml_edit::de::Error,
    },
    #[error("manifest {path:?} has no [tool.reqtrace] section")]
    MissingSection { path: PathBuf },
    #[error("invalid configuration: {reason}")]
    Invalid { reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }
}

fn default_env() -> String {
    DEFAULT_ENV.to_owned()
}

fn default_root() -> String {
    "..".to_owned()
}

fn default_true() -> bool {
    true
}

/// Accept either a single string or a list of strings.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

/// Per-output overrides of the default write rules.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WriteRulesCfg {
    pub builtin: Option<WriteMode>,
    pub start_scope: Option<WriteMode>,
    pub lazy: Option<WriteMode>,
}

impl WriteRulesCfg {
    pub fn set_defaults(&mut self, defaults: &WriteRulesCfg) {
        if self.builtin.is_none() {
            self.builtin = defaults.builtin;
        }
        if self.start_scope.is_none() {
            self.start_scope = defaults.start_scope;
        }
        if self.lazy.is_none() {
            self.lazy = defaults.lazy;
        }
    }

    pub fn to_rules(&self) -> WriteRules {
        let fallback = WriteRules::default();
        WriteRules {
            builtin: self.builtin.unwrap_or(fallback.builtin),
            start_scope: self.start_scope.unwrap_or(fallback.start_scope),
            lazy: self.lazy.unwrap_or(fallback.lazy),
        }
    }
}

/// A version entry: either a bare requirement string or a table that also
/// controls which imports the requirement claims.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum VersionCfg {
    Requirement(String),
    Detailed(VersionTable),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VersionTable {
    /// The pip-style requirement specifier, e.g. `numpy>=1.21`.
    pub requirement: String,
    /// Glob over import paths claimed by the requirement.
    #[serde(rename = "import")]
    pub import_glob: Option<String>,
    /// Name of a scope whose modules are claimed by the requirement.
    pub scope: Option<String>,
    #[serde(default = "default_env")]
    pub env: String,
}

impl VersionCfg {
    /// Normalize to table form, deriving the default import glob
    /// `<package>.*` when neither an import nor a scope was given.
    pub fn normalize(&self) -> Result<VersionTable, ConfigError> {
        let mut table = match self {
            VersionCfg::Requirement(requirement) => VersionTable {
                requirement: requirement.clone(),
                import_glob: None,
                scope: None,
                env: default_env(),
            },
            VersionCfg::Detailed(table) => table.clone(),
        };
        if validate_origin_tag(&table.env).is_err() {
            return Err(ConfigError::invalid(format!(
                "version env must be a valid identifier (hyphens allowed), got: {:?}",
                table.env
            )));
        }
        match (&table.import_glob, &table.scope) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::invalid(format!(
                    "cannot specify both scope and import for requirement {:?}",
                    table.requirement
                )));
            }
            (None, None) => {
                table.import_glob = Some(format!("{}.*", table.package()));
            }
            _ => {}
        }
        Ok(table)
    }
}

impl VersionTable {
    /// The distribution name at the front of the requirement specifier.
    pub fn package(&self) -> &str {
        let spec = self.requirement.trim_start();
        let end = spec
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
            .unwrap_or(spec.len());
        &spec[..end]
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScopeCfg {
    /// Unique across all scopes and subscopes.
    pub name: String,
    /// Previously defined scopes merged in before anything else.
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub search_paths: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub pkg_paths: Vec<String>,
    // limit applies before exclude, which lets a band of modules be cut:
    // limit=foo.bar with exclude=foo.bar.baz keeps the rest of foo.bar
    #[serde(default, deserialize_with = "one_or_many")]
    pub limit: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub exclude: Vec<String>,
    /// Subscope name to import-path root.
    #[serde(default)]
    pub subscopes: IndexMap<String, String>,
    #[serde(default)]
    pub unreachable: UnreachableMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputMode {
    /// A standalone requirements.txt-style file.
    Requirements,
    /// The `project.dependencies` array of a pyproject.toml.
    Dependencies,
    /// A named array under `project.optional-dependencies`.
    OptionalDependencies,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputCfg {
    pub scope: String,
    pub start_scope: Option<String>,
    #[serde(default)]
    pub skip_lazy: bool,
    #[serde(default = "default_env")]
    pub env: String,
    #[serde(default)]
    pub write_rules: WriteRulesCfg,
    pub output_mode: OutputMode,
    pub output_file: Option<String>,
    pub output_name: Option<String>,
}

impl OutputCfg {
    /// Display and uniqueness name: explicit name, else the start scope,
    /// else the scope.
    pub fn name(&self) -> &str {
        self.output_name
            .as_deref()
            .or(self.start_scope.as_deref())
            .unwrap_or(&self.scope)
    }
}

/// The `[tool.reqtrace]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReqtraceCfg {
    /// Root all relative paths resolve against, itself relative to the
    /// manifest's parent directory.
    #[serde(default = "default_root")]
    pub default_root: String,
    #[serde(default)]
    pub default_write_rules: WriteRulesCfg,
    #[serde(default = "default_true")]
    pub strict_requirements_map: bool,
    #[serde(default)]
    pub versions: Vec<VersionCfg>,
    #[serde(default)]
    pub scopes: Vec<ScopeCfg>,
    #[serde(default)]
    pub resolvers: Vec<OutputCfg>,
    /// Absolute path of the resolved default root, set after loading.
    #[serde(skip)]
    pub root: PathBuf,
    /// Absolute path of the manifest, set after loading.
    #[serde(skip)]
    pub manifest_path: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ManifestDoc {
    #[serde(default)]
    pub tool: ToolSection,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ToolSection {
    pub reqtrace: Option<ReqtraceCfg>,
}

impl ReqtraceCfg {
    /// Load, validate and resolve the configuration from a pyproject-style
    /// manifest.
    pub fn from_manifest(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let doc: ManifestDoc =
            toml_edit::de::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let mut cfg = doc
            .tool
            .reqtrace
            .ok_or_else(|| ConfigError::MissingSection {
                path: path.to_path_buf(),
            })?;
        cfg.validate()?;
        cfg.apply_defaults(path);
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if Path::new(&self.default_root).is_absolute() {
            return Err(ConfigError::invalid(format!(
                "default_root must be a relative path, got: {:?}",
                self.default_root
            )));
        }

        let mut scope_names: FxHashSet<&str> = FxHashSet::default();
        for scope in &self.scopes {
            if !scope_names.insert(&scope.name) {
                return Err(ConfigError::invalid(format!(
                    "scope name {:?} is not unique",
                    scope.name
                )));
            }
        }
        for scope in &self.scopes {
            for subscope in scope.subscopes.keys() {
                if !scope_names.insert(subscope) {
                    return Err(ConfigError::invalid(format!(
                        "subscope name {subscope:?} is not unique"
                    )));
                }
            }
        }

        let mut package_envs: FxHashSet<(String, String)> = FxHashSet::default();
        for version in &self.versions {
            let table = version.normalize()?;
            let key = (table.package().to_owned(), table.env.clone());
            if !package_envs.insert(key) {
                return Err(ConfigError::invalid(format!(
                    "requirement {:?} and env {:?} combination is defined multiple times",
                    table.package(),
                    table.env
                )));
            }
            if let Some(scope) = &table.scope {
                if !scope_names.contains(scope.as_str()) {
                    return Err(ConfigError::invalid(format!(
                        "version scope {scope:?} does not exist"
                    )));
                }
            }
        }

        let mut output_names: FxHashSet<&str> = FxHashSet::default();
        for output in &self.resolvers {
            if !output_names.insert(output.name()) {
                return Err(ConfigError::invalid(format!(
                    "output name {:?} is not unique",
                    output.name()
                )));
            }
            if !scope_names.contains(output.scope.as_str()) {
                return Err(ConfigError::invalid(format!(
                    "output scope {:?} does not exist",
                    output.scope
                )));
            }
            if let Some(start_scope) = &output.start_scope {
                if !scope_names.contains(start_scope.as_str()) {
                    return Err(ConfigError::invalid(format!(
                        "output start_scope {start_scope:?} does not exist"
                    )));
                }
            }
            if output.output_mode == OutputMode::Requirements && output.output_file.is_none() {
                return Err(ConfigError::invalid(format!(
                    "output {:?} with output_mode \"requirements\" needs an output_file",
                    output.name()
                )));
            }
        }
        Ok(())
    }

    /// Resolve the default root against the manifest location, fill in
    /// per-output write-rule defaults and default output files.
    fn apply_defaults(&mut self, manifest_path: &Path) {
        let manifest_dir = manifest_path.parent().unwrap_or(Path::new("."));
        self.manifest_path = manifest_path.to_path_buf();
        self.root = resolve_under_root(manifest_dir, Path::new(&self.default_root));
        for output in &mut self.resolvers {
            output.write_rules.set_defaults(&self.default_write_rules);
        }
    }

    /// Resolve a configured path against the default root.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        resolve_under_root(&self.root, Path::new(path))
    }

    /// The file an output writes to; TOML outputs default to the manifest.
    pub fn output_file(&self, output: &OutputCfg) -> PathBuf {
        match &output.output_file {
            Some(file) => self.resolve_path(file),
            None => self.manifest_path.clone(),
        }
    }
}
