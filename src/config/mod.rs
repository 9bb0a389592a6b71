//! Manifest-driven orchestration: load config, build scopes, write outputs.

mod model;

use std::path::Path;

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::error::Error;
use crate::imports::ImportCache;
use crate::mapping::{ImportGlob, ImportMatcher, RequirementsMapper};
use crate::output::{TxtOptions, write_requirements_txt, write_toml_array};
use crate::scope::{ModuleScope, RestrictMode, RestrictOp};

pub use model::{
    ConfigError, OutputCfg, OutputMode, ReqtraceCfg, ScopeCfg, VersionCfg, VersionTable,
    WriteRulesCfg,
};

impl ReqtraceCfg {
    /// Build every configured scope and subscope, in definition order.
    ///
    /// Parents must be defined before the scopes that reference them, so a
    /// single pass suffices.
    pub fn load_scopes(&self) -> Result<IndexMap<String, ModuleScope>, Error> {
        let mut loaded: IndexMap<String, ModuleScope> = IndexMap::new();
        for scope_cfg in &self.scopes {
            let mut scope = ModuleScope::new();
            for parent in &scope_cfg.parents {
                let parent_scope = loaded.get(parent).ok_or_else(|| {
                    ConfigError::invalid(format!(
                        "parent scope {parent:?} of {:?} has not been defined yet, \
                         is the order of definitions correct?",
                        scope_cfg.name
                    ))
                })?;
                scope.merge(parent_scope)?;
            }
            for path in &scope_cfg.search_paths {
                scope.add_from_search_path(
                    &self.resolve_path(path),
                    Some(&scope_cfg.name),
                    scope_cfg.unreachable,
                )?;
            }
            for path in &scope_cfg.pkg_paths {
                scope.add_from_package_path(
                    &self.resolve_path(path),
                    Some(&scope_cfg.name),
                    scope_cfg.unreachable,
                )?;
            }
            if !scope_cfg.limit.is_empty() {
                scope = scope.restrict(&scope_cfg.limit, RestrictMode::Children, RestrictOp::Limit)?;
            }
            if !scope_cfg.exclude.is_empty() {
                scope =
                    scope.restrict(&scope_cfg.exclude, RestrictMode::Children, RestrictOp::Exclude)?;
            }
            debug!(scope = %scope_cfg.name, modules = scope.len(), "loaded scope");
            for (subscope_name, import_root) in &scope_cfg.subscopes {
                let subscope = scope.restrict(
                    std::slice::from_ref(import_root),
                    RestrictMode::Children,
                    RestrictOp::Limit,
                )?;
                debug!(scope = %subscope_name, modules = subscope.len(), "loaded subscope");
                loaded.insert(subscope_name.clone(), subscope);
            }
            loaded.insert(scope_cfg.name.clone(), scope);
        }
        Ok(loaded)
    }

    /// Build the requirements mapper from the configured versions.
    pub fn build_mapper(
        &self,
        scopes: &IndexMap<String, ModuleScope>,
    ) -> Result<RequirementsMapper, Error> {
        let mut mapper = RequirementsMapper::new(self.strict_requirements_map);
        for version in &self.versions {
            let table = version.normalize()?;
            let matcher = match (&table.scope, &table.import_glob) {
                (Some(scope), _) => {
                    let scope = scopes.get(scope).ok_or_else(|| {
                        ConfigError::invalid(format!("version scope {scope:?} does not exist"))
                    })?;
                    ImportMatcher::Scope(scope.clone())
                }
                (None, Some(glob)) => ImportMatcher::Glob(ImportGlob::new(glob)?),
                // normalize always fills in one of the two
                (None, None) => continue,
            };
            mapper.add_matcher(&table.env, &table.requirement, matcher);
        }
        Ok(mapper)
    }

    /// Generate and write every configured output.
    pub fn write_outputs(
        &self,
        scopes: &IndexMap<String, ModuleScope>,
        mapper: &mut RequirementsMapper,
        cache: &mut ImportCache,
    ) -> Result<(), Error> {
        for output in &self.resolvers {
            let scope = &scopes[&output.scope];
            let start = output.start_scope.as_ref().map(|name| &scopes[name]);
            let requirements = crate::generate::generate_requirements(
                scope,
                start,
                mapper,
                &output.env,
                &output.write_rules.to_rules(),
                output.skip_lazy,
                cache,
            )?;
            let file = self.output_file(output);
            match output.output_mode {
                OutputMode::Requirements => {
                    write_requirements_txt(&file, &requirements, TxtOptions::default())?;
                }
                OutputMode::Dependencies => {
                    write_toml_array(&file, &["project", "dependencies"], &requirements)?;
                }
                OutputMode::OptionalDependencies => {
                    write_toml_array(
                        &file,
                        &["project", "optional-dependencies", output.name()],
                        &requirements,
                    )?;
                }
            }
            info!(
                output = output.name(),
                requirements = requirements.len(),
                file = %file.display(),
                "wrote output"
            );
        }
        Ok(())
    }
}

/// Load a manifest and write all of its configured outputs.
pub fn run(manifest: &Path) -> Result<(), Error> {
    let cfg = ReqtraceCfg::from_manifest(manifest)?;
    let scopes = cfg.load_scopes()?;
    let mut mapper = cfg.build_mapper(&scopes)?;
    let mut cache = ImportCache::new();
    cfg.write_outputs(&scopes, &mut mapper, &mut cache)
}
