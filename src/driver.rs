//! Driver that orchestrates the compilation pipeline.

use tracing::debug;

use crate::ast::{Package, PackageId};
use crate::codegen::TranslationUnit;
use crate::config::{Arch, Config};
use crate::diagnostics::{Diagnostic, DiagnosticReporter, MessageKey};
use crate::semantic::{Checker, DefinitionMap};
use crate::types::Lattice;

/// The compilation driver.
///
/// Holds the target configuration, the already parsed dependency packages
/// and the source text used to annotate diagnostics.
#[derive(Debug, Default)]
pub struct Driver {
    config: Config,
    dependencies: Vec<Package>,
    sources: Vec<(String, String)>,
}

impl Driver {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            dependencies: Vec::new(),
            sources: Vec::new(),
        }
    }

    pub fn set_arch(&mut self, arch: Arch) {
        self.config.arch = arch;
    }

    pub fn set_prelude(&mut self, prelude: impl Into<String>) {
        self.config.set_prelude(prelude);
    }

    /// Register a package the main package may `use`.
    pub fn add_dependency(&mut self, package: Package) {
        self.dependencies.push(package);
    }

    /// Register source text so diagnostics in `file` show their line.
    pub fn add_source(&mut self, file: impl Into<String>, source: impl Into<String>) {
        self.sources.push((file.into(), source.into()));
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Check `package` with its dependencies and render one C++ translation unit.
    ///
    /// Dependencies are checked first and see each other through a shared
    /// side map; the main package sees only the packages it uses.
    pub fn compile(&self, package: &Package) -> Result<String, Vec<Diagnostic>> {
        let mut reporter = DiagnosticReporter::new();
        for (file, source) in &self.sources {
            reporter.add_source(file, source);
        }
        let lattice = Lattice::new(self.config.arch);

        // === Definition collection ===
        let mut shared = DefinitionMap::new();
        let mut used = DefinitionMap::new();
        let mut dep_maps: Vec<DefinitionMap> = self
            .dependencies
            .iter()
            .map(|dep| DefinitionMap::collect(dep, &mut reporter))
            .collect();
        for map in &dep_maps {
            shared.merge(map);
        }

        let mut merged: Vec<&PackageId> = Vec::new();
        for file in &package.files {
            for use_decl in &file.uses {
                if merged.contains(&&use_decl.package) {
                    continue;
                }
                let found = self
                    .dependencies
                    .iter()
                    .zip(&dep_maps)
                    .find(|(dep, _)| dep.id == use_decl.package);
                match found {
                    Some((dep, map)) => {
                        used.merge(map);
                        merged.push(&dep.id);
                    }
                    None => reporter.report(
                        MessageKey::IdNoexist,
                        &use_decl.pos,
                        [use_decl.package.as_str()],
                    ),
                }
            }
        }
        for map in &mut dep_maps {
            map.set_side(&shared);
        }
        let mut main_map = DefinitionMap::collect(package, &mut reporter);
        main_map.set_side(&used);
        debug!(
            package = %package.id,
            dependencies = self.dependencies.len(),
            used = merged.len(),
            "definitions collected"
        );

        // === Semantic analysis and lowering ===
        let mut unit = TranslationUnit::new();
        for (dep, map) in self.dependencies.iter().zip(&dep_maps) {
            let mut checker = Checker::new(map, &mut reporter, lattice, dep.id.clone());
            unit.extend(checker.check_package());
        }
        {
            let mut checker = Checker::new(&main_map, &mut reporter, lattice, package.id.clone());
            unit.extend(checker.check_package());
        }

        if reporter.has_errors() {
            debug!(errors = reporter.error_count(), "compilation failed");
            return Err(reporter.take_diagnostics());
        }

        // === Code generation ===
        let output = unit.render(&self.config.prelude);
        debug!(bytes = output.len(), "translation unit rendered");
        Ok(output)
    }
}
