//! The result of loading: checked packages in dependency order.

use std::sync::Arc;

use gossa_diagnostic::SourceMap;
use gossa_ir::ast::File;
use gossa_types::{PackageExports, PackageInfo};
use rustc_hash::FxHashMap;

use crate::BuildContext;

/// One type-checked package. Intrinsic packages have no files.
#[derive(Debug)]
pub struct LoadedPackage {
    pub path: String,
    pub name: String,
    pub files: Vec<File>,
    /// Paths of the files, parallel to `files`.
    pub file_names: Vec<String>,
    /// Direct imports, sorted.
    pub imports: Vec<String>,
    pub info: PackageInfo,
}

impl LoadedPackage {
    pub fn is_intrinsic(&self) -> bool {
        self.info.exports.intrinsic
    }

    pub fn exports(&self) -> &Arc<PackageExports> {
        &self.info.exports
    }

    /// An intrinsic package as the checker sees it.
    pub(crate) fn intrinsic(exports: Arc<PackageExports>) -> Self {
        LoadedPackage {
            path: exports.path.clone(),
            name: exports.name.clone(),
            files: Vec::new(),
            file_names: Vec::new(),
            imports: Vec::new(),
            info: PackageInfo {
                path: exports.path.clone(),
                name: exports.name.clone(),
                info: gossa_types::TypeInfo::default(),
                globals: Vec::new(),
                funcs: FxHashMap::default(),
                exports,
            },
        }
    }
}

/// An immutable, fully checked program.
#[derive(Debug)]
pub struct LoadedProgram {
    pub build: BuildContext,
    /// Every package, dependencies before their importers.
    pub packages: Vec<Arc<LoadedPackage>>,
    /// Packages made from named files (at most one).
    pub created: Vec<Arc<LoadedPackage>>,
    /// Packages loaded by import path, including transitive imports.
    pub imported: FxHashMap<String, Arc<LoadedPackage>>,
    pub source_map: SourceMap,
}

impl LoadedProgram {
    pub fn package(&self, path: &str) -> Option<&Arc<LoadedPackage>> {
        self.packages.iter().find(|p| p.path == path)
    }
}
