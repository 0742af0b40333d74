//! What to load and the loading pass itself.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use gossa_diagnostic::{render_all, Diagnostic, SourceMap};
use gossa_ir::ast::File;
use gossa_ir::NodeIdGen;
use gossa_parse::parse_file;
use gossa_types::{check_package, intrinsic_package, is_intrinsic, PackageExports};
use rustc_hash::FxHashMap;

use crate::{BuildContext, LoadError, LoadedPackage, LoadedProgram};

/// Import path of the package made from files named on the command line.
pub const CREATED_PACKAGE_PATH: &str = "command-line-arguments";

/// Packages to load: at most one package of named files plus import paths.
#[derive(Clone, Debug)]
pub struct Config {
    pub build: BuildContext,
    /// Files of the created package.
    pub created: Vec<PathBuf>,
    /// Import paths to load in addition to the created package's imports.
    pub imports: Vec<String>,
}

impl Config {
    pub fn new(build: BuildContext) -> Self {
        Config {
            build,
            created: Vec::new(),
            imports: Vec::new(),
        }
    }

    /// Interpret command-line arguments. If the first names a `.go` file,
    /// all of them must, and they form one created package; otherwise all
    /// are import paths. `_xtest` has no effect: test packages are never
    /// loaded.
    ///
    /// A relative file name that does not exist in the working directory is
    /// taken relative to the build root.
    pub fn from_args(build: BuildContext, args: &[String], _xtest: bool) -> Result<Config, LoadError> {
        let Some(first) = args.first() else {
            return Err(LoadError::NoArgs);
        };
        let mut config = Config::new(build);
        if first.ends_with(".go") {
            for arg in args {
                if !arg.ends_with(".go") {
                    return Err(LoadError::MixedArgs { arg: arg.clone() });
                }
                let path = Path::new(arg);
                let path = if path.is_absolute() || path.exists() {
                    path.to_path_buf()
                } else {
                    config.build.root.join(path)
                };
                config.created.push(path);
            }
        } else {
            config.imports.extend(args.iter().cloned());
        }
        Ok(config)
    }

    /// Add an import path to load.
    pub fn import(&mut self, path: impl Into<String>) {
        let path = path.into();
        if !self.imports.contains(&path) {
            self.imports.push(path);
        }
    }

    /// Parse, resolve and check everything the configuration names.
    #[tracing::instrument(level = "debug", skip(self), fields(created = self.created.len(), imports = ?self.imports))]
    pub fn load(&self) -> Result<LoadedProgram, LoadError> {
        let mut loader = Loader {
            build: &self.build,
            map: SourceMap::new(),
            ids: NodeIdGen::new(),
            parsed: FxHashMap::default(),
            order: Vec::new(),
            exports: FxHashMap::default(),
        };

        let created = if self.created.is_empty() {
            None
        } else {
            let files = loader.parse_files(CREATED_PACKAGE_PATH, &self.created, "")?;
            Some(files)
        };

        // Resolve everything reachable, depth first.
        let mut stack = Vec::new();
        if let Some(created) = &created {
            for import in &created.imports {
                loader.resolve(import, &mut stack)?;
            }
        }
        for import in &self.imports {
            loader.resolve(import, &mut stack)?;
        }

        let mut packages: Vec<Arc<LoadedPackage>> = Vec::new();
        for path in std::mem::take(&mut loader.order) {
            let package = loader.check(&path)?;
            loader.exports.insert(path, Arc::clone(package.exports()));
            packages.push(Arc::new(package));
        }
        let mut created_packages = Vec::new();
        if let Some(created) = created {
            let package = Arc::new(loader.check_parsed(created)?);
            packages.push(Arc::clone(&package));
            created_packages.push(package);
        }

        let imported = packages
            .iter()
            .filter(|p| p.path != CREATED_PACKAGE_PATH)
            .map(|p| (p.path.clone(), Arc::clone(p)))
            .collect();
        tracing::debug!(packages = packages.len(), "loaded program");
        Ok(LoadedProgram {
            build: self.build.clone(),
            packages,
            created: created_packages,
            imported,
            source_map: loader.map,
        })
    }
}

/// Files of one package, parsed but not yet checked.
struct ParsedPackage {
    path: String,
    name: String,
    files: Vec<File>,
    file_names: Vec<String>,
    imports: Vec<String>,
}

enum Entry {
    /// On the resolution stack.
    Visiting,
    Intrinsic(Arc<PackageExports>),
    Source(ParsedPackage),
    Checked,
}

struct Loader<'a> {
    build: &'a BuildContext,
    map: SourceMap,
    ids: NodeIdGen,
    parsed: FxHashMap<String, Entry>,
    /// Import paths in dependency order.
    order: Vec<String>,
    exports: FxHashMap<String, Arc<PackageExports>>,
}

impl Loader<'_> {
    fn resolve(&mut self, path: &str, stack: &mut Vec<String>) -> Result<(), LoadError> {
        match self.parsed.get(path) {
            Some(Entry::Visiting) => {
                let start = stack.iter().position(|p| p == path).unwrap_or(0);
                let mut chain: Vec<String> = stack[start..].to_vec();
                chain.push(path.to_string());
                return Err(LoadError::ImportCycle { chain });
            }
            Some(_) => return Ok(()),
            None => {}
        }

        if is_intrinsic(path) {
            if let Some(exports) =
                intrinsic_package(path, &self.build.goos, &self.build.goarch)
            {
                self.parsed.insert(path.to_string(), Entry::Intrinsic(exports));
                self.order.push(path.to_string());
                return Ok(());
            }
        }

        let dir = self.find_dir(path)?;
        let files = self.package_files(&dir)?;
        self.parsed.insert(path.to_string(), Entry::Visiting);
        stack.push(path.to_string());
        let package = self.parse_files(path, &files, &dir.display().to_string())?;
        for import in &package.imports {
            self.resolve(import, stack)?;
        }
        stack.pop();
        self.parsed.insert(path.to_string(), Entry::Source(package));
        self.order.push(path.to_string());
        Ok(())
    }

    fn find_dir(&self, path: &str) -> Result<PathBuf, LoadError> {
        let candidates = self.build.candidate_dirs(path);
        if let Some(dir) = candidates.iter().find(|d| d.is_dir()) {
            return Ok(dir.clone());
        }
        let searched = candidates
            .iter()
            .map(|d| format!("\t{}", d.display()))
            .collect::<Vec<_>>()
            .join("\n");
        Err(LoadError::ImportNotFound {
            path: path.to_string(),
            searched,
        })
    }

    /// The `.go` files of a package directory that take part in the build,
    /// sorted by name.
    fn package_files(&self, dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
        let io = |source| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io)? {
            let entry = entry.map_err(io)?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.ends_with(".go") {
                continue;
            }
            let source = read(&path)?;
            if self.build.match_file(name, &source) {
                files.push(path);
            } else {
                tracing::debug!(file = %path.display(), "excluded by build constraints");
            }
        }
        if files.is_empty() {
            return Err(LoadError::NoGoFiles {
                dir: dir.to_path_buf(),
            });
        }
        files.sort();
        Ok(files)
    }

    fn parse_files(&mut self, path: &str, files: &[PathBuf], dir: &str) -> Result<ParsedPackage, LoadError> {
        let mut parsed = Vec::with_capacity(files.len());
        let mut names = Vec::with_capacity(files.len());
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let mut package: Option<(String, String)> = None;
        for file in files {
            let source = read(file)?;
            let name = file.display().to_string();
            let base = self.map.add(name.clone(), source.as_str());
            let out = parse_file(&source, base, &mut self.ids);
            diagnostics.extend(out.diagnostics);
            let Some(ast) = out.file else { continue };
            match &package {
                None => package = Some((ast.package.name.clone(), name.clone())),
                Some((first, first_file)) if *first != ast.package.name => {
                    return Err(LoadError::MultiplePackages {
                        dir: dir.to_string(),
                        first: first.clone(),
                        first_file: first_file.clone(),
                        second: ast.package.name.clone(),
                        second_file: name,
                    });
                }
                Some(_) => {}
            }
            parsed.push(ast);
            names.push(name);
        }
        if !diagnostics.is_empty() {
            return Err(LoadError::Parse(render(&self.map, &diagnostics)));
        }

        let mut imports: Vec<String> = parsed
            .iter()
            .flat_map(|f| f.imports.iter().map(|i| i.path.clone()))
            .collect();
        imports.sort();
        imports.dedup();
        Ok(ParsedPackage {
            path: path.to_string(),
            name: package.map(|(name, _)| name).unwrap_or_default(),
            files: parsed,
            file_names: names,
            imports,
        })
    }

    fn check(&mut self, path: &str) -> Result<LoadedPackage, LoadError> {
        match self.parsed.insert(path.to_string(), Entry::Checked) {
            Some(Entry::Intrinsic(exports)) => Ok(LoadedPackage::intrinsic(exports)),
            Some(Entry::Source(parsed)) => self.check_parsed(parsed),
            _ => Err(LoadError::ImportNotFound {
                path: path.to_string(),
                searched: String::new(),
            }),
        }
    }

    fn check_parsed(&mut self, parsed: ParsedPackage) -> Result<LoadedPackage, LoadError> {
        let output = check_package(
            &parsed.path,
            &parsed.files,
            &self.exports,
            self.build.sizes(),
        );
        if output.has_errors() {
            return Err(LoadError::Type(render(&self.map, &output.diagnostics)));
        }
        tracing::debug!(package = %parsed.path, files = parsed.files.len(), "checked");
        Ok(LoadedPackage {
            path: parsed.path,
            name: parsed.name,
            files: parsed.files,
            file_names: parsed.file_names,
            imports: parsed.imports,
            info: output.package,
        })
    }
}

fn read(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn render(map: &SourceMap, diagnostics: &[Diagnostic]) -> String {
    render_all(map, diagnostics).trim_end().to_string()
}
