//! Package-level declarations: imports, functions, variables, constants.

use std::sync::Arc;

use gossa_diagnostic::{Diagnostic, ErrorCode};
use gossa_ir::ast::{Decl, FuncDecl, ValueSpec};
use rustc_hash::FxHashMap;

use super::{is_exported, Checker, FileImport, Mode, Object, SpecRef, SpecState};
use crate::{ConstValue, GlobalInfo, Member, PackageExports, Type};

impl Checker<'_> {
    pub(super) fn check_files(&mut self) {
        self.collect_imports();
        self.collect_objects();
        self.resolve_signatures();
        self.resolve_globals();
        self.check_bodies();
        self.report_unused_imports();
    }

    fn collect_imports(&mut self) {
        for file in self.files() {
            let mut bindings: FxHashMap<String, FileImport> = FxHashMap::default();
            for import in &file.imports {
                let Some(exports) = self.importer.import(&import.path) else {
                    self.error(
                        ErrorCode::E3001,
                        import.span,
                        format!("could not import {} (package not found)", import.path),
                    );
                    continue;
                };
                let name = match &import.name {
                    Some(ident) if ident.is_blank() => continue,
                    Some(ident) => ident.name.clone(),
                    None => exports.name.clone(),
                };
                if let Some(previous) = bindings.get(&name) {
                    let previous = previous.span;
                    self.diagnostics.push(
                        Diagnostic::error(ErrorCode::E2009)
                            .with_message(format!("{name} redeclared in this block"))
                            .with_label(import.span, "")
                            .with_secondary_label(previous, format!("other declaration of {name}")),
                    );
                    continue;
                }
                bindings.insert(
                    name,
                    FileImport {
                        exports,
                        span: import.span,
                        used: false,
                    },
                );
            }
            self.imports.push(bindings);
        }
    }

    fn declare_object(&mut self, name: &str, object: Object) {
        if name == "_" {
            return;
        }
        if let Some(previous) = self.objects.get(name) {
            let previous = previous.span();
            self.diagnostics.push(
                Diagnostic::error(ErrorCode::E2009)
                    .with_message(format!("{name} redeclared in this block"))
                    .with_label(object.span(), "")
                    .with_secondary_label(previous, format!("other declaration of {name}")),
            );
            return;
        }
        self.objects.insert(name.to_string(), object);
    }

    fn collect_objects(&mut self) {
        for (file_index, file) in self.files().iter().enumerate() {
            for (decl_index, decl) in file.decls.iter().enumerate() {
                match decl {
                    Decl::Func(func) => {
                        // `init` is never bound; any number may exist.
                        if func.name.name == "init" {
                            continue;
                        }
                        self.declare_object(
                            &func.name.name,
                            Object::Func {
                                name_id: func.name.id,
                                span: func.name.span,
                            },
                        );
                    }
                    Decl::Var(specs) => {
                        for (spec_index, spec) in specs.iter().enumerate() {
                            let spec_ref = SpecRef {
                                file: file_index,
                                decl: decl_index,
                                spec: spec_index,
                            };
                            for name in &spec.names {
                                if name.is_blank() {
                                    continue;
                                }
                                self.globals.push(GlobalInfo {
                                    name: name.name.clone(),
                                    ty: Type::Invalid,
                                    span: name.span,
                                });
                                self.declare_object(
                                    &name.name,
                                    Object::Var {
                                        spec: spec_ref,
                                        global: self.globals.len() - 1,
                                        ty: None,
                                        span: name.span,
                                    },
                                );
                            }
                        }
                    }
                    Decl::Const(specs) => {
                        for (spec_index, spec) in specs.iter().enumerate() {
                            let spec_ref = SpecRef {
                                file: file_index,
                                decl: decl_index,
                                spec: spec_index,
                            };
                            for name in &spec.names {
                                self.declare_object(
                                    &name.name,
                                    Object::Const {
                                        spec: spec_ref,
                                        value: None,
                                        span: name.span,
                                    },
                                );
                            }
                        }
                    }
                }
            }
        }
    }

    fn resolve_signatures(&mut self) {
        for (file_index, file) in self.files().iter().enumerate() {
            self.file = file_index;
            for decl in &file.decls {
                let Decl::Func(func) = decl else { continue };
                let sig = self.resolve_signature(&func.sig);
                let special = matches!(func.name.name.as_str(), "init")
                    || (func.name.name == "main" && self.name == "main");
                if special && !(sig.params.is_empty() && sig.results.is_empty()) {
                    self.error(
                        ErrorCode::E2011,
                        func.name.span,
                        format!(
                            "func {} must have no arguments and no return values",
                            func.name.name
                        ),
                    );
                }
                self.info.signatures.insert(func.name.id, Arc::new(sig));
            }
        }
        self.file = 0;
    }

    fn resolve_globals(&mut self) {
        for (file_index, file) in self.files().iter().enumerate() {
            for (decl_index, decl) in file.decls.iter().enumerate() {
                let count = match decl {
                    Decl::Var(specs) | Decl::Const(specs) => specs.len(),
                    Decl::Func(_) => 0,
                };
                for spec in 0..count {
                    self.resolve_spec(SpecRef {
                        file: file_index,
                        decl: decl_index,
                        spec,
                    });
                }
            }
        }
    }

    /// Check a package-level spec unless that already happened. Returns
    /// false when the spec is being checked further up the stack.
    pub(super) fn resolve_spec(&mut self, spec_ref: SpecRef) -> bool {
        match self.spec_state.get(&spec_ref) {
            Some(SpecState::Done) => return true,
            Some(SpecState::InProgress) => return false,
            None => {}
        }
        self.spec_state.insert(spec_ref, SpecState::InProgress);
        let saved = self.enter_package_level(spec_ref.file);
        let decl = &self.files()[spec_ref.file].decls[spec_ref.decl];
        match decl {
            Decl::Const(specs) => {
                let spec = &specs[spec_ref.spec];
                let values = self.const_spec(spec, spec_ref.spec as i128);
                for (name, value) in spec.names.iter().zip(values) {
                    self.info.types.insert(name.id, value.1.clone());
                    if let Some(Object::Const { spec: owner, value: slot, .. }) =
                        self.objects.get_mut(&name.name)
                    {
                        if *owner == spec_ref {
                            *slot = Some(value);
                        }
                    }
                }
            }
            Decl::Var(specs) => {
                let spec = &specs[spec_ref.spec];
                let types = self.var_spec(spec);
                for (name, ty) in spec.names.iter().zip(types) {
                    self.info.types.insert(name.id, ty.clone());
                    if let Some(Object::Var {
                        spec: owner,
                        global,
                        ty: slot,
                        ..
                    }) = self.objects.get_mut(&name.name)
                    {
                        if *owner == spec_ref {
                            self.globals[*global].ty = ty.clone();
                            *slot = Some(ty);
                        }
                    }
                }
            }
            Decl::Func(_) => {}
        }
        self.leave_package_level(saved);
        self.spec_state.insert(spec_ref, SpecState::Done);
        true
    }

    /// Check a `var` spec and return the type of each name.
    pub(super) fn var_spec(&mut self, spec: &ValueSpec) -> Vec<Type> {
        let declared = spec.ty.as_ref().map(|t| self.resolve_type(t));
        if spec.values.is_empty() {
            return vec![declared.unwrap_or(Type::Invalid); spec.names.len()];
        }
        let targets = vec![declared; spec.names.len()];
        self.assign_values(&spec.values, &targets, "variable declaration", spec.span)
    }

    /// Check a `const` spec and return the value and type of each name.
    pub(super) fn const_spec(&mut self, spec: &ValueSpec, iota: i128) -> Vec<(ConstValue, Type)> {
        let invalid = (ConstValue::Int(0), Type::Invalid);
        let declared = spec.ty.as_ref().map(|t| self.resolve_type(t));
        if let Some(ty) = &declared {
            if !matches!(ty, Type::Int(_) | Type::Bool | Type::String | Type::Invalid) {
                self.error(
                    ErrorCode::E2007,
                    spec.ty.as_ref().map_or(spec.span, |t| t.span),
                    format!("invalid constant type {ty}"),
                );
                return vec![invalid; spec.names.len()];
            }
        }

        let previous_iota = self.iota.replace(iota);
        let mut results = Vec::with_capacity(spec.names.len());
        for (i, name) in spec.names.iter().enumerate() {
            let Some(value) = spec.values.get(i) else {
                self.error(
                    ErrorCode::E2014,
                    name.span,
                    "missing init expr for const declaration",
                );
                results.push(invalid.clone());
                continue;
            };
            let mut op = self.single(value);
            if op.is_invalid() {
                results.push(invalid.clone());
                continue;
            }
            if op.const_value().is_none() {
                let text = self.describe(value, &op);
                self.error(ErrorCode::E2007, value.span, format!("{text} is not constant"));
                results.push(invalid.clone());
                continue;
            }
            if let Some(ty) = &declared {
                if !self.assign_to(value, &mut op, ty, "constant declaration") {
                    results.push(invalid.clone());
                    continue;
                }
            }
            match op.mode {
                Mode::Const(v) => results.push((v, op.ty)),
                _ => results.push(invalid.clone()),
            }
        }
        for extra in spec.values.iter().skip(spec.names.len()) {
            self.error(ErrorCode::E2014, extra.span, "extra init expr");
        }
        self.iota = previous_iota;
        results
    }

    fn check_bodies(&mut self) {
        for (file_index, file) in self.files().iter().enumerate() {
            self.file = file_index;
            for decl in &file.decls {
                if let Decl::Func(func) = decl {
                    self.func_decl(func);
                }
            }
        }
    }

    fn func_decl(&mut self, func: &FuncDecl) {
        let Some(sig) = self.info.signatures.get(&func.name.id).cloned() else {
            return;
        };
        let Some(body) = &func.body else {
            self.error(ErrorCode::E2007, func.name.span, "missing function body");
            return;
        };
        self.func_body(func.name.id, &func.sig, sig, body);
    }

    fn report_unused_imports(&mut self) {
        let mut unused = Vec::new();
        for (file, bindings) in self.imports.iter().enumerate() {
            for (name, import) in bindings {
                if import.used {
                    continue;
                }
                let written = &self.files()[file]
                    .imports
                    .iter()
                    .find(|i| i.span == import.span)
                    .and_then(|i| i.name.as_ref());
                let message = match written {
                    Some(alias) if alias.name != import.exports.name => {
                        format!("{:?} imported as {name} and not used", import.exports.path)
                    }
                    _ => format!("{:?} imported and not used", import.exports.path),
                };
                unused.push((import.span, message));
            }
        }
        unused.sort_by_key(|(span, _)| span.start);
        for (span, message) in unused {
            self.error(ErrorCode::E2004, span, message);
        }
    }

    pub(super) fn exports(&self) -> PackageExports {
        let mut members = FxHashMap::default();
        for (name, object) in &self.objects {
            if !is_exported(name) {
                continue;
            }
            let member = match object {
                Object::Func { name_id, .. } => match self.info.signatures.get(name_id) {
                    Some(sig) => Member::Func(Arc::clone(sig)),
                    None => continue,
                },
                Object::Var { ty, .. } => Member::Var(ty.clone().unwrap_or(Type::Invalid)),
                Object::Const { value, .. } => match value {
                    Some((v, ty)) => Member::Const(v.clone(), ty.clone()),
                    None => continue,
                },
            };
            members.insert(name.clone(), member);
        }
        PackageExports {
            path: self.path.to_string(),
            name: self.name.clone(),
            members,
            intrinsic: false,
        }
    }
}
