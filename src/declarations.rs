/// Declaration collection.
///
/// Turns a parsed [`Program`] into the registry entries it declares:
/// classes (and traits and enums), interfaces and free functions, each
/// qualified with the namespace it was declared in.  Type hints are
/// resolved against the file's `use` imports while collecting, and
/// `self`/`static` in return types are bound to the declaring class.
use std::sync::Arc;

use crate::ast::*;
use crate::types::{
    ClassDef, ConstantDef, FunctionDef, MethodDef, NameContext, ParameterInfo, PropertyDef, Types,
};

/// Everything one file declares.
#[derive(Debug, Default)]
pub struct FileDeclarations {
    pub names: NameContext,
    pub classes: Vec<ClassDef>,
    pub interfaces: Vec<ClassDef>,
    pub functions: Vec<FunctionDef>,
}

/// Namespace and imports of a file.
///
/// The first namespace declaration names the file's namespace; imports are
/// gathered from every `use` statement.
pub fn name_context(program: &Program) -> NameContext {
    let mut names = NameContext::default();
    collect_names(&program.statements, &mut names);
    names
}

fn collect_names(statements: &[Stmt], names: &mut NameContext) {
    for stmt in statements {
        match &stmt.kind {
            StmtKind::Namespace(ns) => {
                if names.namespace.is_none() {
                    names.namespace = ns.name.clone().filter(|n| !n.is_empty());
                }
                collect_names(&ns.statements, names);
            }
            StmtKind::Use(items) => {
                for item in items {
                    let local = item.local_name().to_string();
                    match item.kind {
                        UseKind::Class => {
                            names.uses.insert(local, item.name.clone());
                        }
                        UseKind::Function => {
                            names.function_uses.insert(local, item.name.clone());
                        }
                        UseKind::Const => {}
                    }
                }
            }
            _ => {}
        }
    }
}

pub fn collect(program: &Program) -> FileDeclarations {
    let names = name_context(program);
    let mut out = FileDeclarations {
        names: names.clone(),
        ..Default::default()
    };
    collect_statements(&program.statements, &Arc::new(names), &mut out);
    out
}

fn collect_statements(statements: &[Stmt], names: &Arc<NameContext>, out: &mut FileDeclarations) {
    for stmt in statements {
        match &stmt.kind {
            StmtKind::Namespace(ns) => {
                let ns_name = ns.name.clone().filter(|n| !n.is_empty());
                if ns_name != names.namespace {
                    let mut scoped = (**names).clone();
                    scoped.namespace = ns_name;
                    collect_statements(&ns.statements, &Arc::new(scoped), out);
                } else {
                    collect_statements(&ns.statements, names, out);
                }
            }
            StmtKind::Function(func) => {
                out.functions.push(function_def(func, stmt.from.clone(), names));
            }
            StmtKind::Class(class) => {
                out.classes.push(class_def(class, stmt.from.clone(), names));
            }
            StmtKind::Interface(iface) => {
                out.interfaces
                    .push(interface_def(iface, stmt.from.clone(), names));
            }
            // Conditional declarations such as
            //   if (!function_exists('helper')) { function helper() {} }
            StmtKind::Block(body) => collect_statements(body, names, out),
            StmtKind::If(if_stmt) => {
                collect_statements(&if_stmt.then_branch, names, out);
                for else_if in &if_stmt.else_ifs {
                    collect_statements(&else_if.body, names, out);
                }
                if let Some(else_branch) = &if_stmt.else_branch {
                    collect_statements(else_branch, names, out);
                }
            }
            _ => {}
        }
    }
}

fn function_def(func: &FunctionDecl, from: Option<Span>, names: &Arc<NameContext>) -> FunctionDef {
    let resolve = |n: &str| names.resolve_class(n);
    FunctionDef {
        name: names.qualify(&func.name),
        from,
        parameters: parameters(&func.params, &resolve),
        return_hint: func.return_hint.clone(),
        return_type: func
            .return_hint
            .as_deref()
            .and_then(|h| Types::from_hint(h, &resolve)),
        body: Arc::from(func.body.clone()),
        names: names.clone(),
    }
}

fn parameters(params: &[Param], resolve: &dyn Fn(&str) -> String) -> Vec<ParameterInfo> {
    params
        .iter()
        .map(|p| ParameterInfo {
            name: p.name.clone(),
            type_hint: p.hint.clone(),
            ty: p.hint.as_deref().and_then(|h| Types::from_hint(h, resolve)),
            is_required: p.default.is_none() && !p.variadic,
            is_variadic: p.variadic,
            is_reference: p.by_ref,
        })
        .collect()
}

fn class_def(class: &ClassDecl, from: Option<Span>, names: &Arc<NameContext>) -> ClassDef {
    let fqn = names.qualify(&class.name);
    let parent = class.extends.as_deref().map(|p| names.resolve_class(p));
    let mut def = ClassDef {
        name: fqn,
        kind: class.kind,
        from,
        parent,
        interfaces: class
            .implements
            .iter()
            .map(|i| names.resolve_class(i))
            .collect(),
        traits: Vec::new(),
        methods: Vec::new(),
        properties: Vec::new(),
        constants: Vec::new(),
        names: names.clone(),
    };
    fill_members(&mut def, &class.members);
    def
}

fn interface_def(iface: &InterfaceDecl, from: Option<Span>, names: &Arc<NameContext>) -> ClassDef {
    let extends: Vec<String> = iface
        .extends
        .iter()
        .map(|i| names.resolve_class(i))
        .collect();
    let mut def = ClassDef {
        name: names.qualify(&iface.name),
        kind: ClassKind::Interface,
        from,
        parent: extends.first().cloned(),
        interfaces: extends,
        traits: Vec::new(),
        methods: Vec::new(),
        properties: Vec::new(),
        constants: Vec::new(),
        names: names.clone(),
    };
    fill_members(&mut def, &iface.members);
    def
}

fn fill_members(def: &mut ClassDef, members: &[ClassMember]) {
    let class_name = def.name.clone();
    let parent_name = def.parent.clone();
    let names = def.names.clone();
    let resolve = move |n: &str| match n.to_ascii_lowercase().as_str() {
        "self" | "static" | "$this" => class_name.clone(),
        "parent" => parent_name.clone().unwrap_or_else(|| n.to_string()),
        _ => names.resolve_class(n),
    };

    for member in members {
        match &member.kind {
            MemberKind::Method(method) => def.methods.push(MethodDef {
                name: method.name.clone(),
                from: member.from.clone(),
                parameters: parameters(&method.params, &resolve),
                return_hint: method.return_hint.clone(),
                return_type: method
                    .return_hint
                    .as_deref()
                    .and_then(|h| Types::from_hint(h, &resolve)),
                body: method.body.as_ref().map(|b| Arc::from(b.clone())),
                is_static: method.is_static,
                visibility: method.visibility,
            }),
            MemberKind::Property(prop) => def.properties.push(PropertyDef {
                name: prop.name.clone(),
                from: member.from.clone(),
                type_hint: prop.hint.clone(),
                ty: prop.hint.as_deref().and_then(|h| Types::from_hint(h, &resolve)),
                is_static: prop.is_static,
                visibility: prop.visibility,
            }),
            MemberKind::Constant(constant) => {
                for item in &constant.items {
                    def.constants.push(ConstantDef {
                        name: item.name.clone(),
                        from: item.from.clone().or_else(|| member.from.clone()),
                        type_hint: constant.hint.clone(),
                        visibility: constant.visibility,
                    });
                }
            }
            MemberKind::EnumCase(name) => def.constants.push(ConstantDef {
                name: name.clone(),
                from: member.from.clone(),
                type_hint: None,
                visibility: Visibility::Public,
            }),
            MemberKind::TraitUse(traits) => {
                for t in traits {
                    def.traits.push(def.names.resolve_class(t));
                }
            }
            MemberKind::Unsupported(_) => {}
        }
    }
}
