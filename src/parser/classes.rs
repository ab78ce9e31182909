/// Declaration lowering: functions, class-likes and their members.
///
/// Traits and enums lower to [`ast::ClassDecl`] with the matching
/// [`ast::ClassKind`]; interfaces keep their own node because they may
/// extend several parents.
use mago_syntax::ast::*;

use super::Lowering;
use crate::ast;

impl<'s> Lowering<'s> {
    pub(crate) fn function(&mut self, func: &Function<'_>) -> ast::FunctionDecl {
        ast::FunctionDecl {
            name: func.name.value.to_string(),
            annotations: self.annotations(func.attribute_lists.iter()),
            params: self.parameters(&func.parameter_list),
            return_hint: func.return_type_hint.as_ref().map(|r| self.hint(&r.hint)),
            body: self.statements(func.body.statements.iter()),
        }
    }

    pub(crate) fn class(&mut self, class: &Class<'_>) -> ast::ClassDecl {
        ast::ClassDecl {
            kind: ast::ClassKind::Class,
            name: class.name.value.to_string(),
            annotations: self.annotations(class.attribute_lists.iter()),
            extends: class
                .extends
                .as_ref()
                .and_then(|ext| ext.types.first().map(|ident| ident.value().to_string())),
            implements: class
                .implements
                .as_ref()
                .map(|imp| imp.types.iter().map(|i| i.value().to_string()).collect())
                .unwrap_or_default(),
            members: self.members(class.members.iter()),
        }
    }

    pub(crate) fn interface(&mut self, iface: &Interface<'_>) -> ast::InterfaceDecl {
        ast::InterfaceDecl {
            name: iface.name.value.to_string(),
            annotations: self.annotations(iface.attribute_lists.iter()),
            extends: iface
                .extends
                .as_ref()
                .map(|ext| ext.types.iter().map(|i| i.value().to_string()).collect())
                .unwrap_or_default(),
            members: self.members(iface.members.iter()),
        }
    }

    pub(crate) fn trait_decl(&mut self, trait_def: &Trait<'_>) -> ast::ClassDecl {
        ast::ClassDecl {
            kind: ast::ClassKind::Trait,
            name: trait_def.name.value.to_string(),
            annotations: self.annotations(trait_def.attribute_lists.iter()),
            extends: None,
            implements: Vec::new(),
            members: self.members(trait_def.members.iter()),
        }
    }

    pub(crate) fn enum_decl(&mut self, enum_def: &Enum<'_>) -> ast::ClassDecl {
        ast::ClassDecl {
            kind: ast::ClassKind::Enum,
            name: enum_def.name.value.to_string(),
            annotations: self.annotations(enum_def.attribute_lists.iter()),
            extends: None,
            implements: enum_def
                .implements
                .as_ref()
                .map(|imp| imp.types.iter().map(|i| i.value().to_string()).collect())
                .unwrap_or_default(),
            members: self.members(enum_def.members.iter()),
        }
    }

    fn annotations<'a>(
        &mut self,
        lists: impl Iterator<Item = &'a AttributeList<'a>>,
    ) -> Vec<ast::Annotation> {
        let mut out = Vec::new();
        for list in lists {
            for attribute in list.attributes.iter() {
                out.push(ast::Annotation {
                    id: self.id(),
                    from: self.span_of(attribute),
                    name: attribute.name.value().to_string(),
                });
            }
        }
        out
    }

    pub(crate) fn parameters(&mut self, list: &FunctionLikeParameterList<'_>) -> Vec<ast::Param> {
        list.parameters
            .iter()
            .map(|param| ast::Param {
                id: self.id(),
                from: self.span_of(param),
                name: param.variable.name.to_string(),
                hint: param.hint.as_ref().map(|h| self.hint(h)),
                default: param.default_value.as_ref().map(|d| self.expression(d.value)),
                variadic: param.ellipsis.is_some(),
                by_ref: param.ampersand.is_some(),
            })
            .collect()
    }

    fn members<'a>(
        &mut self,
        members: impl Iterator<Item = &'a ClassLikeMember<'a>>,
    ) -> Vec<ast::ClassMember> {
        let mut out = Vec::new();
        for member in members {
            match member {
                ClassLikeMember::Method(method) => {
                    let name = method.name.value.to_string();
                    if name.eq_ignore_ascii_case("__construct") {
                        out.extend(self.promoted_properties(method));
                    }
                    let kind = ast::MemberKind::Method(ast::MethodDecl {
                        annotations: self.annotations(method.attribute_lists.iter()),
                        params: self.parameters(&method.parameter_list),
                        return_hint: method
                            .return_type_hint
                            .as_ref()
                            .map(|r| self.hint(&r.hint)),
                        body: match &method.body {
                            MethodBody::Concrete(block) => {
                                Some(self.statements(block.statements.iter()))
                            }
                            _ => None,
                        },
                        is_static: method.modifiers.iter().any(|m| m.is_static()),
                        visibility: visibility(method.modifiers.iter()),
                        name,
                    });
                    out.push(self.member(member, kind));
                }
                ClassLikeMember::Property(property) => {
                    let is_static = property.modifiers().iter().any(|m| m.is_static());
                    let vis = visibility(property.modifiers().iter());
                    let hint = property.hint().map(|h| self.hint(h));
                    // One member per declared variable: `public $a, $b;`
                    for var in property.variables().iter() {
                        let raw = var.name.to_string();
                        let kind = ast::MemberKind::Property(ast::PropertyDecl {
                            name: raw.strip_prefix('$').unwrap_or(&raw).to_string(),
                            hint: hint.clone(),
                            default: None,
                            is_static,
                            visibility: vis,
                        });
                        out.push(self.member(member, kind));
                    }
                }
                ClassLikeMember::Constant(constant) => {
                    let mut items = Vec::new();
                    for item in constant.items.iter() {
                        items.push(ast::ConstItem {
                            id: self.id(),
                            from: self.span_of(item),
                            name: item.name.value.to_string(),
                            value: self.expression(item.value),
                        });
                    }
                    let kind = ast::MemberKind::Constant(ast::ClassConstDecl {
                        hint: constant.hint.as_ref().map(|h| self.hint(h)),
                        visibility: visibility(constant.modifiers.iter()),
                        items,
                    });
                    out.push(self.member(member, kind));
                }
                ClassLikeMember::EnumCase(enum_case) => {
                    let kind =
                        ast::MemberKind::EnumCase(enum_case.item.name().value.to_string());
                    out.push(self.member(member, kind));
                }
                ClassLikeMember::TraitUse(trait_use) => {
                    let kind = ast::MemberKind::TraitUse(
                        trait_use
                            .trait_names
                            .iter()
                            .map(|n| n.value().to_string())
                            .collect(),
                    );
                    out.push(self.member(member, kind));
                }
            }
        }
        out
    }

    /// Constructor parameters with a visibility modifier declare properties.
    fn promoted_properties(&mut self, method: &Method<'_>) -> Vec<ast::ClassMember> {
        let mut out = Vec::new();
        for param in method.parameter_list.parameters.iter() {
            if !param.is_promoted_property() {
                continue;
            }
            let raw = param.variable.name.to_string();
            let kind = ast::MemberKind::Property(ast::PropertyDecl {
                name: raw.strip_prefix('$').unwrap_or(&raw).to_string(),
                hint: param.hint.as_ref().map(|h| self.hint(h)),
                default: None,
                is_static: false,
                visibility: visibility(param.modifiers.iter()),
            });
            out.push(ast::ClassMember {
                id: self.id(),
                from: self.span_of(param),
                kind,
            });
        }
        out
    }

    fn member(&mut self, member: &ClassLikeMember<'_>, kind: ast::MemberKind) -> ast::ClassMember {
        ast::ClassMember {
            id: self.id(),
            from: self.span_of(member),
            kind,
        }
    }
}

/// Visibility from a modifier list; `Public` when none is given.
fn visibility<'a>(modifiers: impl Iterator<Item = &'a Modifier<'a>>) -> ast::Visibility {
    for m in modifiers {
        if m.is_private() {
            return ast::Visibility::Private;
        }
        if m.is_protected() {
            return ast::Visibility::Protected;
        }
        if m.is_public() {
            return ast::Visibility::Public;
        }
    }
    ast::Visibility::Public
}
