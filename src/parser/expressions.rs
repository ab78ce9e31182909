/// Expression lowering.
///
/// Parentheses are dropped.  Operators are kept as their source text since
/// the engine only ever displays them.
use mago_span::HasSpan;
use mago_syntax::ast::*;

use super::Lowering;
use crate::ast;

impl<'s> Lowering<'s> {
    pub(crate) fn expression(&mut self, expr: &Expression<'_>) -> ast::Expr {
        if let Expression::Parenthesized(p) = expr {
            return self.expression(p.expression);
        }
        let kind = self.expression_kind(expr);
        ast::Expr {
            id: self.id(),
            from: self.span_of(expr),
            kind,
        }
    }

    fn boxed(&mut self, expr: &Expression<'_>) -> Box<ast::Expr> {
        Box::new(self.expression(expr))
    }

    fn expression_kind(&mut self, expr: &Expression<'_>) -> ast::ExprKind {
        match expr {
            Expression::Literal(literal) => ast::ExprKind::Literal(self.literal(literal)),
            Expression::Variable(Variable::Direct(dv)) => {
                if dv.name == "$this" {
                    ast::ExprKind::This
                } else {
                    ast::ExprKind::Variable(dv.name.to_string())
                }
            }
            Expression::Identifier(ident) => ast::ExprKind::Name(ident.value().to_string()),
            Expression::Self_(_) => ast::ExprKind::SelfRef,
            Expression::Static(_) => ast::ExprKind::StaticRef,
            Expression::Parent(_) => ast::ExprKind::ParentRef,
            Expression::Call(call) => self.call(call),
            Expression::Access(access) => match access {
                Access::Property(pa) => ast::ExprKind::PropertyFetch {
                    object: self.boxed(pa.object),
                    property: self.member_name(&pa.property),
                    nullsafe: false,
                },
                Access::NullSafeProperty(pa) => ast::ExprKind::PropertyFetch {
                    object: self.boxed(pa.object),
                    property: self.member_name(&pa.property),
                    nullsafe: true,
                },
                Access::StaticProperty(pa) => ast::ExprKind::StaticPropertyFetch {
                    class: self.boxed(pa.class),
                    property: match &pa.property {
                        Variable::Direct(dv) => dv.name.trim_start_matches('$').to_string(),
                        other => self.text_of(other).to_string(),
                    },
                },
                Access::ClassConstant(cca) => ast::ExprKind::ClassConstFetch {
                    class: self.boxed(cca.class),
                    constant: match &cca.constant {
                        ClassLikeConstantSelector::Identifier(ident) => ident.value.to_string(),
                        other => self.text_of(other).to_string(),
                    },
                },
            },
            Expression::ArrayAccess(aa) => ast::ExprKind::ArrayAccess {
                array: self.boxed(aa.array),
                index: Some(self.boxed(aa.index)),
            },
            Expression::Instantiation(inst) => ast::ExprKind::New {
                class: self.boxed(inst.class),
                args: match &inst.argument_list {
                    Some(list) => self.arguments(list),
                    None => Vec::new(),
                },
            },
            Expression::Assignment(a) => {
                let op = self.between(a.lhs, a.rhs);
                let target = self.boxed(a.lhs);
                let value = self.boxed(a.rhs);
                if a.operator.is_assign() {
                    ast::ExprKind::Assign { target, value }
                } else {
                    ast::ExprKind::Binary {
                        op,
                        left: target,
                        right: value,
                    }
                }
            }
            Expression::Binary(b) => ast::ExprKind::Binary {
                op: self.between(b.lhs, b.rhs),
                left: self.boxed(b.lhs),
                right: self.boxed(b.rhs),
            },
            Expression::UnaryPrefix(u) => {
                let start = expr.span().start.offset as usize;
                let end = u.operand.span().start.offset as usize;
                ast::ExprKind::Unary {
                    op: self.slice(start, end),
                    operand: self.boxed(u.operand),
                    prefix: true,
                }
            }
            Expression::UnaryPostfix(u) => {
                let start = u.operand.span().end.offset as usize;
                let end = expr.span().end.offset as usize;
                ast::ExprKind::Unary {
                    op: self.slice(start, end),
                    operand: self.boxed(u.operand),
                    prefix: false,
                }
            }
            Expression::Conditional(c) => ast::ExprKind::Ternary {
                condition: self.boxed(c.condition),
                then: c.then.map(|t| self.boxed(t)),
                otherwise: self.boxed(c.r#else),
            },
            Expression::Array(arr) => ast::ExprKind::Array(self.array_items(arr.elements.iter())),
            Expression::LegacyArray(arr) => {
                ast::ExprKind::Array(self.array_items(arr.elements.iter()))
            }
            Expression::List(list) => ast::ExprKind::List(self.array_items(list.elements.iter())),
            Expression::Closure(closure) => {
                let lambda = ast::Lambda {
                    params: self.parameters(&closure.parameter_list),
                    uses: closure
                        .use_clause
                        .as_ref()
                        .map(|clause| {
                            clause
                                .variables
                                .iter()
                                .map(|v| v.variable.name.to_string())
                                .collect()
                        })
                        .unwrap_or_default(),
                    return_hint: closure
                        .return_type_hint
                        .as_ref()
                        .map(|r| self.hint(&r.hint)),
                    body: ast::LambdaBody::Block(self.statements(closure.body.statements.iter())),
                };
                ast::ExprKind::Closure(Box::new(lambda))
            }
            Expression::ArrowFunction(arrow) => {
                let lambda = ast::Lambda {
                    params: self.parameters(&arrow.parameter_list),
                    uses: Vec::new(),
                    return_hint: arrow.return_type_hint.as_ref().map(|r| self.hint(&r.hint)),
                    body: ast::LambdaBody::Expr(self.expression(arrow.expression)),
                };
                ast::ExprKind::ArrowFunction(Box::new(lambda))
            }
            Expression::Match(m) => {
                let subject = self.boxed(m.expression);
                let arms = m
                    .arms
                    .iter()
                    .map(|arm| {
                        let conditions = match arm {
                            MatchArm::Expression(expr_arm) => expr_arm
                                .conditions
                                .iter()
                                .map(|c| self.expression(c))
                                .collect(),
                            _ => Vec::new(),
                        };
                        ast::MatchArm {
                            id: self.id(),
                            from: self.span_of(arm),
                            conditions,
                            body: self.expression(arm.expression()),
                        }
                    })
                    .collect();
                ast::ExprKind::Match { subject, arms }
            }
            Expression::Throw(t) => ast::ExprKind::Throw(self.boxed(t.exception)),
            Expression::Clone(c) => ast::ExprKind::Clone(self.boxed(c.object)),
            Expression::Yield(y) => ast::ExprKind::Yield(match y {
                Yield::Value(yv) => yv.value.map(|v| self.boxed(v)),
                Yield::Pair(yp) => Some(self.boxed(yp.value)),
                Yield::From(yf) => Some(self.boxed(yf.iterator)),
            }),
            other => self.fallback(other),
        }
    }

    /// Shapes without a dedicated node: string forms become string
    /// literals, bare constant names become names, the rest is unsupported.
    fn fallback(&mut self, expr: &Expression<'_>) -> ast::ExprKind {
        let text = self.text_of(expr).trim();
        if text.starts_with('"') || text.starts_with('\'') || text.starts_with("<<<") {
            let inner = text
                .trim_start_matches(['"', '\''])
                .trim_end_matches(['"', '\'']);
            return ast::ExprKind::Literal(ast::Literal::String(inner.to_string()));
        }
        if !text.is_empty()
            && !text.starts_with(|c: char| c.is_ascii_digit())
            && text
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '\\')
        {
            return ast::ExprKind::Name(text.to_string());
        }
        ast::ExprKind::Unsupported(self.unsupported(expr, "expression"))
    }

    fn literal(&mut self, literal: &Literal<'_>) -> ast::Literal {
        match literal {
            Literal::String(s) => {
                ast::Literal::String(s.value.map(str::to_string).unwrap_or_default())
            }
            Literal::Integer(_) => ast::Literal::Int(self.text_of(literal).to_string()),
            Literal::Float(_) => ast::Literal::Float(self.text_of(literal).to_string()),
            other => match self.text_of(other).to_ascii_lowercase().as_str() {
                "true" => ast::Literal::Bool(true),
                "false" => ast::Literal::Bool(false),
                _ => ast::Literal::Null,
            },
        }
    }

    fn call(&mut self, call: &Call<'_>) -> ast::ExprKind {
        match call {
            Call::Function(fc) => ast::ExprKind::Call {
                callee: self.boxed(fc.function),
                args: self.arguments(&fc.argument_list),
            },
            Call::Method(mc) => ast::ExprKind::MethodCall {
                object: self.boxed(mc.object),
                method: self.member_name(&mc.method),
                args: self.arguments(&mc.argument_list),
                nullsafe: false,
            },
            Call::NullSafeMethod(mc) => ast::ExprKind::MethodCall {
                object: self.boxed(mc.object),
                method: self.member_name(&mc.method),
                args: self.arguments(&mc.argument_list),
                nullsafe: true,
            },
            Call::StaticMethod(sc) => ast::ExprKind::StaticCall {
                class: self.boxed(sc.class),
                method: self.member_name(&sc.method),
                args: self.arguments(&sc.argument_list),
            },
        }
    }

    fn arguments(&mut self, list: &ArgumentList<'_>) -> Vec<ast::Expr> {
        list.arguments
            .iter()
            .map(|arg| match arg {
                Argument::Positional(pos) => self.expression(pos.value),
                Argument::Named(named) => self.expression(named.value),
            })
            .collect()
    }

    fn array_items<'a>(
        &mut self,
        elements: impl Iterator<Item = &'a ArrayElement<'a>>,
    ) -> Vec<ast::ArrayItem> {
        let mut out = Vec::new();
        for element in elements {
            let (key, value, spread) = match element {
                ArrayElement::KeyValue(kv) => {
                    (Some(self.expression(kv.key)), self.expression(kv.value), false)
                }
                ArrayElement::Value(v) => (None, self.expression(v.value), false),
                ArrayElement::Variadic(v) => (None, self.expression(v.value), true),
                ArrayElement::Missing(_) => continue,
            };
            out.push(ast::ArrayItem {
                id: self.id(),
                from: self.span_of(element),
                key,
                value,
                spread,
            });
        }
        out
    }

    /// `->name`, `?->name`, `::name`; dynamic selectors keep their text.
    fn member_name(&self, selector: &ClassLikeMemberSelector<'_>) -> String {
        match selector {
            ClassLikeMemberSelector::Identifier(ident) => ident.value.to_string(),
            other => self.text_of(other).to_string(),
        }
    }

    /// Operator text between two operands.
    fn between(&self, left: &Expression<'_>, right: &Expression<'_>) -> String {
        self.slice(
            left.span().end.offset as usize,
            right.span().start.offset as usize,
        )
    }

    fn slice(&self, start: usize, end: usize) -> String {
        self.text
            .get(start..end)
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    }
}
