/// Statement lowering.
///
/// Compound statement bodies (`if`, loops, `switch`, `try`) are flattened
/// into plain statement lists whichever of the brace or colon forms was
/// used in the source.
use mago_span::HasSpan;
use mago_syntax::ast::*;

use super::Lowering;
use crate::ast;

impl<'s> Lowering<'s> {
    pub(crate) fn statements<'a>(
        &mut self,
        statements: impl Iterator<Item = &'a Statement<'a>>,
    ) -> Vec<ast::Stmt> {
        statements.filter_map(|s| self.statement(s)).collect()
    }

    /// The body of a control structure, with a braced block unwrapped.
    fn body(&mut self, statement: &Statement<'_>) -> Vec<ast::Stmt> {
        match statement {
            Statement::Block(block) => self.statements(block.statements.iter()),
            other => self.statement(other).into_iter().collect(),
        }
    }

    fn stmt(&mut self, node: &impl HasSpan, kind: ast::StmtKind) -> ast::Stmt {
        ast::Stmt {
            id: self.id(),
            from: self.span_of(node),
            kind,
        }
    }

    /// Lower one statement.  Tags, inline text and empty statements carry
    /// no meaning for the engine and yield `None`.
    pub(crate) fn statement(&mut self, statement: &Statement<'_>) -> Option<ast::Stmt> {
        let kind = match statement {
            Statement::Namespace(ns) => ast::StmtKind::Namespace(ast::NamespaceDecl {
                name: ns.name.as_ref().map(|n| n.value().to_string()),
                statements: self.statements(ns.statements().iter()),
            }),
            Statement::Use(use_stmt) => ast::StmtKind::Use(self.use_items(&use_stmt.items)),
            Statement::Function(func) => ast::StmtKind::Function(self.function(func)),
            Statement::Class(class) => ast::StmtKind::Class(self.class(class)),
            Statement::Interface(iface) => ast::StmtKind::Interface(self.interface(iface)),
            Statement::Trait(trait_def) => ast::StmtKind::Class(self.trait_decl(trait_def)),
            Statement::Enum(enum_def) => ast::StmtKind::Class(self.enum_decl(enum_def)),
            Statement::Static(static_stmt) => {
                let mut items = Vec::new();
                for item in static_stmt.items.iter() {
                    let value = match item {
                        StaticItem::Concrete(concrete) => Some(self.expression(concrete.value)),
                        StaticItem::Abstract(_) => None,
                    };
                    items.push(ast::VarItem {
                        id: self.id(),
                        from: self.span_of(item),
                        name: item.variable().name.to_string(),
                        value,
                    });
                }
                ast::StmtKind::Var(items)
            }
            Statement::Global(global) => ast::StmtKind::Global(
                global
                    .variables
                    .iter()
                    .filter_map(|v| match v {
                        Variable::Direct(dv) => Some(dv.name.to_string()),
                        _ => None,
                    })
                    .collect(),
            ),
            Statement::Constant(constant) => {
                let mut items = Vec::new();
                for item in constant.items.iter() {
                    items.push(ast::ConstItem {
                        id: self.id(),
                        from: self.span_of(item),
                        name: item.name.value.to_string(),
                        value: self.expression(item.value),
                    });
                }
                ast::StmtKind::Const(items)
            }
            Statement::Expression(expr_stmt) => {
                ast::StmtKind::Expr(self.expression(expr_stmt.expression))
            }
            Statement::Echo(echo) => {
                ast::StmtKind::Echo(echo.values.iter().map(|v| self.expression(v)).collect())
            }
            Statement::Return(ret) => ast::StmtKind::Return(ret.value.map(|v| self.expression(v))),
            Statement::Break(_) => ast::StmtKind::Break,
            Statement::Continue(_) => ast::StmtKind::Continue,
            Statement::Block(block) => {
                ast::StmtKind::Block(self.statements(block.statements.iter()))
            }
            Statement::If(if_stmt) => ast::StmtKind::If(self.if_statement(if_stmt)),
            Statement::For(for_stmt) => ast::StmtKind::For(ast::ForStmt {
                init: for_stmt
                    .initializations
                    .iter()
                    .map(|e| self.expression(e))
                    .collect(),
                condition: for_stmt
                    .conditions
                    .iter()
                    .map(|e| self.expression(e))
                    .collect(),
                update: for_stmt
                    .increments
                    .iter()
                    .map(|e| self.expression(e))
                    .collect(),
                body: match &for_stmt.body {
                    ForBody::Statement(inner) => self.body(inner),
                    ForBody::ColonDelimited(body) => self.statements(body.statements.iter()),
                },
            }),
            Statement::Foreach(foreach) => ast::StmtKind::Foreach(ast::ForeachStmt {
                subject: self.expression(foreach.expression),
                key: foreach.target.key().map(|k| self.expression(k)),
                value: self.expression(foreach.target.value()),
                body: self.statements(foreach.body.statements().iter()),
            }),
            Statement::While(while_stmt) => ast::StmtKind::While(ast::WhileStmt {
                condition: self.expression(while_stmt.condition),
                body: match &while_stmt.body {
                    WhileBody::Statement(inner) => self.body(inner),
                    WhileBody::ColonDelimited(body) => self.statements(body.statements.iter()),
                },
            }),
            Statement::DoWhile(dw) => ast::StmtKind::DoWhile(ast::WhileStmt {
                body: self.body(dw.statement),
                condition: self.expression(dw.condition),
            }),
            Statement::Switch(switch) => ast::StmtKind::Switch(self.switch_statement(switch)),
            Statement::Try(try_stmt) => ast::StmtKind::Try(self.try_statement(try_stmt)),
            other => {
                let text = self.text_of(other).trim();
                if text.is_empty() || text == ";" || text.starts_with("<?") || text.starts_with("?>")
                {
                    return None;
                }
                ast::StmtKind::Unsupported(self.unsupported(other, "statement"))
            }
        };
        Some(self.stmt(statement, kind))
    }

    fn if_statement(&mut self, if_stmt: &If<'_>) -> ast::IfStmt {
        let condition = self.expression(if_stmt.condition);
        match &if_stmt.body {
            IfBody::Statement(body) => ast::IfStmt {
                condition,
                then_branch: self.body(body.statement),
                else_ifs: body
                    .else_if_clauses
                    .iter()
                    .map(|clause| ast::ElseIf {
                        condition: self.expression(clause.condition),
                        body: self.body(clause.statement),
                    })
                    .collect(),
                else_branch: body.else_clause.as_ref().map(|e| self.body(e.statement)),
            },
            IfBody::ColonDelimited(body) => ast::IfStmt {
                condition,
                then_branch: self.statements(body.statements.iter()),
                else_ifs: body
                    .else_if_clauses
                    .iter()
                    .map(|clause| ast::ElseIf {
                        condition: self.expression(clause.condition),
                        body: self.statements(clause.statements.iter()),
                    })
                    .collect(),
                else_branch: body
                    .else_clause
                    .as_ref()
                    .map(|e| self.statements(e.statements.iter())),
            },
        }
    }

    fn switch_statement(&mut self, switch: &Switch<'_>) -> ast::SwitchStmt {
        let subject = self.expression(switch.expression);
        let cases: Vec<&SwitchCase<'_>> = match &switch.body {
            SwitchBody::BraceDelimited(body) => body.cases.iter().collect(),
            SwitchBody::ColonDelimited(body) => body.cases.iter().collect(),
        };
        let cases = cases
            .into_iter()
            .map(|case| ast::SwitchCase {
                id: self.id(),
                from: self.span_of(case),
                test: match case {
                    SwitchCase::Expression(c) => Some(self.expression(c.expression)),
                    SwitchCase::Default(_) => None,
                },
                body: self.statements(case.statements().iter()),
            })
            .collect();
        ast::SwitchStmt { subject, cases }
    }

    fn try_statement(&mut self, try_stmt: &Try<'_>) -> ast::TryStmt {
        let body = self.statements(try_stmt.block.statements.iter());
        let catches = try_stmt
            .catch_clauses
            .iter()
            .map(|catch| ast::CatchClause {
                id: self.id(),
                from: self.span_of(catch),
                types: self
                    .hint(&catch.hint)
                    .split('|')
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect(),
                variable: catch.variable.as_ref().map(|v| v.name.to_string()),
                body: self.statements(catch.block.statements.iter()),
            })
            .collect();
        let finally = try_stmt
            .finally_clause
            .as_ref()
            .map(|f| self.statements(f.block.statements.iter()));
        ast::TryStmt {
            body,
            catches,
            finally,
        }
    }
}
