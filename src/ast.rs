/// Owned syntax tree for Origami source files.
///
/// The tree is produced by [`crate::parser`] and never mutated afterwards.
/// Every node that can be targeted by a cursor carries a [`NodeId`] that is
/// unique within its [`Program`], plus an optional [`Span`] describing its
/// source span.  Anything the engine learns about a node (inferred types,
/// for instance) lives in side tables keyed by `NodeId`.
///
/// Node shapes are closed enums so that every consumer that matches on them
/// (the walker above all) is checked for exhaustiveness by the compiler.
use std::fmt;
use std::sync::Arc;

// ─── Identity and spans ─────────────────────────────────────────────────────

/// Identity of a node inside one [`Program`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Source span of a node.
///
/// Lines and columns are 1-based.  `end_col` is the column just past the
/// last character of the node, so a one-character token at column 5 spans
/// `5..6`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Span {
    pub source: Arc<str>,
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl Span {
    /// `(start_line, start_col, end_line, end_col)`, all 1-based.
    pub fn range(&self) -> (u32, u32, u32, u32) {
        (self.start_line, self.start_col, self.end_line, self.end_col)
    }

    /// URI of the document the node was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}-{}:{}",
            self.source, self.start_line, self.start_col, self.end_line, self.end_col
        )
    }
}

// ─── Program ────────────────────────────────────────────────────────────────

/// Root of a parsed document.
#[derive(Debug, Clone)]
pub struct Program {
    /// URI of the document.
    pub source: Arc<str>,
    pub statements: Vec<Stmt>,
}

// ─── Statements ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Stmt {
    pub id: NodeId,
    pub from: Option<Span>,
    pub kind: StmtKind,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Namespace(NamespaceDecl),
    Use(Vec<UseItem>),
    Function(FunctionDecl),
    Class(ClassDecl),
    Interface(InterfaceDecl),
    /// `static $a = 1, $b;` style variable declarations.
    Var(Vec<VarItem>),
    /// `global $a, $b;`
    Global(Vec<String>),
    /// `const A = 1, B = 2;`
    Const(Vec<ConstItem>),
    Expr(Expr),
    Echo(Vec<Expr>),
    Return(Option<Expr>),
    Break,
    Continue,
    Block(Vec<Stmt>),
    If(IfStmt),
    For(ForStmt),
    Foreach(ForeachStmt),
    While(WhileStmt),
    DoWhile(WhileStmt),
    Switch(SwitchStmt),
    Try(TryStmt),
    /// A statement shape the frontend does not model.
    Unsupported(String),
}

#[derive(Debug, Clone)]
pub struct NamespaceDecl {
    pub name: Option<String>,
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseKind {
    Class,
    Function,
    Const,
}

/// One imported name of a `use` statement.
#[derive(Debug, Clone)]
pub struct UseItem {
    pub kind: UseKind,
    /// Fully-qualified name without a leading `\`.
    pub name: String,
    pub alias: Option<String>,
}

impl UseItem {
    /// The local name the import is visible under.
    pub fn local_name(&self) -> &str {
        self.alias
            .as_deref()
            .unwrap_or_else(|| self.name.rsplit('\\').next().unwrap_or(&self.name))
    }
}

#[derive(Debug, Clone)]
pub struct VarItem {
    pub id: NodeId,
    pub from: Option<Span>,
    /// Variable name including the `$` sigil.
    pub name: String,
    pub value: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct ConstItem {
    pub id: NodeId,
    pub from: Option<Span>,
    pub name: String,
    pub value: Expr,
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_branch: Vec<Stmt>,
    pub else_ifs: Vec<ElseIf>,
    pub else_branch: Option<Vec<Stmt>>,
}

#[derive(Debug, Clone)]
pub struct ElseIf {
    pub condition: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct ForStmt {
    pub init: Vec<Expr>,
    pub condition: Vec<Expr>,
    pub update: Vec<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct ForeachStmt {
    pub subject: Expr,
    pub key: Option<Expr>,
    pub value: Expr,
    pub body: Vec<Stmt>,
}

/// Shared by `while` and `do … while`.
#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct SwitchStmt {
    pub subject: Expr,
    pub cases: Vec<SwitchCase>,
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub id: NodeId,
    pub from: Option<Span>,
    /// `None` for `default:`.
    pub test: Option<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct TryStmt {
    pub body: Vec<Stmt>,
    pub catches: Vec<CatchClause>,
    pub finally: Option<Vec<Stmt>>,
}

#[derive(Debug, Clone)]
pub struct CatchClause {
    pub id: NodeId,
    pub from: Option<Span>,
    /// Caught type names as written (`A|B` yields two entries).
    pub types: Vec<String>,
    pub variable: Option<String>,
    pub body: Vec<Stmt>,
}

// ─── Declarations ───────────────────────────────────────────────────────────

/// `#[Name(...)]` attached to a declaration.
#[derive(Debug, Clone)]
pub struct Annotation {
    pub id: NodeId,
    pub from: Option<Span>,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub id: NodeId,
    pub from: Option<Span>,
    /// Name including the `$` sigil.
    pub name: String,
    pub hint: Option<String>,
    pub default: Option<Expr>,
    pub variadic: bool,
    pub by_ref: bool,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: String,
    pub annotations: Vec<Annotation>,
    pub params: Vec<Param>,
    pub return_hint: Option<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Class,
    Interface,
    Trait,
    Enum,
}

impl ClassKind {
    pub fn keyword(self) -> &'static str {
        match self {
            ClassKind::Class => "class",
            ClassKind::Interface => "interface",
            ClassKind::Trait => "trait",
            ClassKind::Enum => "enum",
        }
    }
}

/// Classes, traits and enums.
#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub kind: ClassKind,
    pub name: String,
    pub annotations: Vec<Annotation>,
    pub extends: Option<String>,
    pub implements: Vec<String>,
    pub members: Vec<ClassMember>,
}

#[derive(Debug, Clone)]
pub struct InterfaceDecl {
    pub name: String,
    pub annotations: Vec<Annotation>,
    pub extends: Vec<String>,
    pub members: Vec<ClassMember>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl Visibility {
    pub fn keyword(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Private => "private",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassMember {
    pub id: NodeId,
    pub from: Option<Span>,
    pub kind: MemberKind,
}

#[derive(Debug, Clone)]
pub enum MemberKind {
    Method(MethodDecl),
    Property(PropertyDecl),
    Constant(ClassConstDecl),
    /// `use SomeTrait;` inside a class body.
    TraitUse(Vec<String>),
    /// `case Foo;` inside an enum.
    EnumCase(String),
    Unsupported(String),
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: String,
    pub annotations: Vec<Annotation>,
    pub params: Vec<Param>,
    pub return_hint: Option<String>,
    /// `None` for abstract and interface methods.
    pub body: Option<Vec<Stmt>>,
    pub is_static: bool,
    pub visibility: Visibility,
}

#[derive(Debug, Clone)]
pub struct PropertyDecl {
    /// Name without the `$` sigil, as used in `$obj->name`.
    pub name: String,
    pub hint: Option<String>,
    pub default: Option<Expr>,
    pub is_static: bool,
    pub visibility: Visibility,
}

#[derive(Debug, Clone)]
pub struct ClassConstDecl {
    pub hint: Option<String>,
    pub visibility: Visibility,
    pub items: Vec<ConstItem>,
}

// ─── Expressions ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub from: Option<Span>,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(String),
    Float(String),
    String(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(Literal),
    /// Array literal; also the pattern side of a list assignment.
    Array(Vec<ArrayItem>),
    /// `list(...)` pattern.
    List(Vec<ArrayItem>),
    /// Variable reference including the `$` sigil.
    Variable(String),
    This,
    /// Bare identifier: function name, class name or constant.
    Name(String),
    SelfRef,
    StaticRef,
    ParentRef,
    /// Free function call.
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    /// `$obj->method(...)` and `$obj?->method(...)`.
    MethodCall {
        object: Box<Expr>,
        method: String,
        args: Vec<Expr>,
        nullsafe: bool,
    },
    /// `Class::method(...)`.
    StaticCall {
        class: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
    PropertyFetch {
        object: Box<Expr>,
        property: String,
        nullsafe: bool,
    },
    StaticPropertyFetch {
        class: Box<Expr>,
        /// Name without the `$` sigil.
        property: String,
    },
    ClassConstFetch {
        class: Box<Expr>,
        constant: String,
    },
    ArrayAccess {
        array: Box<Expr>,
        index: Option<Box<Expr>>,
    },
    New {
        class: Box<Expr>,
        args: Vec<Expr>,
    },
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Binary {
        op: String,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: String,
        operand: Box<Expr>,
        prefix: bool,
    },
    Ternary {
        condition: Box<Expr>,
        then: Option<Box<Expr>>,
        otherwise: Box<Expr>,
    },
    Closure(Box<Lambda>),
    ArrowFunction(Box<Lambda>),
    Match {
        subject: Box<Expr>,
        arms: Vec<MatchArm>,
    },
    Throw(Box<Expr>),
    Clone(Box<Expr>),
    Yield(Option<Box<Expr>>),
    /// An expression shape the frontend does not model.
    Unsupported(String),
}

/// Element of an array literal or list pattern, i.e. a key/value pair.
#[derive(Debug, Clone)]
pub struct ArrayItem {
    pub id: NodeId,
    pub from: Option<Span>,
    pub key: Option<Expr>,
    pub value: Expr,
    pub spread: bool,
}

#[derive(Debug, Clone)]
pub struct Lambda {
    pub params: Vec<Param>,
    /// Variables captured by `use (...)`, including `$`.
    pub uses: Vec<String>,
    pub return_hint: Option<String>,
    pub body: LambdaBody,
}

#[derive(Debug, Clone)]
pub enum LambdaBody {
    Block(Vec<Stmt>),
    Expr(Expr),
}

#[derive(Debug, Clone)]
pub struct MatchArm {
    pub id: NodeId,
    pub from: Option<Span>,
    /// Empty for the `default` arm.
    pub conditions: Vec<Expr>,
    pub body: Expr,
}

// ─── Node references ────────────────────────────────────────────────────────

/// Borrowed view of any addressable node.
///
/// This is what the walker hands to visitors and what the position resolver
/// returns.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Stmt(&'a Stmt),
    Expr(&'a Expr),
    Member(&'a ClassMember),
    Param(&'a Param),
    VarItem(&'a VarItem),
    ConstItem(&'a ConstItem),
    ArrayItem(&'a ArrayItem),
    MatchArm(&'a MatchArm),
    SwitchCase(&'a SwitchCase),
    Catch(&'a CatchClause),
    Annotation(&'a Annotation),
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> NodeId {
        match self {
            NodeRef::Stmt(n) => n.id,
            NodeRef::Expr(n) => n.id,
            NodeRef::Member(n) => n.id,
            NodeRef::Param(n) => n.id,
            NodeRef::VarItem(n) => n.id,
            NodeRef::ConstItem(n) => n.id,
            NodeRef::ArrayItem(n) => n.id,
            NodeRef::MatchArm(n) => n.id,
            NodeRef::SwitchCase(n) => n.id,
            NodeRef::Catch(n) => n.id,
            NodeRef::Annotation(n) => n.id,
        }
    }

    pub fn from(&self) -> Option<&'a Span> {
        match self {
            NodeRef::Stmt(n) => n.from.as_ref(),
            NodeRef::Expr(n) => n.from.as_ref(),
            NodeRef::Member(n) => n.from.as_ref(),
            NodeRef::Param(n) => n.from.as_ref(),
            NodeRef::VarItem(n) => n.from.as_ref(),
            NodeRef::ConstItem(n) => n.from.as_ref(),
            NodeRef::ArrayItem(n) => n.from.as_ref(),
            NodeRef::MatchArm(n) => n.from.as_ref(),
            NodeRef::SwitchCase(n) => n.from.as_ref(),
            NodeRef::Catch(n) => n.from.as_ref(),
            NodeRef::Annotation(n) => n.from.as_ref(),
        }
    }

    pub fn as_expr(&self) -> Option<&'a Expr> {
        match self {
            NodeRef::Expr(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_stmt(&self) -> Option<&'a Stmt> {
        match self {
            NodeRef::Stmt(s) => Some(s),
            _ => None,
        }
    }

    /// Short human-readable name of the node shape, used in logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeRef::Stmt(s) => match &s.kind {
                StmtKind::Namespace(_) => "namespace",
                StmtKind::Use(_) => "use",
                StmtKind::Function(_) => "function",
                StmtKind::Class(_) => "class",
                StmtKind::Interface(_) => "interface",
                StmtKind::Var(_) => "var",
                StmtKind::Global(_) => "global",
                StmtKind::Const(_) => "const",
                StmtKind::Expr(_) => "expression statement",
                StmtKind::Echo(_) => "echo",
                StmtKind::Return(_) => "return",
                StmtKind::Break => "break",
                StmtKind::Continue => "continue",
                StmtKind::Block(_) => "block",
                StmtKind::If(_) => "if",
                StmtKind::For(_) => "for",
                StmtKind::Foreach(_) => "foreach",
                StmtKind::While(_) => "while",
                StmtKind::DoWhile(_) => "do-while",
                StmtKind::Switch(_) => "switch",
                StmtKind::Try(_) => "try",
                StmtKind::Unsupported(_) => "unsupported statement",
            },
            NodeRef::Expr(e) => match &e.kind {
                ExprKind::Literal(_) => "literal",
                ExprKind::Array(_) => "array",
                ExprKind::List(_) => "list",
                ExprKind::Variable(_) => "variable",
                ExprKind::This => "this",
                ExprKind::Name(_) => "name",
                ExprKind::SelfRef => "self",
                ExprKind::StaticRef => "static",
                ExprKind::ParentRef => "parent",
                ExprKind::Call { .. } => "call",
                ExprKind::MethodCall { .. } => "method call",
                ExprKind::StaticCall { .. } => "static call",
                ExprKind::PropertyFetch { .. } => "property fetch",
                ExprKind::StaticPropertyFetch { .. } => "static property fetch",
                ExprKind::ClassConstFetch { .. } => "class constant fetch",
                ExprKind::ArrayAccess { .. } => "array access",
                ExprKind::New { .. } => "new",
                ExprKind::Assign { .. } => "assignment",
                ExprKind::Binary { .. } => "binary",
                ExprKind::Unary { .. } => "unary",
                ExprKind::Ternary { .. } => "ternary",
                ExprKind::Closure(_) => "closure",
                ExprKind::ArrowFunction(_) => "arrow function",
                ExprKind::Match { .. } => "match",
                ExprKind::Throw(_) => "throw",
                ExprKind::Clone(_) => "clone",
                ExprKind::Yield(_) => "yield",
                ExprKind::Unsupported(_) => "unsupported expression",
            },
            NodeRef::Member(_) => "class member",
            NodeRef::Param(_) => "parameter",
            NodeRef::VarItem(_) => "variable declaration",
            NodeRef::ConstItem(_) => "constant declaration",
            NodeRef::ArrayItem(_) => "array item",
            NodeRef::MatchArm(_) => "match arm",
            NodeRef::SwitchCase(_) => "switch case",
            NodeRef::Catch(_) => "catch clause",
            NodeRef::Annotation(_) => "annotation",
        }
    }
}
