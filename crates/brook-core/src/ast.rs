//! The syntax tree the evaluator executes.
//!
//! Trees are produced by an external parser (or built directly by the host)
//! and consumed read-only. The node set is a closed tagged-variant type so
//! evaluator dispatch stays a single exhaustive match.

use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Pos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Literal),
    Name(String),
    Tuple(Vec<Expr>),
    List(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    Bool {
        left: Box<Expr>,
        op: BoolOp,
        right: Box<Expr>,
    },
    Compare {
        left: Box<Expr>,
        op: CmpOp,
        right: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        kwargs: Vec<(String, Expr)>,
    },
    Attribute {
        value: Box<Expr>,
        attr: String,
    },
    Index {
        value: Box<Expr>,
        index: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then: Box<Expr>,
        orelse: Box<Expr>,
    },
    /// Suspends the whole evaluation until the operand's awaitable completes.
    Await(Box<Expr>),
}

/// Assignment target. `Name` and `Tuple` bind into the scope; `Index` and
/// `Attribute` mutate a container or instance in place.
#[derive(Debug, Clone)]
pub enum Target {
    Name(String),
    Tuple(Vec<Target>),
    Index { value: Expr, index: Expr },
    Attribute { value: Expr, attr: String },
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    /// Evaluated once, in the defining scope, when the definition executes.
    pub default: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct WithItem {
    pub context: Expr,
    pub target: Option<Target>,
}

#[derive(Debug, Clone)]
pub struct ImportName {
    pub name: String,
    pub alias: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expr(Expr),
    Assign {
        targets: Vec<Target>,
        value: Expr,
    },
    AugAssign {
        target: Target,
        op: BinOp,
        value: Expr,
    },
    AnnAssign {
        name: String,
        annotation: Expr,
        value: Option<Expr>,
    },
    Delete(Vec<Target>),
    If {
        cond: Expr,
        then: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    For {
        target: Target,
        iter: Expr,
        body: Vec<Stmt>,
        is_async: bool,
    },
    With {
        items: Vec<WithItem>,
        body: Vec<Stmt>,
        is_async: bool,
    },
    FunctionDef {
        name: String,
        params: Vec<Parameter>,
        body: Arc<[Stmt]>,
        is_async: bool,
    },
    ClassDef {
        name: String,
        body: Vec<Stmt>,
    },
    Return(Option<Expr>),
    Raise(Expr),
    Import(Vec<ImportName>),
    ImportFrom {
        module: String,
        names: Vec<ImportName>,
    },
    Pass,
    Break,
    Continue,
}

impl Expr {
    pub fn none() -> Expr {
        Expr::Literal(Literal::None)
    }

    pub fn bool(b: bool) -> Expr {
        Expr::Literal(Literal::Bool(b))
    }

    pub fn int(v: i64) -> Expr {
        Expr::Literal(Literal::Int(v))
    }

    pub fn float(v: f64) -> Expr {
        Expr::Literal(Literal::Float(v))
    }

    pub fn str(s: impl Into<String>) -> Expr {
        Expr::Literal(Literal::Str(s.into()))
    }

    pub fn name(n: impl Into<String>) -> Expr {
        Expr::Name(n.into())
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
        Expr::Call {
            callee: Box::new(callee),
            args,
            kwargs: Vec::new(),
        }
    }

    pub fn call_name(name: impl Into<String>, args: Vec<Expr>) -> Expr {
        Expr::call(Expr::name(name), args)
    }

    pub fn attr(value: Expr, attr: impl Into<String>) -> Expr {
        Expr::Attribute {
            value: Box::new(value),
            attr: attr.into(),
        }
    }

    /// `receiver.name(args)`
    pub fn method(receiver: Expr, name: impl Into<String>, args: Vec<Expr>) -> Expr {
        Expr::call(Expr::attr(receiver, name), args)
    }

    pub fn index(value: Expr, index: Expr) -> Expr {
        Expr::Index {
            value: Box::new(value),
            index: Box::new(index),
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(left: Expr, op: BinOp, right: Expr) -> Expr {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn boolean(left: Expr, op: BoolOp, right: Expr) -> Expr {
        Expr::Bool {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn compare(left: Expr, op: CmpOp, right: Expr) -> Expr {
        Expr::Compare {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn await_(operand: Expr) -> Expr {
        Expr::Await(Box::new(operand))
    }
}

impl Stmt {
    pub fn expr(e: Expr) -> Stmt {
        Stmt::Expr(e)
    }

    /// `name = value`
    pub fn assign(name: impl Into<String>, value: Expr) -> Stmt {
        Stmt::Assign {
            targets: vec![Target::Name(name.into())],
            value,
        }
    }

    pub fn assign_to(target: Target, value: Expr) -> Stmt {
        Stmt::Assign {
            targets: vec![target],
            value,
        }
    }

    pub fn delete(name: impl Into<String>) -> Stmt {
        Stmt::Delete(vec![Target::Name(name.into())])
    }
}

impl Target {
    pub fn name(n: impl Into<String>) -> Target {
        Target::Name(n.into())
    }
}

impl Parameter {
    pub fn required(name: impl Into<String>) -> Parameter {
        Parameter {
            name: name.into(),
            default: None,
        }
    }

    pub fn with_default(name: impl Into<String>, default: Expr) -> Parameter {
        Parameter {
            name: name.into(),
            default: Some(default),
        }
    }
}
