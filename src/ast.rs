//! Syntax tree of the expression language.

use std::fmt;
use std::rc::Rc;

/// Name of the line-value variable.
pub const LINE_VAR: &str = "$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Short-circuiting operators; they return one of their operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
    Undefined,
    Ident(String),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Member {
        object: Box<Expr>,
        property: String,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Arrow {
        params: Vec<String>,
        body: Rc<Expr>,
    },
}

impl Expr {
    pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
        Expr::Call {
            callee: Box::new(callee),
            args,
        }
    }

    /// Does `name` occur free anywhere in this expression?
    ///
    /// Arrow parameters shadow outer names inside their bodies.
    pub fn mentions(&self, name: &str) -> bool {
        match self {
            Expr::Ident(n) => n == name,
            Expr::Number(_) | Expr::Str(_) | Expr::Bool(_) | Expr::Null | Expr::Undefined => {
                false
            }
            Expr::Array(items) => items.iter().any(|e| e.mentions(name)),
            Expr::Object(fields) => fields.iter().any(|(_, e)| e.mentions(name)),
            Expr::Member { object, .. } => object.mentions(name),
            Expr::Index { object, index } => object.mentions(name) || index.mentions(name),
            Expr::Call { callee, args } => {
                callee.mentions(name) || args.iter().any(|e| e.mentions(name))
            }
            Expr::Unary { operand, .. } => operand.mentions(name),
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                left.mentions(name) || right.mentions(name)
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => test.mentions(name) || consequent.mentions(name) || alternate.mentions(name),
            Expr::Arrow { params, body } => {
                !params.iter().any(|p| p == name) && body.mentions(name)
            }
        }
    }

    fn is_compound(&self) -> bool {
        matches!(
            self,
            Expr::Unary { .. }
                | Expr::Binary { .. }
                | Expr::Logical { .. }
                | Expr::Conditional { .. }
                | Expr::Arrow { .. }
        )
    }
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
        }
    }
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNe => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }
}

impl LogicalOp {
    pub fn symbol(self) -> &'static str {
        match self {
            LogicalOp::And => "&&",
            LogicalOp::Or => "||",
            LogicalOp::Nullish => "??",
        }
    }
}

/// Operand of an operator: compound operands get parentheses.
struct Operand<'a>(&'a Expr);

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_compound() {
            write!(f, "({})", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Renders the expression back to source form.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{n}"),
            Expr::Str(s) => write!(f, "{s:?}"),
            Expr::Bool(b) => write!(f, "{b}"),
            Expr::Null => write!(f, "null"),
            Expr::Undefined => write!(f, "undefined"),
            Expr::Ident(name) => write!(f, "{name}"),
            Expr::Array(items) => {
                write!(f, "[")?;
                write_list(f, items)?;
                write!(f, "]")
            }
            Expr::Object(fields) => {
                write!(f, "{{")?;
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key:?}: {value}")?;
                }
                write!(f, "}}")
            }
            Expr::Member { object, property } => write!(f, "{}.{property}", Operand(object)),
            Expr::Index { object, index } => write!(f, "{}[{index}]", Operand(object)),
            Expr::Call { callee, args } => {
                write!(f, "{}(", Operand(callee))?;
                write_list(f, args)?;
                write!(f, ")")
            }
            Expr::Unary { op, operand } => write!(f, "{}{}", op.symbol(), Operand(operand)),
            Expr::Binary { op, left, right } => {
                write!(f, "{} {} {}", Operand(left), op.symbol(), Operand(right))
            }
            Expr::Logical { op, left, right } => {
                write!(f, "{} {} {}", Operand(left), op.symbol(), Operand(right))
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => write!(
                f,
                "{} ? {} : {}",
                Operand(test),
                Operand(consequent),
                Operand(alternate)
            ),
            Expr::Arrow { params, body } => {
                write!(f, "({}) => {body}", params.join(", "))
            }
        }
    }
}
