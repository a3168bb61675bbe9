/// Primitive and composite types of the language. `Float` is 64-bit double
/// precision; see DESIGN.md for the width decision.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Int,
    Float,
    Bool,
    Str,
    Struct(String),
    Void,
}

impl Type {
    /// Natural size in bytes, used for struct field layout.
    pub fn size(&self) -> i64 {
        match self {
            Type::Bool => 1,
            Type::Int => 4,
            Type::Float => 8,
            Type::Str => 8,
            Type::Struct(_) => 8,
            Type::Void => 0,
        }
    }

    /// Natural alignment in bytes.
    pub fn align(&self) -> i64 {
        self.size().max(1)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Type::Float)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

impl BinaryOperator {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Equal
                | BinaryOperator::NotEqual
                | BinaryOperator::Less
                | BinaryOperator::LessEqual
                | BinaryOperator::Greater
                | BinaryOperator::GreaterEqual
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOperator::And | BinaryOperator::Or)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Not,
    Plus,
}

#[derive(Debug, Clone)]
pub enum Expr {
    IntLit(i64),
    FloatLit(f64),
    BoolLit(bool),
    StringLit(String),

    Variable {
        name: String,
        line: usize,
        column: usize,
    },

    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },

    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expr>,
    },

    /// Pre- or post-increment/decrement of a variable.
    IncDec {
        target: Box<Expr>,
        increment: bool,
        prefix: bool,
    },

    FunctionCall {
        name: String,
        args: Vec<Expr>,
        line: usize,
        column: usize,
    },

    /// `base.field` where `base` must name a struct variable.
    MemberAccess {
        base: String,
        field: String,
        line: usize,
        column: usize,
    },
}

impl Expr {
    /// Literal-ness drives the spill decision in expression lowering and the
    /// operand-swap peephole for subtraction.
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Expr::IntLit(_) | Expr::FloatLit(_) | Expr::BoolLit(_) | Expr::StringLit(_)
        )
    }

    pub fn position(&self) -> Option<(usize, usize)> {
        match self {
            Expr::Variable { line, column, .. }
            | Expr::FunctionCall { line, column, .. }
            | Expr::MemberAccess { line, column, .. } => Some((*line, *column)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone)]
pub enum Statement {
    VarDecl {
        name: String,
        ty: Type,
        init: Option<Expr>,
        line: usize,
        column: usize,
    },

    StructVarDecl {
        name: String,
        struct_name: String,
        line: usize,
        column: usize,
    },

    Assignment {
        target: Expr,
        value: Expr,
    },

    CompoundAssignment {
        target: Expr,
        op: BinaryOperator,
        value: Expr,
    },

    /// The ternary-style conditional statement: `cond ? { then } : { else }`.
    Conditional {
        condition: Expr,
        then_block: Vec<Statement>,
        else_block: Option<Vec<Statement>>,
    },

    /// The while loop: `@ cond { body }`.
    Loop {
        condition: Expr,
        body: Vec<Statement>,
    },

    Block(Vec<Statement>),

    StructDef {
        name: String,
        fields: Vec<Field>,
        line: usize,
        column: usize,
    },

    FunctionDef {
        name: String,
        params: Vec<Param>,
        return_type: Type,
        body: Vec<Statement>,
        line: usize,
        column: usize,
    },

    Return {
        value: Option<Expr>,
    },

    /// An expression evaluated for its effect, e.g. `print(x);` or `i++;`.
    Expression(Expr),
}

#[derive(Debug, Clone, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}
