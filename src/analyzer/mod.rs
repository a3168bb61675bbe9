use crate::errors::{find_similar_name, CompileError, ErrorCode, SourceFile};
use crate::parser::ast::*;
use std::collections::HashMap;

/// A struct field with its layout offset assigned.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub name: String,
    pub ty: Type,
    pub offset: i64,
}

#[derive(Debug, Clone)]
pub struct StructInfo {
    pub name: String,
    pub fields: Vec<FieldInfo>,
    pub size: i64,
}

impl StructInfo {
    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Type,
}

/// Symbol table produced by the semantic pass and consumed by code
/// generation: function signatures and struct layouts.
#[derive(Debug, Default)]
pub struct SymbolTable {
    pub structs: HashMap<String, StructInfo>,
    pub functions: HashMap<String, FunctionInfo>,
}

impl SymbolTable {
    pub fn lookup_struct(&self, name: &str) -> Option<&StructInfo> {
        self.structs.get(name)
    }

    pub fn lookup_function(&self, name: &str) -> Option<&FunctionInfo> {
        self.functions.get(name)
    }
}

fn align_up(value: i64, align: i64) -> i64 {
    (value + align - 1) & !(align - 1)
}

/// Lay a struct out field by field: align each field to its natural
/// alignment, then round the total up to 8.
pub fn layout_struct(name: &str, fields: &[Field]) -> StructInfo {
    let mut offset = 0i64;
    let mut laid_out = Vec::with_capacity(fields.len());
    for field in fields {
        offset = align_up(offset, field.ty.align());
        laid_out.push(FieldInfo {
            name: field.name.clone(),
            ty: field.ty.clone(),
            offset,
        });
        offset += field.ty.size();
    }
    StructInfo {
        name: name.to_string(),
        fields: laid_out,
        size: align_up(offset.max(1), 8),
    }
}

pub struct Analyzer<'a> {
    pub symbols: SymbolTable,
    pub errors: Vec<CompileError>,
    scopes: Vec<HashMap<String, Type>>,
    source: Option<&'a SourceFile>,
    current_return: Option<Type>,
}

impl<'a> Analyzer<'a> {
    pub fn new() -> Self {
        Analyzer {
            symbols: SymbolTable::default(),
            errors: Vec::new(),
            scopes: vec![HashMap::new()],
            source: None,
            current_return: None,
        }
    }

    pub fn with_source(mut self, source: &'a SourceFile) -> Self {
        self.source = Some(source);
        self
    }

    fn report(&mut self, code: ErrorCode, message: &str, line: usize, column: usize) {
        let mut err = CompileError::new(code, message);
        if let Some(src) = self.source {
            err = err.with_location(src.make_location(line, column));
        }
        self.errors.push(err);
    }

    fn report_undefined(&mut self, name: &str, line: usize, column: usize) {
        let mut err = CompileError::new(
            ErrorCode::UndefinedVariable,
            &format!("undefined variable '{}'", name),
        );
        if let Some(src) = self.source {
            err = err.with_location(src.make_location(line, column));
        }
        let in_scope: Vec<&str> = self
            .scopes
            .iter()
            .flat_map(|s| s.keys().map(|k| k.as_str()))
            .collect();
        if let Some(suggestion) = find_similar_name(name, in_scope) {
            err = err.with_suggestion(&suggestion);
        }
        self.errors.push(err);
    }

    fn declare(&mut self, name: &str, ty: Type, line: usize, column: usize) {
        let already = self
            .scopes
            .last()
            .map(|s| s.contains_key(name))
            .unwrap_or(false);
        if already {
            self.report(
                ErrorCode::DuplicateDefinition,
                &format!("variable '{}' is already declared in this scope", name),
                line,
                column,
            );
            return;
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), ty);
        }
    }

    fn lookup_var(&self, name: &str) -> Option<&Type> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }

    pub fn analyze(&mut self, program: &Program) {
        // First pass: collect struct layouts and function signatures so
        // forward references resolve.
        for stmt in &program.statements {
            match stmt {
                Statement::StructDef { name, fields, line, column } => {
                    if self.symbols.structs.contains_key(name) {
                        self.report(
                            ErrorCode::DuplicateDefinition,
                            &format!("struct '{}' is already defined", name),
                            *line,
                            *column,
                        );
                        continue;
                    }
                    self.symbols
                        .structs
                        .insert(name.clone(), layout_struct(name, fields));
                }
                Statement::FunctionDef { name, params, return_type, line, column, .. } => {
                    if self.symbols.functions.contains_key(name) {
                        self.report(
                            ErrorCode::DuplicateDefinition,
                            &format!("function '{}' is already defined", name),
                            *line,
                            *column,
                        );
                        continue;
                    }
                    self.symbols.functions.insert(
                        name.clone(),
                        FunctionInfo {
                            name: name.clone(),
                            params: params.clone(),
                            return_type: return_type.clone(),
                        },
                    );
                }
                _ => {}
            }
        }

        // Second pass: check every statement.
        for stmt in &program.statements {
            self.analyze_statement(stmt);
        }
    }

    fn analyze_block(&mut self, block: &[Statement]) {
        self.scopes.push(HashMap::new());
        for stmt in block {
            self.analyze_statement(stmt);
        }
        self.scopes.pop();
    }

    fn analyze_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::VarDecl { name, ty, init, line, column } => {
                if let Some(init) = init {
                    self.analyze_expr(init);
                    if let Some(init_ty) = self.infer_type(init) {
                        if init_ty != *ty {
                            self.report(
                                ErrorCode::TypeMismatch,
                                &format!(
                                    "cannot initialize '{}' of type {:?} with a {:?} value",
                                    name, ty, init_ty
                                ),
                                *line,
                                *column,
                            );
                        }
                    }
                }
                self.declare(name, ty.clone(), *line, *column);
            }

            Statement::StructVarDecl { name, struct_name, line, column } => {
                if self.symbols.lookup_struct(struct_name).is_none() {
                    self.report(
                        ErrorCode::NotAStruct,
                        &format!("'{}' does not name a struct", struct_name),
                        *line,
                        *column,
                    );
                }
                self.declare(name, Type::Struct(struct_name.clone()), *line, *column);
            }

            Statement::Assignment { target, value } => {
                self.check_lvalue(target);
                self.analyze_expr(target);
                self.analyze_expr(value);
                if let (Some(target_ty), Some(value_ty)) =
                    (self.infer_type(target), self.infer_type(value))
                {
                    if target_ty != value_ty {
                        let (line, column) = target.position().unwrap_or((0, 0));
                        self.report(
                            ErrorCode::TypeMismatch,
                            &format!(
                                "cannot assign a {:?} value to a {:?} place",
                                value_ty, target_ty
                            ),
                            line,
                            column,
                        );
                    }
                }
            }

            Statement::CompoundAssignment { target, op, value } => {
                self.check_lvalue(target);
                self.analyze_expr(target);
                self.analyze_expr(value);
                let target_ty = self.infer_type(target);
                let value_ty = self.infer_type(value);
                if let Some(ty) = &target_ty {
                    if !matches!(ty, Type::Int | Type::Float) {
                        let (line, column) = target.position().unwrap_or((0, 0));
                        self.report(
                            ErrorCode::InvalidOperationForType,
                            &format!("{:?} is not defined for {:?} values", op, ty),
                            line,
                            column,
                        );
                    }
                }
                if let (Some(t), Some(v)) = (&target_ty, &value_ty) {
                    if t != v {
                        let (line, column) = target.position().unwrap_or((0, 0));
                        self.report(
                            ErrorCode::TypeMismatch,
                            &format!(
                                "cannot combine a {:?} value into a {:?} place with {:?}",
                                v, t, op
                            ),
                            line,
                            column,
                        );
                    }
                }
            }

            Statement::Conditional { condition, then_block, else_block } => {
                self.analyze_expr(condition);
                self.check_condition(condition);
                self.analyze_block(then_block);
                if let Some(block) = else_block {
                    self.analyze_block(block);
                }
            }

            Statement::Loop { condition, body } => {
                self.analyze_expr(condition);
                self.check_condition(condition);
                self.analyze_block(body);
            }

            Statement::Block(statements) => self.analyze_block(statements),

            Statement::StructDef { .. } => {}

            Statement::FunctionDef { params, return_type, body, .. } => {
                let saved_scopes = std::mem::replace(&mut self.scopes, vec![HashMap::new()]);
                let saved_return =
                    std::mem::replace(&mut self.current_return, Some(return_type.clone()));

                if let Some(scope) = self.scopes.last_mut() {
                    for param in params {
                        scope.insert(param.name.clone(), param.ty.clone());
                    }
                }
                for stmt in body {
                    self.analyze_statement(stmt);
                }

                self.scopes = saved_scopes;
                self.current_return = saved_return;
            }

            Statement::Return { value } => {
                if let Some(value) = value {
                    self.analyze_expr(value);
                }
                if self.current_return.is_none() {
                    let (line, column) = value
                        .as_ref()
                        .and_then(|v| v.position())
                        .unwrap_or((0, 0));
                    self.report(
                        ErrorCode::InvalidExpression,
                        "return outside of a function",
                        line,
                        column,
                    );
                }
            }

            Statement::Expression(expr) => self.analyze_expr(expr),
        }
    }

    fn check_condition(&mut self, condition: &Expr) {
        if let Some(ty) = self.infer_type(condition) {
            if ty != Type::Bool {
                let (line, column) = condition.position().unwrap_or((0, 0));
                self.report(
                    ErrorCode::TypeMismatch,
                    &format!("condition must be bool, found {:?}", ty),
                    line,
                    column,
                );
            }
        }
    }

    fn check_lvalue(&mut self, target: &Expr) {
        match target {
            Expr::Variable { .. } | Expr::MemberAccess { .. } => {}
            _ => {
                let (line, column) = target.position().unwrap_or((0, 0));
                self.report(
                    ErrorCode::InvalidAssignmentTarget,
                    "left-hand side of assignment must be a variable or a struct member",
                    line,
                    column,
                );
            }
        }
    }

    fn analyze_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::IntLit(_) | Expr::FloatLit(_) | Expr::BoolLit(_) | Expr::StringLit(_) => {}

            Expr::Variable { name, line, column } => {
                if self.lookup_var(name).is_none() {
                    self.report_undefined(name, *line, *column);
                }
            }

            Expr::BinaryOp { left, op, right } => {
                self.analyze_expr(left);
                self.analyze_expr(right);
                let left_ty = self.infer_type(left);
                let right_ty = self.infer_type(right);
                if let (Some(lt), Some(rt)) = (&left_ty, &right_ty) {
                    let (line, column) = left
                        .position()
                        .or_else(|| right.position())
                        .unwrap_or((0, 0));
                    if lt != rt {
                        self.report(
                            ErrorCode::TypeMismatch,
                            &format!("operands of {:?} have mismatched types {:?} and {:?}", op, lt, rt),
                            line,
                            column,
                        );
                    } else if *lt == Type::Str && !matches!(op, BinaryOperator::Equal | BinaryOperator::NotEqual) {
                        self.report(
                            ErrorCode::InvalidOperationForType,
                            &format!("{:?} is not defined for string values", op),
                            line,
                            column,
                        );
                    } else if op.is_logical() && *lt != Type::Bool {
                        self.report(
                            ErrorCode::InvalidOperationForType,
                            &format!("{:?} requires bool operands, found {:?}", op, lt),
                            line,
                            column,
                        );
                    }
                }
            }

            Expr::UnaryOp { op, operand } => {
                self.analyze_expr(operand);
                if let Some(ty) = self.infer_type(operand) {
                    let valid = match op {
                        UnaryOperator::Negate | UnaryOperator::Plus => {
                            matches!(ty, Type::Int | Type::Float)
                        }
                        UnaryOperator::Not => ty == Type::Bool,
                    };
                    if !valid {
                        let (line, column) = operand.position().unwrap_or((0, 0));
                        self.report(
                            ErrorCode::InvalidOperationForType,
                            &format!("{:?} is not defined for {:?} values", op, ty),
                            line,
                            column,
                        );
                    }
                }
            }

            Expr::IncDec { target, .. } => {
                // Inc/dec is defined on int variables only.
                if !matches!(target.as_ref(), Expr::Variable { .. }) {
                    let (line, column) = target.position().unwrap_or((0, 0));
                    self.report(
                        ErrorCode::InvalidAssignmentTarget,
                        "increment and decrement require a variable",
                        line,
                        column,
                    );
                }
                self.analyze_expr(target);
                if self.infer_type(target).is_some_and(|ty| ty != Type::Int) {
                    let (line, column) = target.position().unwrap_or((0, 0));
                    self.report(
                        ErrorCode::InvalidOperationForType,
                        "increment and decrement require an int variable",
                        line,
                        column,
                    );
                }
            }

            Expr::FunctionCall { name, args, line, column } => {
                for arg in args {
                    self.analyze_expr(arg);
                }
                match name.as_str() {
                    "print" | "exit" => {
                        if args.len() != 1 {
                            self.report(
                                ErrorCode::InvalidExpression,
                                &format!("'{}' takes exactly one argument", name),
                                *line,
                                *column,
                            );
                        }
                    }
                    _ => match self.symbols.lookup_function(name) {
                        Some(info) => {
                            if info.params.len() != args.len() {
                                self.report(
                                    ErrorCode::InvalidExpression,
                                    &format!(
                                        "function '{}' takes {} argument(s), {} given",
                                        name,
                                        info.params.len(),
                                        args.len()
                                    ),
                                    *line,
                                    *column,
                                );
                            }
                        }
                        None => {
                            self.report(
                                ErrorCode::UndefinedFunction,
                                &format!("undefined function '{}'", name),
                                *line,
                                *column,
                            );
                        }
                    },
                }
            }

            Expr::MemberAccess { base, field, line, column } => {
                match self.lookup_var(base).cloned() {
                    Some(Type::Struct(struct_name)) => {
                        let known = self
                            .symbols
                            .lookup_struct(&struct_name)
                            .map(|info| info.field(field).is_some());
                        if known == Some(false) {
                            self.report(
                                ErrorCode::UnknownStructField,
                                &format!("struct '{}' has no field '{}'", struct_name, field),
                                *line,
                                *column,
                            );
                        }
                    }
                    Some(_) => {
                        self.report(
                            ErrorCode::NotAStruct,
                            &format!("'{}' is not a struct variable", base),
                            *line,
                            *column,
                        );
                    }
                    None => self.report_undefined(base, *line, *column),
                }
            }
        }
    }

    /// Best-effort type inference over the scopes and symbol table. Returns
    /// None when a sub-expression does not resolve; callers skip checks in
    /// that case so one undefined name does not cascade.
    pub fn infer_type(&self, expr: &Expr) -> Option<Type> {
        match expr {
            Expr::IntLit(_) => Some(Type::Int),
            Expr::FloatLit(_) => Some(Type::Float),
            Expr::BoolLit(_) => Some(Type::Bool),
            Expr::StringLit(_) => Some(Type::Str),
            Expr::Variable { name, .. } => self.lookup_var(name).cloned(),
            Expr::BinaryOp { left, op, right } => {
                if op.is_comparison() || op.is_logical() {
                    Some(Type::Bool)
                } else {
                    self.infer_type(left).or_else(|| self.infer_type(right))
                }
            }
            Expr::UnaryOp { op, operand } => match op {
                UnaryOperator::Not => Some(Type::Bool),
                _ => self.infer_type(operand),
            },
            Expr::IncDec { target, .. } => self.infer_type(target),
            Expr::FunctionCall { name, .. } => self
                .symbols
                .lookup_function(name)
                .map(|info| info.return_type.clone()),
            Expr::MemberAccess { base, field, .. } => match self.lookup_var(base) {
                Some(Type::Struct(struct_name)) => self
                    .symbols
                    .lookup_struct(struct_name)
                    .and_then(|info| info.field(field))
                    .map(|f| f.ty.clone()),
                _ => None,
            },
        }
    }
}

impl<'a> Default for Analyzer<'a> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn analyze(source: &str) -> (SymbolTable, Vec<CompileError>) {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize();
        let program = Parser::new(tokens).parse().expect("parse failed");
        let mut analyzer = Analyzer::new();
        analyzer.analyze(&program);
        (analyzer.symbols, analyzer.errors)
    }

    #[test]
    fn test_clean_program_has_no_errors() {
        let (_, errors) = analyze("int x = 5; int y = x + 2; exit(y);");
        assert!(errors.is_empty(), "unexpected: {:?}", errors);
    }

    #[test]
    fn test_undefined_variable() {
        let (_, errors) = analyze("int x = missing + 1;");
        assert!(errors.iter().any(|e| e.code == ErrorCode::UndefinedVariable));
    }

    #[test]
    fn test_undefined_variable_suggestion() {
        let (_, errors) = analyze("int total = 1; int y = totl + 1;");
        let err = errors
            .iter()
            .find(|e| e.code == ErrorCode::UndefinedVariable)
            .expect("expected an undefined variable error");
        assert_eq!(err.suggestion.as_deref(), Some("total"));
    }

    #[test]
    fn test_invalid_assignment_target() {
        let (_, errors) = analyze("int x = 1; 5 = x;");
        assert!(errors
            .iter()
            .any(|e| e.code == ErrorCode::InvalidAssignmentTarget));
    }

    #[test]
    fn test_string_subtraction_rejected() {
        let (_, errors) = analyze("string a = \"x\"; string b = \"y\"; bool c = a == b; int d = 0; a - b;");
        assert!(errors
            .iter()
            .any(|e| e.code == ErrorCode::InvalidOperationForType));
    }

    #[test]
    fn test_compound_assignment_operand_types_must_match() {
        let (_, errors) = analyze("float f = 1.0; f += 2;");
        assert!(errors.iter().any(|e| e.code == ErrorCode::TypeMismatch));
    }

    #[test]
    fn test_struct_layout() {
        let info = layout_struct(
            "Mixed",
            &[
                Field { name: "flag".to_string(), ty: Type::Bool },
                Field { name: "count".to_string(), ty: Type::Int },
                Field { name: "ratio".to_string(), ty: Type::Float },
            ],
        );
        assert_eq!(info.field("flag").unwrap().offset, 0);
        assert_eq!(info.field("count").unwrap().offset, 4);
        assert_eq!(info.field("ratio").unwrap().offset, 8);
        assert_eq!(info.size, 16);
    }

    #[test]
    fn test_unknown_struct_field() {
        let (_, errors) = analyze("struct Point { int x; } Point p; p.z = 1;");
        assert!(errors.iter().any(|e| e.code == ErrorCode::UnknownStructField));
    }

    #[test]
    fn test_block_scoping_does_not_leak() {
        let (_, errors) = analyze("{ int inner = 1; } int y = inner;");
        assert!(errors.iter().any(|e| e.code == ErrorCode::UndefinedVariable));
    }

    #[test]
    fn test_shadowing_is_allowed() {
        let (_, errors) = analyze("int x = 1; { int x = 2; print(x); } print(x);");
        assert!(errors.is_empty(), "unexpected: {:?}", errors);
    }

    #[test]
    fn test_function_signature_collected() {
        let (symbols, errors) =
            analyze("fn add(int a, int b) -> int { return a + b; } int r = add(4, 5);");
        assert!(errors.is_empty(), "unexpected: {:?}", errors);
        let info = symbols.lookup_function("add").unwrap();
        assert_eq!(info.params.len(), 2);
        assert_eq!(info.return_type, Type::Int);
    }
}
