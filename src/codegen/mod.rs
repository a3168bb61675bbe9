pub mod expr;
pub mod frame;
pub mod ops;
pub mod pool;
pub mod regs;
pub mod writer;

use crate::analyzer::SymbolTable;
use crate::errors::{CompileError, ErrorCode, SourceFile};
use crate::parser::ast::*;

use self::expr::Loc;
use self::frame::Frame;
use self::pool::{float_text, FloatWidth, LiteralPool};
use self::regs::{Reg, Xmm, ARG_GPR, ARG_SSE};
use self::writer::AsmWriter;

/// Generation context threaded through every emission call: the current
/// body buffer, the literal pools, the active stack frame and the label
/// counter. One instance per translation unit.
pub struct CodeGenerator<'a> {
    pub(crate) symbols: &'a SymbolTable,
    source: Option<&'a SourceFile>,
    pub errors: Vec<CompileError>,
    pub(crate) code: AsmWriter,
    pub(crate) pool: LiteralPool,
    pub(crate) frame: Frame,
    /// Number of binary-operand spills currently live, selecting which
    /// temp slot the next one parks in.
    pub(crate) spill_depth: usize,
    label_counter: usize,
}

/// Runs code generation over an analyzed program. Diagnostics raised during
/// emission are appended to `diagnostics`; the assembly text is returned
/// even when errors occurred, so a failing compile still leaves inspectable
/// output.
pub fn generate_code(
    program: &Program,
    symbols: &SymbolTable,
    source: &SourceFile,
    diagnostics: &mut Vec<CompileError>,
) -> String {
    let mut generator = CodeGenerator::new(symbols).with_source(source);
    let asm = generator.generate(program);
    diagnostics.append(&mut generator.errors);
    asm
}

impl<'a> CodeGenerator<'a> {
    pub fn new(symbols: &'a SymbolTable) -> Self {
        CodeGenerator {
            symbols,
            source: None,
            errors: Vec::new(),
            code: AsmWriter::new(),
            pool: LiteralPool::new(),
            frame: Frame::new(),
            spill_depth: 0,
            label_counter: 0,
        }
    }

    pub fn with_source(mut self, source: &'a SourceFile) -> Self {
        self.source = Some(source);
        self
    }

    pub fn generate(&mut self, program: &Program) -> String {
        for stmt in &program.statements {
            self.collect_literals_stmt(stmt);
        }

        // Function bodies come first in .text, the program body under _start
        // follows them.
        let mut functions = AsmWriter::new();
        for stmt in &program.statements {
            if let Statement::FunctionDef {
                name, params, body, ..
            } = stmt
            {
                let function = self.gen_function(name, params, body);
                functions.append(&function);
            }
        }

        self.frame = Frame::new();
        let saved = std::mem::take(&mut self.code);
        for stmt in &program.statements {
            if !matches!(stmt, Statement::FunctionDef { .. }) {
                self.gen_statement(stmt);
            }
        }
        let body = std::mem::take(&mut self.code);
        self.code = saved;
        let main_frame = self.frame.frame_size();

        let mut out = AsmWriter::new();
        out.raw("# Generated by mica");
        out.blank();
        self.pool.emit(&mut out);
        out.section(".text");
        out.section(".globl _start");
        out.blank();
        out.append(&functions);
        out.label("_start");
        out.ins("pushq %rbp");
        out.ins("movq %rsp, %rbp");
        out.ins(&format!("subq ${}, %rsp", main_frame));
        out.append(&body);
        out.ins("movq %rbp, %rsp");
        out.ins("popq %rbp");
        out.ins("movq $60, %rax");
        out.ins("xorq %rdi, %rdi");
        out.ins("syscall");
        out.take()
    }

    /// Two-pass function emission: the body is generated into a scratch
    /// buffer while the frame assigns slots, then the prologue claims the
    /// final 16-rounded frame size in a single subq.
    fn gen_function(&mut self, name: &str, params: &[Param], body: &[Statement]) -> AsmWriter {
        self.frame = Frame::new();
        let saved = std::mem::take(&mut self.code);

        let mut gpr_index = 0usize;
        let mut sse_index = 0usize;
        for param in params {
            let offset = self.frame.alloc(&param.name, param.ty.clone());
            match param.ty {
                Type::Float => {
                    if sse_index < ARG_SSE.len() {
                        self.code.ins(&format!(
                            "movsd {}, {}(%rbp)",
                            ARG_SSE[sse_index].name(),
                            offset
                        ));
                    } else {
                        self.code.comment("float parameter beyond register capacity");
                    }
                    sse_index += 1;
                }
                Type::Bool => {
                    if gpr_index < ARG_GPR.len() {
                        self.code
                            .ins(&format!("movb {}, {}(%rbp)", ARG_GPR[gpr_index].b(), offset));
                    } else {
                        self.code.comment("parameter beyond register capacity");
                    }
                    gpr_index += 1;
                }
                Type::Str => {
                    if gpr_index < ARG_GPR.len() {
                        self.code
                            .ins(&format!("movq {}, {}(%rbp)", ARG_GPR[gpr_index].q(), offset));
                    } else {
                        self.code.comment("parameter beyond register capacity");
                    }
                    gpr_index += 1;
                }
                _ => {
                    if gpr_index < ARG_GPR.len() {
                        self.code
                            .ins(&format!("movl {}, {}(%rbp)", ARG_GPR[gpr_index].l(), offset));
                    } else {
                        self.code.comment("parameter beyond register capacity");
                    }
                    gpr_index += 1;
                }
            }
        }

        for stmt in body {
            self.gen_statement(stmt);
        }
        let body_code = std::mem::take(&mut self.code);
        self.code = saved;

        let mut out = AsmWriter::new();
        out.label(name);
        out.ins("pushq %rbp");
        out.ins("movq %rsp, %rbp");
        out.ins(&format!("subq ${}, %rsp", self.frame.frame_size()));
        out.append(&body_code);
        // Fallback epilogue for bodies that run off the end.
        out.ins("movq %rbp, %rsp");
        out.ins("popq %rbp");
        out.ins("ret");
        out.blank();
        out
    }

    fn gen_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::VarDecl { name, ty, init, .. } => {
                let offset = self.frame.alloc(name, ty.clone());
                if let Some(init) = init {
                    let loc = self.gen_expr(init, Reg::Rax);
                    self.store_scalar(offset, ty, loc);
                }
            }
            Statement::StructVarDecl {
                name,
                struct_name,
                line,
                column,
            } => match self.symbols.lookup_struct(struct_name) {
                Some(info) => {
                    let size = info.size;
                    self.frame.alloc_struct(name, struct_name, size);
                }
                None => self.report(
                    ErrorCode::NotAStruct,
                    &format!("'{}' is not a struct type", struct_name),
                    *line,
                    *column,
                ),
            },
            Statement::Assignment { target, value } => self.gen_assignment(target, value),
            Statement::CompoundAssignment { target, op, value } => {
                self.gen_compound(target, *op, value)
            }
            Statement::Conditional {
                condition,
                then_block,
                else_block,
            } => self.gen_conditional(condition, then_block, else_block.as_deref()),
            Statement::Loop { condition, body } => self.gen_loop(condition, body),
            Statement::Block(stmts) => self.gen_scoped(stmts),
            Statement::StructDef { .. } => {}
            Statement::FunctionDef { .. } => {}
            Statement::Return { value } => {
                if let Some(value) = value {
                    let loc = self.gen_expr(value, Reg::Rax);
                    self.move_to_gpr(loc, Reg::Rax);
                }
                self.code.ins("movq %rbp, %rsp");
                self.code.ins("popq %rbp");
                self.code.ins("ret");
            }
            Statement::Expression(expr) => {
                self.gen_expr(expr, Reg::Rax);
            }
        }
    }

    fn gen_assignment(&mut self, target: &Expr, value: &Expr) {
        match target {
            Expr::Variable { name, line, column } => {
                let Some(var) = self.frame.lookup(name).cloned() else {
                    self.report(
                        ErrorCode::UndefinedVariable,
                        &format!("Undefined variable '{}'", name),
                        *line,
                        *column,
                    );
                    return;
                };
                let loc = self.gen_expr(value, Reg::Rax);
                self.store_scalar(var.offset, &var.ty, loc);
            }
            Expr::MemberAccess {
                base,
                field,
                line,
                column,
            } => {
                let Some((offset, ty)) = self.member_slot(base, field, *line, *column) else {
                    return;
                };
                let loc = self.gen_expr(value, Reg::Rax);
                self.store_scalar(offset, &ty, loc);
            }
            _ => {
                // Already rejected by the analyzer; leave a marker and move on.
                self.code.comment("skipped assignment to non-lvalue");
            }
        }
    }

    /// Compound assignment evaluates the right-hand side first, then loads
    /// the current value into the alternate register, so a spilling
    /// right-hand side cannot clobber the reload.
    fn gen_compound(&mut self, target: &Expr, op: BinaryOperator, value: &Expr) {
        let (offset, ty) = match target {
            Expr::Variable { name, line, column } => match self.frame.lookup(name).cloned() {
                Some(var) => (var.offset, var.ty),
                None => {
                    self.report(
                        ErrorCode::UndefinedVariable,
                        &format!("Undefined variable '{}'", name),
                        *line,
                        *column,
                    );
                    return;
                }
            },
            Expr::MemberAccess {
                base,
                field,
                line,
                column,
            } => match self.member_slot(base, field, *line, *column) {
                Some(slot) => slot,
                None => return,
            },
            _ => {
                self.code.comment("skipped compound assignment to non-lvalue");
                return;
            }
        };

        if ty.is_float() {
            self.gen_expr(value, Reg::Rax);
            self.code.ins(&format!("movsd {}(%rbp), %xmm1", offset));
            self.emit_float_arith(op, Xmm::Xmm1, Xmm::Xmm0, Xmm::Xmm0);
            self.code.ins(&format!("movsd %xmm0, {}(%rbp)", offset));
        } else {
            let loc = self.gen_expr(value, Reg::Rax);
            self.move_to_gpr(loc, Reg::Rax);
            self.code.ins(&format!("movl {}(%rbp), %ebx", offset));
            self.emit_int_binary(op, Reg::Rbx, Reg::Rax, Reg::Rax, false);
            self.store_scalar(offset, &ty, Loc::Gpr(Reg::Rax));
        }
    }

    fn gen_conditional(
        &mut self,
        condition: &Expr,
        then_block: &[Statement],
        else_block: Option<&[Statement]>,
    ) {
        let loc = self.gen_expr(condition, Reg::Rax);
        self.move_to_gpr(loc, Reg::Rax);
        self.code.ins("testq %rax, %rax");
        match else_block {
            Some(else_stmts) => {
                let else_label = self.new_label("else");
                let end_label = self.new_label("endif");
                self.code.ins(&format!("jz {}", else_label));
                self.gen_scoped(then_block);
                self.code.ins(&format!("jmp {}", end_label));
                self.code.label(&else_label);
                self.gen_scoped(else_stmts);
                self.code.label(&end_label);
            }
            None => {
                let end_label = self.new_label("endif");
                self.code.ins(&format!("jz {}", end_label));
                self.gen_scoped(then_block);
                self.code.label(&end_label);
            }
        }
    }

    fn gen_loop(&mut self, condition: &Expr, body: &[Statement]) {
        let loop_label = self.new_label("loop");
        let end_label = self.new_label("endloop");
        self.code.label(&loop_label);
        let loc = self.gen_expr(condition, Reg::Rax);
        self.move_to_gpr(loc, Reg::Rax);
        self.code.ins("testq %rax, %rax");
        self.code.ins(&format!("jz {}", end_label));
        self.gen_scoped(body);
        self.code.ins(&format!("jmp {}", loop_label));
        self.code.label(&end_label);
    }

    fn gen_scoped(&mut self, stmts: &[Statement]) {
        let mark = self.frame.mark();
        for stmt in stmts {
            self.gen_statement(stmt);
        }
        self.frame.release(mark);
    }

    pub(crate) fn store_scalar(&mut self, offset: i64, ty: &Type, loc: Loc) {
        match ty {
            Type::Float => {
                self.code.ins(&format!("movsd %xmm0, {}(%rbp)", offset));
            }
            Type::Int => {
                self.code
                    .ins(&format!("movl {}, {}(%rbp)", loc.gpr().l(), offset));
            }
            Type::Bool => {
                self.code
                    .ins(&format!("movb {}, {}(%rbp)", loc.gpr().b(), offset));
            }
            Type::Str => {
                self.code
                    .ins(&format!("movq {}, {}(%rbp)", loc.gpr().q(), offset));
            }
            Type::Struct(_) | Type::Void => {
                self.code.comment("cannot store a non-scalar value");
            }
        }
    }

    /// Effective RBP displacement and type of `base.field`.
    pub(crate) fn member_slot(
        &mut self,
        base: &str,
        field: &str,
        line: usize,
        column: usize,
    ) -> Option<(i64, Type)> {
        let Some(var) = self.frame.lookup(base).cloned() else {
            self.report(
                ErrorCode::UndefinedVariable,
                &format!("Undefined variable '{}'", base),
                line,
                column,
            );
            return None;
        };
        let Type::Struct(struct_name) = &var.ty else {
            self.report(
                ErrorCode::NotAStruct,
                &format!("'{}' is not a struct", base),
                line,
                column,
            );
            return None;
        };
        let Some(info) = self.symbols.lookup_struct(struct_name) else {
            self.report(
                ErrorCode::NotAStruct,
                &format!("Unknown struct type '{}'", struct_name),
                line,
                column,
            );
            return None;
        };
        match info.field(field) {
            Some(f) => Some((var.offset + f.offset, f.ty.clone())),
            None => {
                let message = format!("Struct '{}' has no field '{}'", struct_name, field);
                self.report(ErrorCode::UnknownStructField, &message, line, column);
                None
            }
        }
    }

    /// Best-effort type of an expression from the frame and symbol table.
    /// Comparisons and logical operators type as bool regardless of their
    /// operands; arithmetic probes the left child first.
    pub(crate) fn expr_type(&self, expr: &Expr) -> Option<Type> {
        match expr {
            Expr::IntLit(_) => Some(Type::Int),
            Expr::FloatLit(_) => Some(Type::Float),
            Expr::BoolLit(_) => Some(Type::Bool),
            Expr::StringLit(_) => Some(Type::Str),
            Expr::Variable { name, .. } => self.frame.lookup(name).map(|v| v.ty.clone()),
            Expr::BinaryOp { left, op, right } => {
                if op.is_comparison() || op.is_logical() {
                    Some(Type::Bool)
                } else {
                    self.expr_type(left).or_else(|| self.expr_type(right))
                }
            }
            Expr::UnaryOp { op, operand } => match op {
                UnaryOperator::Not => Some(Type::Bool),
                _ => self.expr_type(operand),
            },
            Expr::IncDec { .. } => Some(Type::Int),
            Expr::FunctionCall { name, .. } => match name.as_str() {
                "print" | "exit" => Some(Type::Void),
                _ => self
                    .symbols
                    .lookup_function(name)
                    .map(|info| info.return_type.clone()),
            },
            Expr::MemberAccess { base, field, .. } => match self.frame.lookup(base) {
                Some(var) => match &var.ty {
                    Type::Struct(struct_name) => self
                        .symbols
                        .lookup_struct(struct_name)
                        .and_then(|info| info.field(field))
                        .map(|f| f.ty.clone()),
                    _ => None,
                },
                None => None,
            },
        }
    }

    fn new_label(&mut self, prefix: &str) -> String {
        let label = format!(".L{}_{}", prefix, self.label_counter);
        self.label_counter += 1;
        label
    }

    pub(crate) fn report(&mut self, code: ErrorCode, message: &str, line: usize, column: usize) {
        let mut error = CompileError::new(code, message);
        if let Some(source) = self.source {
            error = error.with_location(source.make_location(line, column));
        }
        self.errors.push(error);
    }

    // Pre-pass over the whole tree so every literal owns a .rodata label
    // before any instruction references it.

    fn collect_literals_stmt(&mut self, stmt: &Statement) {
        match stmt {
            Statement::VarDecl { init, .. } => {
                if let Some(init) = init {
                    self.collect_literals_expr(init);
                }
            }
            Statement::Assignment { value, .. } | Statement::CompoundAssignment { value, .. } => {
                self.collect_literals_expr(value);
            }
            Statement::Conditional {
                condition,
                then_block,
                else_block,
            } => {
                self.collect_literals_expr(condition);
                for s in then_block {
                    self.collect_literals_stmt(s);
                }
                if let Some(else_block) = else_block {
                    for s in else_block {
                        self.collect_literals_stmt(s);
                    }
                }
            }
            Statement::Loop { condition, body } => {
                self.collect_literals_expr(condition);
                for s in body {
                    self.collect_literals_stmt(s);
                }
            }
            Statement::Block(stmts) | Statement::FunctionDef { body: stmts, .. } => {
                for s in stmts {
                    self.collect_literals_stmt(s);
                }
            }
            Statement::Return { value: Some(value) } => self.collect_literals_expr(value),
            Statement::Expression(expr) => self.collect_literals_expr(expr),
            _ => {}
        }
    }

    fn collect_literals_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::StringLit(s) => {
                self.pool.intern_string(s);
            }
            Expr::FloatLit(v) => {
                self.pool.intern_float(&float_text(*v), FloatWidth::Double);
            }
            Expr::BinaryOp { left, right, .. } => {
                self.collect_literals_expr(left);
                self.collect_literals_expr(right);
            }
            Expr::UnaryOp { operand, .. } => self.collect_literals_expr(operand),
            Expr::IncDec { target, .. } => self.collect_literals_expr(target),
            Expr::FunctionCall { args, .. } => {
                for arg in args {
                    self.collect_literals_expr(arg);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn compile(source: &str) -> (String, Vec<CompileError>) {
        let source_file = SourceFile::new("test.mc", source);
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize();
        assert!(lexer.errors.is_empty(), "lex errors: {:?}", lexer.errors);
        let program = Parser::new(tokens).parse().expect("parse failed");
        let mut analyzer = Analyzer::new();
        analyzer.analyze(&program);
        let mut diagnostics = analyzer.errors;
        let asm = generate_code(&program, &analyzer.symbols, &source_file, &mut diagnostics);
        (asm, diagnostics)
    }

    #[test]
    fn test_empty_program_is_preamble_and_epilogue() {
        let (asm, errors) = compile("");
        assert!(errors.is_empty());
        assert!(asm.contains(".globl _start"));
        assert!(asm.contains("_start:"));
        assert!(asm.contains("movq $60, %rax"));
        assert!(asm.contains("syscall"));
        assert!(!asm.contains(".rodata"));
    }

    #[test]
    fn test_declaration_and_exit() {
        let (asm, errors) = compile("int x = 5; int y = x + 2; exit(y);");
        assert!(errors.is_empty(), "unexpected: {:?}", errors);
        assert!(asm.contains("movl $5, %eax"));
        assert!(asm.contains("movl %eax, -24(%rbp)"));
        assert!(asm.contains("movl %eax, -32(%rbp)"));
        assert!(asm.contains("call exit_program"));
    }

    #[test]
    fn test_conditional_labels() {
        let (asm, errors) = compile("int x = 1; x > 0 ? { print(1); } : { print(2); }");
        assert!(errors.is_empty(), "unexpected: {:?}", errors);
        assert!(asm.contains("testq %rax, %rax"));
        assert!(asm.contains("jz .Lelse_0"));
        assert!(asm.contains("jmp .Lendif_1"));
        assert!(asm.contains(".Lelse_0:"));
        assert!(asm.contains(".Lendif_1:"));
    }

    #[test]
    fn test_loop_shape() {
        let (asm, errors) = compile("int i = 10; @ i > 0 { i -= 1; } exit(i);");
        assert!(errors.is_empty(), "unexpected: {:?}", errors);
        assert!(asm.contains(".Lloop_0:"));
        assert!(asm.contains("jz .Lendloop_1"));
        assert!(asm.contains("jmp .Lloop_0"));
        assert!(asm.contains(".Lendloop_1:"));
    }

    #[test]
    fn test_block_scope_releases_slots() {
        let (asm, errors) = compile("{ int a = 1; } { int b = 2; }");
        assert!(errors.is_empty(), "unexpected: {:?}", errors);
        let stores = asm.matches("-24(%rbp)").count();
        assert!(stores >= 2, "both blocks should reuse the first slot:\n{}", asm);
        assert!(!asm.contains("-32(%rbp)"));
    }

    #[test]
    fn test_function_definition_and_call() {
        let source = "fn add(int a, int b) -> int { return a + b; } int r = add(4, 5); exit(r);";
        let (asm, errors) = compile(source);
        assert!(errors.is_empty(), "unexpected: {:?}", errors);
        assert_eq!(asm.matches("add:").count(), 1);
        assert!(asm.contains("movl %edi, -24(%rbp)"));
        assert!(asm.contains("movl %esi, -32(%rbp)"));
        assert!(asm.contains("movl $4, %eax"));
        assert!(asm.contains("movq %rax, 0(%rsp)"));
        assert!(asm.contains("movl $5, %eax"));
        assert!(asm.contains("movq %rax, 8(%rsp)"));
        assert!(asm.contains("movq 0(%rsp), %rdi"));
        assert!(asm.contains("movq 8(%rsp), %rsi"));
        assert!(asm.contains("call add"));
        let start = asm.find("add:").unwrap();
        assert!(start < asm.find("_start:").unwrap());
    }

    #[test]
    fn test_struct_member_store_and_load() {
        let source = "struct Point { int x; int y; } Point p; p.x = 3; p.y = 4; int s = p.x + p.y; exit(s);";
        let (asm, errors) = compile(source);
        assert!(errors.is_empty(), "unexpected: {:?}", errors);
        assert!(asm.contains("movl %eax, -24(%rbp)"));
        assert!(asm.contains("movl %eax, -20(%rbp)"));
        assert!(asm.contains("movl -24(%rbp), %eax"));
        assert!(asm.contains("movl -20(%rbp), %eax"));
    }

    #[test]
    fn test_float_subtraction_and_print() {
        let (asm, errors) = compile("float a = 3.0; float b = 1.5; print(a - b);");
        assert!(errors.is_empty(), "unexpected: {:?}", errors);
        assert!(asm.contains(".DOUBLE_0:\n    .double 3.0"));
        assert!(asm.contains(".DOUBLE_1:\n    .double 1.5"));
        assert!(asm.contains("subsd"));
        assert!(asm.contains("call print_float"));
    }

    #[test]
    fn test_string_literals_dedup() {
        let (asm, errors) = compile("string s = \"hi\"; print(s); print(\"hi\");");
        assert!(errors.is_empty(), "unexpected: {:?}", errors);
        assert_eq!(asm.matches(".string \"hi\"").count(), 1);
        assert!(asm.contains("call print_str_z"));
    }

    #[test]
    fn test_compound_assignment_subtracts_in_place() {
        let (asm, errors) = compile("int i = 10; i -= 1;");
        assert!(errors.is_empty(), "unexpected: {:?}", errors);
        assert!(asm.contains("movl -24(%rbp), %ebx"));
        assert!(asm.contains("movl %eax, %r11d"));
        assert!(asm.contains("subl %r11d, %eax"));
    }

    #[test]
    fn test_frame_size_is_16_rounded() {
        let (asm, _) = compile("int a = 1;");
        // 16 reserved temp bytes plus one 8-byte slot rounds to 32.
        assert!(asm.contains("subq $32, %rsp"));
    }

    #[test]
    fn test_double_negation_uses_sign_mask_once() {
        let (asm, errors) = compile("float a = 1.5; float b = -(-a); print(b);");
        assert!(errors.is_empty(), "unexpected: {:?}", errors);
        assert_eq!(asm.matches(".LC_SIGN_MASK:").count(), 1);
        assert_eq!(asm.matches("xorpd .LC_SIGN_MASK(%rip), %xmm0").count(), 2);
    }

    #[test]
    fn test_bool_expression_prints_via_runtime() {
        let (asm, errors) = compile("bool ok = (2 * 3) == 6 && !(1 > 2); print(ok);");
        assert!(errors.is_empty(), "unexpected: {:?}", errors);
        assert!(asm.contains("imull"));
        assert!(asm.contains("sete %al"));
        assert!(asm.contains("andl"));
        assert!(asm.contains("call print_bool"));
    }

    #[test]
    fn test_division_rescues_divisor() {
        let (asm, errors) = compile("int a = 10; int b = 2; int c = a / b; exit(c);");
        assert!(errors.is_empty(), "unexpected: {:?}", errors);
        assert!(asm.contains("movl %eax, %ecx"));
        assert!(asm.contains("cltd"));
        assert!(asm.contains("idivl %ecx"));
    }
}
