use super::pool::{float_text, FloatWidth};
use super::regs::{Reg, Xmm, ARG_GPR, ARG_SSE};
use super::CodeGenerator;
use crate::errors::ErrorCode;
use crate::parser::ast::*;

/// Where an expression result ended up. Float results always land in an
/// SSE register, everything else in a general purpose register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Loc {
    Gpr(Reg),
    Sse(Xmm),
}

impl Loc {
    /// The general purpose register, or RAX as the conventional fallback
    /// when a float ended up where an integer was expected.
    pub(crate) fn gpr(self) -> Reg {
        match self {
            Loc::Gpr(r) => r,
            Loc::Sse(_) => Reg::Rax,
        }
    }
}

impl<'a> CodeGenerator<'a> {
    /// Lowers an expression, preferring `preferred` for integer-class
    /// results. Returns the location actually holding the value; any other
    /// caller-saved register may have been clobbered.
    pub(crate) fn gen_expr(&mut self, expr: &Expr, preferred: Reg) -> Loc {
        match expr {
            Expr::IntLit(v) => {
                self.code.ins(&format!("movl ${}, {}", v, preferred.l()));
                Loc::Gpr(preferred)
            }
            Expr::BoolLit(b) => {
                self.code
                    .ins(&format!("movl ${}, {}", i32::from(*b), preferred.l()));
                Loc::Gpr(preferred)
            }
            Expr::FloatLit(v) => {
                let label = self.pool.intern_float(&float_text(*v), FloatWidth::Double);
                self.code.ins(&format!("movsd {}(%rip), %xmm0", label));
                Loc::Sse(Xmm::Xmm0)
            }
            Expr::StringLit(s) => {
                let label = self.pool.intern_string(s);
                self.code
                    .ins(&format!("leaq {}(%rip), {}", label, preferred.q()));
                Loc::Gpr(preferred)
            }
            Expr::Variable { name, line, column } => {
                self.gen_variable(name, *line, *column, preferred)
            }
            Expr::BinaryOp { left, op, right } => self.gen_binary(left, *op, right),
            Expr::UnaryOp { op, operand } => self.gen_unary(*op, operand, preferred),
            Expr::IncDec {
                target,
                increment,
                prefix,
            } => self.gen_incdec(target, *increment, *prefix, preferred),
            Expr::FunctionCall {
                name,
                args,
                line,
                column,
            } => self.gen_call(name, args, *line, *column),
            Expr::MemberAccess {
                base,
                field,
                line,
                column,
            } => self.gen_member_load(base, field, *line, *column, preferred),
        }
    }

    fn gen_variable(&mut self, name: &str, line: usize, column: usize, preferred: Reg) -> Loc {
        let Some(var) = self.frame.lookup(name).cloned() else {
            self.report(
                ErrorCode::UndefinedVariable,
                &format!("Undefined variable '{}'", name),
                line,
                column,
            );
            return Loc::Gpr(preferred);
        };
        match var.ty {
            Type::Int => {
                self.code
                    .ins(&format!("movl {}(%rbp), {}", var.offset, preferred.l()));
                Loc::Gpr(preferred)
            }
            Type::Bool => {
                self.code
                    .ins(&format!("movzbl {}(%rbp), {}", var.offset, preferred.l()));
                Loc::Gpr(preferred)
            }
            Type::Float => {
                self.code
                    .ins(&format!("movsd {}(%rbp), %xmm0", var.offset));
                Loc::Sse(Xmm::Xmm0)
            }
            Type::Str => {
                self.code
                    .ins(&format!("movq {}(%rbp), {}", var.offset, preferred.q()));
                Loc::Gpr(preferred)
            }
            Type::Struct(_) | Type::Void => {
                self.code
                    .comment(&format!("variable '{}' has no scalar value", name));
                Loc::Gpr(preferred)
            }
        }
    }

    /// Binary lowering with the canonical register pairs: RAX/RBX for the
    /// integer class, XMM0/XMM1 for floats. The left operand is spilled
    /// across right-operand evaluation unless both sides are literals, in
    /// which case the right side loads straight into the alternate
    /// register. The spill slot is chosen by nesting depth, so a compound
    /// right operand cannot overwrite the value its parent parked.
    fn gen_binary(&mut self, left: &Expr, op: BinaryOperator, right: &Expr) -> Loc {
        let operand_ty = self
            .expr_type(left)
            .or_else(|| self.expr_type(right))
            .unwrap_or(Type::Int);

        if operand_ty.is_float() {
            return self.gen_float_binary(left, op, right);
        }

        // A literal minus a computed value swaps operands and negates the
        // result, so the literal still avoids the spill slot.
        let (lhs, rhs, negate_after) =
            if op == BinaryOperator::Subtract && left.is_literal() && !right.is_literal() {
                (right, left, true)
            } else {
                (left, right, false)
            };

        self.gen_expr(lhs, Reg::Rax);
        let spill = !(lhs.is_literal() && rhs.is_literal());
        let (l, r) = if spill {
            self.spill_across("movq", "%rax", "%rbx", rhs);
            (Reg::Rbx, Reg::Rax)
        } else {
            self.gen_expr(rhs, Reg::Rbx);
            (Reg::Rax, Reg::Rbx)
        };

        if operand_ty == Type::Str {
            self.emit_str_compare(op, l, r, Reg::Rax);
        } else {
            self.emit_int_binary(op, l, r, Reg::Rax, negate_after);
        }
        Loc::Gpr(Reg::Rax)
    }

    fn gen_float_binary(&mut self, left: &Expr, op: BinaryOperator, right: &Expr) -> Loc {
        self.gen_expr(left, Reg::Rax);
        let spill = !(left.is_literal() && right.is_literal());
        let (l, r) = if spill {
            self.spill_across("movsd", "%xmm0", "%xmm1", right);
            (Xmm::Xmm1, Xmm::Xmm0)
        } else {
            self.gen_float_literal_into(right, Xmm::Xmm1);
            (Xmm::Xmm0, Xmm::Xmm1)
        };

        if op.is_comparison() {
            self.emit_float_compare(op, l, r, Reg::Rax);
            Loc::Gpr(Reg::Rax)
        } else {
            self.emit_float_arith(op, l, r, Xmm::Xmm0);
            Loc::Sse(Xmm::Xmm0)
        }
    }

    /// Parks the value the left operand just produced in `src`, lowers the
    /// right operand, then reloads the parked value into `dst`. The first
    /// two nesting levels use the reserved frame temp slots at -8 and -16;
    /// deeper chains bounce through a 16-byte stack block, which keeps RSP
    /// aligned for any call inside the right operand.
    fn spill_across(&mut self, mov: &str, src: &str, dst: &str, rhs: &Expr) {
        if self.spill_depth < 2 {
            let offset = -8 * (self.spill_depth as i64 + 1);
            self.code.ins(&format!("{} {}, {}(%rbp)", mov, src, offset));
            self.spill_depth += 1;
            self.gen_expr(rhs, Reg::Rax);
            self.spill_depth -= 1;
            self.code.ins(&format!("{} {}(%rbp), {}", mov, offset, dst));
        } else {
            self.code.ins("subq $16, %rsp");
            self.code.ins(&format!("{} {}, (%rsp)", mov, src));
            self.spill_depth += 1;
            self.gen_expr(rhs, Reg::Rax);
            self.spill_depth -= 1;
            self.code.ins(&format!("{} (%rsp), {}", mov, dst));
            self.code.ins("addq $16, %rsp");
        }
    }

    /// Loads a literal straight into a specific SSE register. Integer
    /// literals in float context pool as their double rendering.
    fn gen_float_literal_into(&mut self, expr: &Expr, dst: Xmm) {
        let text = match expr {
            Expr::FloatLit(v) => float_text(*v),
            Expr::IntLit(v) => float_text(*v as f64),
            other => {
                self.code
                    .comment(&format!("expected float literal, found {:?}", other));
                return;
            }
        };
        let label = self.pool.intern_float(&text, FloatWidth::Double);
        self.code
            .ins(&format!("movsd {}(%rip), {}", label, dst.name()));
    }

    fn gen_unary(&mut self, op: UnaryOperator, operand: &Expr, preferred: Reg) -> Loc {
        match op {
            UnaryOperator::Plus => self.gen_expr(operand, preferred),
            UnaryOperator::Negate => {
                let ty = self.expr_type(operand).unwrap_or(Type::Int);
                if ty.is_float() {
                    self.gen_expr(operand, Reg::Rax);
                    self.emit_float_negate(Xmm::Xmm0);
                    Loc::Sse(Xmm::Xmm0)
                } else {
                    let loc = self.gen_expr(operand, preferred);
                    self.emit_int_negate(loc.gpr(), preferred);
                    Loc::Gpr(preferred)
                }
            }
            UnaryOperator::Not => {
                let loc = self.gen_expr(operand, preferred);
                self.emit_logical_not(loc.gpr(), preferred);
                Loc::Gpr(preferred)
            }
        }
    }

    fn gen_incdec(&mut self, target: &Expr, increment: bool, prefix: bool, preferred: Reg) -> Loc {
        let Expr::Variable { name, line, column } = target else {
            let (line, column) = target.position().unwrap_or((0, 0));
            self.report(
                ErrorCode::InvalidAssignmentTarget,
                "Increment/decrement target must be a variable",
                line,
                column,
            );
            return Loc::Gpr(preferred);
        };
        let Some(var) = self.frame.lookup(name).cloned() else {
            self.report(
                ErrorCode::UndefinedVariable,
                &format!("Undefined variable '{}'", name),
                *line,
                *column,
            );
            return Loc::Gpr(preferred);
        };
        let mnemonic = if increment { "addl" } else { "subl" };
        if prefix {
            self.code
                .ins(&format!("movl {}(%rbp), {}", var.offset, preferred.l()));
            self.code.ins(&format!("{} $1, {}", mnemonic, preferred.l()));
            self.code
                .ins(&format!("movl {}, {}(%rbp)", preferred.l(), var.offset));
        } else {
            // The returned value is the original, the stored one is updated.
            self.code
                .ins(&format!("movl {}(%rbp), {}", var.offset, preferred.l()));
            self.code.ins(&format!("movl {}(%rbp), %r10d", var.offset));
            self.code.ins(&format!("{} $1, %r10d", mnemonic));
            self.code.ins(&format!("movl %r10d, {}(%rbp)", var.offset));
        }
        Loc::Gpr(preferred)
    }

    fn gen_call(&mut self, name: &str, args: &[Expr], line: usize, column: usize) -> Loc {
        match name {
            "print" => self.gen_print(args, line, column),
            "exit" => {
                if let Some(arg) = args.first() {
                    let loc = self.gen_expr(arg, Reg::Rdi);
                    self.move_to_gpr(loc, Reg::Rdi);
                }
                self.code.ins("call exit_program");
                Loc::Gpr(Reg::Rax)
            }
            _ => self.gen_user_call(name, args, line, column),
        }
    }

    /// `print` resolves to a runtime entry by argument type.
    fn gen_print(&mut self, args: &[Expr], line: usize, column: usize) -> Loc {
        let Some(arg) = args.first() else {
            self.report(
                ErrorCode::InvalidExpression,
                "print requires an argument",
                line,
                column,
            );
            return Loc::Gpr(Reg::Rax);
        };
        let ty = self.expr_type(arg).unwrap_or(Type::Int);
        if ty.is_float() {
            self.gen_expr(arg, Reg::Rax);
            self.code.ins("call print_float");
        } else {
            let loc = self.gen_expr(arg, Reg::Rdi);
            self.move_to_gpr(loc, Reg::Rdi);
            let entry = match ty {
                Type::Bool => "print_bool",
                Type::Str => "print_str_z",
                _ => "print_int",
            };
            self.code.ins(&format!("call {}", entry));
        }
        Loc::Gpr(Reg::Rax)
    }

    fn gen_user_call(&mut self, name: &str, args: &[Expr], line: usize, column: usize) -> Loc {
        let return_type = match self.symbols.lookup_function(name) {
            Some(info) => info.return_type.clone(),
            None => {
                self.report(
                    ErrorCode::UndefinedFunction,
                    &format!("Undefined function '{}'", name),
                    line,
                    column,
                );
                return Loc::Gpr(Reg::Rax);
            }
        };
        // Every argument is lowered into the scratch registers and parked
        // below RSP; the argument registers are filled together right before
        // the call. Filling them during lowering would let an argument that
        // is itself a call clobber the ones already in place. The park area
        // is 16-rounded so RSP stays aligned at nested calls.
        let area = (args.len() as i64 * 8 + 15) & !15;
        if area > 0 {
            self.code.ins(&format!("subq ${}, %rsp", area));
        }
        let mut gpr_fills: Vec<(usize, Reg)> = Vec::new();
        let mut sse_fills: Vec<(usize, Xmm)> = Vec::new();
        for arg in args {
            let ty = self.expr_type(arg).unwrap_or(Type::Int);
            let slot = gpr_fills.len() + sse_fills.len();
            if ty.is_float() {
                if sse_fills.len() >= ARG_SSE.len() {
                    self.code.comment("float argument beyond register capacity");
                    continue;
                }
                self.gen_expr(arg, Reg::Rax);
                self.code.ins(&format!("movsd %xmm0, {}(%rsp)", 8 * slot));
                sse_fills.push((slot, ARG_SSE[sse_fills.len()]));
            } else {
                if gpr_fills.len() >= ARG_GPR.len() {
                    self.code.comment("argument beyond register capacity");
                    continue;
                }
                let loc = self.gen_expr(arg, Reg::Rax);
                self.move_to_gpr(loc, Reg::Rax);
                self.code.ins(&format!("movq %rax, {}(%rsp)", 8 * slot));
                gpr_fills.push((slot, ARG_GPR[gpr_fills.len()]));
            }
        }
        for (slot, reg) in &gpr_fills {
            self.code
                .ins(&format!("movq {}(%rsp), {}", 8 * slot, reg.q()));
        }
        for (slot, xmm) in &sse_fills {
            self.code
                .ins(&format!("movsd {}(%rsp), {}", 8 * slot, xmm.name()));
        }
        if area > 0 {
            self.code.ins(&format!("addq ${}, %rsp", area));
        }
        self.code.ins(&format!("call {}", name));
        if return_type.is_float() {
            Loc::Sse(Xmm::Xmm0)
        } else {
            Loc::Gpr(Reg::Rax)
        }
    }

    fn gen_member_load(
        &mut self,
        base: &str,
        field: &str,
        line: usize,
        column: usize,
        preferred: Reg,
    ) -> Loc {
        let Some((offset, ty)) = self.member_slot(base, field, line, column) else {
            return Loc::Gpr(preferred);
        };
        match ty {
            Type::Int => {
                self.code
                    .ins(&format!("movl {}(%rbp), {}", offset, preferred.l()));
                Loc::Gpr(preferred)
            }
            Type::Bool => {
                self.code
                    .ins(&format!("movzbl {}(%rbp), {}", offset, preferred.l()));
                Loc::Gpr(preferred)
            }
            Type::Float => {
                self.code.ins(&format!("movsd {}(%rbp), %xmm0", offset));
                Loc::Sse(Xmm::Xmm0)
            }
            Type::Str => {
                self.code
                    .ins(&format!("movq {}(%rbp), {}", offset, preferred.q()));
                Loc::Gpr(preferred)
            }
            Type::Struct(_) | Type::Void => {
                self.code.comment("nested struct fields are not supported");
                Loc::Gpr(preferred)
            }
        }
    }

    pub(crate) fn move_to_gpr(&mut self, loc: Loc, dst: Reg) {
        if let Loc::Gpr(r) = loc {
            if r != dst {
                self.code.ins(&format!("movq {}, {}", r.q(), dst.q()));
            }
        }
    }
}
