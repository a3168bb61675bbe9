use super::regs::{Reg, Xmm};
use super::CodeGenerator;
use crate::parser::ast::BinaryOperator;

fn int_cc(op: BinaryOperator) -> Option<&'static str> {
    match op {
        BinaryOperator::Equal => Some("e"),
        BinaryOperator::NotEqual => Some("ne"),
        BinaryOperator::Less => Some("l"),
        BinaryOperator::LessEqual => Some("le"),
        BinaryOperator::Greater => Some("g"),
        BinaryOperator::GreaterEqual => Some("ge"),
        _ => None,
    }
}

// IEEE comparisons come out of ucomisd through the unsigned flags.
fn float_cc(op: BinaryOperator) -> Option<&'static str> {
    match op {
        BinaryOperator::Equal => Some("e"),
        BinaryOperator::NotEqual => Some("ne"),
        BinaryOperator::Less => Some("b"),
        BinaryOperator::LessEqual => Some("be"),
        BinaryOperator::Greater => Some("a"),
        BinaryOperator::GreaterEqual => Some("ae"),
        _ => None,
    }
}

/// Instruction selection for binary and unary operations. Every entry point
/// takes logical registers for (left, right, result) and leaves the value in
/// `result` without touching anything else the caller still holds.
impl<'a> CodeGenerator<'a> {
    pub(crate) fn emit_int_binary(
        &mut self,
        op: BinaryOperator,
        left: Reg,
        right: Reg,
        result: Reg,
        negate_after: bool,
    ) {
        match op {
            BinaryOperator::Add => self.int_commutative("addl", left, right, result),
            BinaryOperator::Multiply => self.int_commutative("imull", left, right, result),
            BinaryOperator::And => self.int_commutative("andl", left, right, result),
            BinaryOperator::Or => self.int_commutative("orl", left, right, result),
            BinaryOperator::Subtract => self.int_subtract(left, right, result),
            BinaryOperator::Divide => self.int_divide(left, right, result, false),
            BinaryOperator::Modulo => self.int_divide(left, right, result, true),
            compare => self.int_compare(compare, left, right, result),
        }
        if negate_after {
            self.code.ins(&format!("negl {}", result.l()));
        }
    }

    fn int_commutative(&mut self, mnemonic: &str, left: Reg, right: Reg, result: Reg) {
        if result == right {
            self.code
                .ins(&format!("{} {}, {}", mnemonic, left.l(), result.l()));
        } else {
            if result != left {
                self.code.ins(&format!("movl {}, {}", left.l(), result.l()));
            }
            self.code
                .ins(&format!("{} {}, {}", mnemonic, right.l(), result.l()));
        }
    }

    fn int_subtract(&mut self, left: Reg, right: Reg, result: Reg) {
        if result == right && result != left {
            // The subtrahend would be overwritten by the move, park it first.
            self.code.ins(&format!("movl {}, %r11d", right.l()));
            self.code.ins(&format!("movl {}, {}", left.l(), result.l()));
            self.code.ins(&format!("subl %r11d, {}", result.l()));
        } else {
            if result != left {
                self.code.ins(&format!("movl {}, {}", left.l(), result.l()));
            }
            self.code.ins(&format!("subl {}, {}", right.l(), result.l()));
        }
    }

    /// idiv wants the dividend in EAX:EDX. A divisor sitting in either of
    /// those registers is rescued into ECX before they are claimed.
    fn int_divide(&mut self, left: Reg, right: Reg, result: Reg, want_remainder: bool) {
        let divisor = if right == Reg::Rax || right == Reg::Rdx {
            self.code.ins(&format!("movl {}, %ecx", right.l()));
            Reg::Rcx
        } else {
            right
        };
        if left != Reg::Rax {
            self.code.ins(&format!("movl {}, %eax", left.l()));
        }
        self.code.ins("cltd");
        self.code.ins(&format!("idivl {}", divisor.l()));
        let out = if want_remainder { Reg::Rdx } else { Reg::Rax };
        if result != out {
            self.code.ins(&format!("movl {}, {}", out.l(), result.l()));
        }
    }

    fn int_compare(&mut self, op: BinaryOperator, left: Reg, right: Reg, result: Reg) {
        let Some(cc) = int_cc(op) else {
            self.code.comment(&format!("unknown integer operation {:?}", op));
            return;
        };
        if result == right && result != left {
            self.code.ins(&format!("movl {}, %r11d", right.l()));
            self.code.ins(&format!("movl {}, {}", left.l(), result.l()));
            self.code.ins(&format!("cmpl %r11d, {}", result.l()));
        } else {
            if result != left {
                self.code.ins(&format!("movl {}, {}", left.l(), result.l()));
            }
            self.code.ins(&format!("cmpl {}, {}", right.l(), result.l()));
        }
        self.code.ins(&format!("set{} %al", cc));
        self.code.ins(&format!("movzbl %al, {}", result.l()));
    }

    pub(crate) fn emit_float_arith(&mut self, op: BinaryOperator, left: Xmm, right: Xmm, result: Xmm) {
        let mnemonic = match op {
            BinaryOperator::Add => "addsd",
            BinaryOperator::Subtract => "subsd",
            BinaryOperator::Multiply => "mulsd",
            BinaryOperator::Divide => "divsd",
            other => {
                self.code.comment(&format!("unsupported float operation {:?}", other));
                return;
            }
        };
        let commutative = matches!(op, BinaryOperator::Add | BinaryOperator::Multiply);
        if result == right && result != left {
            if commutative {
                self.code
                    .ins(&format!("{} {}, {}", mnemonic, left.name(), result.name()));
            } else {
                self.code
                    .ins(&format!("movsd {}, %xmm2", right.name()));
                self.code
                    .ins(&format!("movsd {}, {}", left.name(), result.name()));
                self.code.ins(&format!("{} %xmm2, {}", mnemonic, result.name()));
            }
        } else {
            if result != left {
                self.code
                    .ins(&format!("movsd {}, {}", left.name(), result.name()));
            }
            self.code
                .ins(&format!("{} {}, {}", mnemonic, right.name(), result.name()));
        }
    }

    pub(crate) fn emit_float_compare(&mut self, op: BinaryOperator, left: Xmm, right: Xmm, result: Reg) {
        let Some(cc) = float_cc(op) else {
            self.code.comment(&format!("unsupported float operation {:?}", op));
            return;
        };
        self.code
            .ins(&format!("ucomisd {}, {}", right.name(), left.name()));
        self.code.ins(&format!("set{} %al", cc));
        self.code.ins(&format!("movzbl %al, {}", result.l()));
    }

    /// Strings compare by pointer identity; everything else is rejected
    /// upstream and only leaves a marker here.
    pub(crate) fn emit_str_compare(&mut self, op: BinaryOperator, left: Reg, right: Reg, result: Reg) {
        let cc = match op {
            BinaryOperator::Equal => "e",
            BinaryOperator::NotEqual => "ne",
            other => {
                self.code
                    .comment(&format!("unsupported string operation {:?}", other));
                return;
            }
        };
        if result == right && result != left {
            self.code.ins(&format!("movq {}, %r11", right.q()));
            self.code.ins(&format!("movq {}, {}", left.q(), result.q()));
            self.code.ins(&format!("cmpq %r11, {}", result.q()));
        } else {
            if result != left {
                self.code.ins(&format!("movq {}, {}", left.q(), result.q()));
            }
            self.code.ins(&format!("cmpq {}, {}", right.q(), result.q()));
        }
        self.code.ins(&format!("set{} %al", cc));
        self.code.ins(&format!("movzbl %al, {}", result.l()));
    }

    pub(crate) fn emit_int_negate(&mut self, operand: Reg, result: Reg) {
        if result != operand {
            self.code
                .ins(&format!("movl {}, {}", operand.l(), result.l()));
        }
        self.code.ins(&format!("negl {}", result.l()));
    }

    /// Sign-bit flip through the pooled mask constant.
    pub(crate) fn emit_float_negate(&mut self, reg: Xmm) {
        self.pool.uses_sign_mask = true;
        self.code
            .ins(&format!("xorpd .LC_SIGN_MASK(%rip), {}", reg.name()));
    }

    pub(crate) fn emit_logical_not(&mut self, operand: Reg, result: Reg) {
        if result != operand {
            self.code
                .ins(&format!("movl {}, {}", operand.l(), result.l()));
        }
        self.code
            .ins(&format!("testl {}, {}", result.l(), result.l()));
        self.code.ins("sete %al");
        self.code.ins(&format!("movzbl %al, {}", result.l()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::SymbolTable;

    fn fresh(symbols: &SymbolTable) -> CodeGenerator<'_> {
        CodeGenerator::new(symbols)
    }

    #[test]
    fn test_commutative_add_into_right_operand() {
        let symbols = SymbolTable::default();
        let mut g = fresh(&symbols);
        g.emit_int_binary(BinaryOperator::Add, Reg::Rbx, Reg::Rax, Reg::Rax, false);
        assert_eq!(g.code.as_str(), "    addl %ebx, %eax\n");
    }

    #[test]
    fn test_subtract_saves_right_operand() {
        let symbols = SymbolTable::default();
        let mut g = fresh(&symbols);
        g.emit_int_binary(BinaryOperator::Subtract, Reg::Rbx, Reg::Rax, Reg::Rax, false);
        let asm = g.code.as_str();
        assert!(asm.contains("movl %eax, %r11d"));
        assert!(asm.contains("movl %ebx, %eax"));
        assert!(asm.contains("subl %r11d, %eax"));
    }

    #[test]
    fn test_divide_rescues_divisor_from_rax() {
        let symbols = SymbolTable::default();
        let mut g = fresh(&symbols);
        g.emit_int_binary(BinaryOperator::Divide, Reg::Rbx, Reg::Rax, Reg::Rax, false);
        let asm = g.code.as_str();
        assert!(asm.contains("movl %eax, %ecx"));
        assert!(asm.contains("movl %ebx, %eax"));
        assert!(asm.contains("cltd"));
        assert!(asm.contains("idivl %ecx"));
    }

    #[test]
    fn test_modulo_moves_remainder_from_rdx() {
        let symbols = SymbolTable::default();
        let mut g = fresh(&symbols);
        g.emit_int_binary(BinaryOperator::Modulo, Reg::Rax, Reg::Rbx, Reg::Rax, false);
        let asm = g.code.as_str();
        assert!(asm.contains("idivl %ebx"));
        assert!(asm.contains("movl %edx, %eax"));
    }

    #[test]
    fn test_comparison_sets_and_widens() {
        let symbols = SymbolTable::default();
        let mut g = fresh(&symbols);
        g.emit_int_binary(BinaryOperator::Less, Reg::Rax, Reg::Rbx, Reg::Rax, false);
        let asm = g.code.as_str();
        assert!(asm.contains("cmpl %ebx, %eax"));
        assert!(asm.contains("setl %al"));
        assert!(asm.contains("movzbl %al, %eax"));
    }

    #[test]
    fn test_comparison_saves_right_operand_when_result_is_right() {
        let symbols = SymbolTable::default();
        let mut g = fresh(&symbols);
        g.emit_int_binary(BinaryOperator::Greater, Reg::Rbx, Reg::Rax, Reg::Rax, false);
        let asm = g.code.as_str();
        assert!(asm.contains("movl %eax, %r11d"));
        assert!(asm.contains("cmpl %r11d, %eax"));
        assert!(asm.contains("setg %al"));
    }

    #[test]
    fn test_negate_after_swapped_subtraction() {
        let symbols = SymbolTable::default();
        let mut g = fresh(&symbols);
        g.emit_int_binary(BinaryOperator::Subtract, Reg::Rax, Reg::Rbx, Reg::Rax, true);
        assert!(g.code.as_str().ends_with("negl %eax\n"));
    }

    #[test]
    fn test_float_subtract_with_result_in_right() {
        let symbols = SymbolTable::default();
        let mut g = fresh(&symbols);
        g.emit_float_arith(BinaryOperator::Subtract, Xmm::Xmm1, Xmm::Xmm0, Xmm::Xmm0);
        let asm = g.code.as_str();
        assert!(asm.contains("movsd %xmm0, %xmm2"));
        assert!(asm.contains("movsd %xmm1, %xmm0"));
        assert!(asm.contains("subsd %xmm2, %xmm0"));
    }

    #[test]
    fn test_float_compare_uses_unsigned_codes() {
        let symbols = SymbolTable::default();
        let mut g = fresh(&symbols);
        g.emit_float_compare(BinaryOperator::Less, Xmm::Xmm1, Xmm::Xmm0, Reg::Rax);
        let asm = g.code.as_str();
        assert!(asm.contains("ucomisd %xmm0, %xmm1"));
        assert!(asm.contains("setb %al"));
    }

    #[test]
    fn test_float_negate_pools_sign_mask() {
        let symbols = SymbolTable::default();
        let mut g = fresh(&symbols);
        g.emit_float_negate(Xmm::Xmm0);
        assert!(g.code.as_str().contains("xorpd .LC_SIGN_MASK(%rip), %xmm0"));
        assert!(g.pool.uses_sign_mask);
    }

    #[test]
    fn test_string_inequality() {
        let symbols = SymbolTable::default();
        let mut g = fresh(&symbols);
        g.emit_str_compare(BinaryOperator::NotEqual, Reg::Rbx, Reg::Rax, Reg::Rax);
        let asm = g.code.as_str();
        assert!(asm.contains("movq %rax, %r11"));
        assert!(asm.contains("movq %rbx, %rax"));
        assert!(asm.contains("cmpq %r11, %rax"));
        assert!(asm.contains("setne %al"));
    }
}
