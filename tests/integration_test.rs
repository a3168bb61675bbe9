use std::collections::HashSet;

use mica::{compile_to_string, CompilerError, ErrorCode};

fn compile(source: &str) -> String {
    match compile_to_string(source, "test.mc") {
        Ok(asm) => asm,
        Err(e) => panic!("compilation failed: {}", e),
    }
}

fn compile_err(source: &str) -> Vec<mica::CompileError> {
    match compile_to_string(source, "test.mc") {
        Ok(_) => panic!("expected a failing compile"),
        Err(CompilerError::Compilation(diags)) => diags,
        Err(other) => panic!("unexpected failure kind: {}", other),
    }
}

#[test]
fn empty_program_emits_preamble_and_epilogue_only() {
    let asm = compile("");
    assert!(asm.contains(".globl _start"));
    assert!(asm.contains("_start:"));
    assert!(asm.contains("movq $60, %rax"));
    assert!(asm.contains("xorq %rdi, %rdi"));
    assert!(asm.contains("syscall"));
    assert!(!asm.contains(".rodata"));
    assert!(!asm.lines().any(|line| line.trim_start().starts_with("call ")));
}

#[test]
fn arithmetic_and_exit_status() {
    let asm = compile("int x = 5; int y = x + 2; exit(y);");
    assert!(asm.contains("movl $5, %eax"));
    assert!(asm.contains("movl %eax, -24(%rbp)"));
    assert!(asm.contains("addl %ebx, %eax"));
    assert!(asm.contains("movl %eax, -32(%rbp)"));
    assert!(asm.contains("movl -32(%rbp), %edi"));
    assert!(asm.contains("call exit_program"));
}

#[test]
fn float_subtraction_prints_through_runtime() {
    let asm = compile("float a = 3.0; float b = 1.5; print(a - b);");
    assert!(asm.contains(".double 3.0"));
    assert!(asm.contains(".double 1.5"));
    assert!(asm.contains("movsd %xmm0, -8(%rbp)"));
    assert!(asm.contains("movsd -8(%rbp), %xmm1"));
    assert!(asm.contains("subsd"));
    assert!(asm.contains("call print_float"));
    assert!(!asm.contains("cvttsd2si"));
}

#[test]
fn countdown_loop_layout() {
    let asm = compile("int i = 10; @ i > 0 { i -= 1; } exit(i);");
    assert!(asm.contains(".Lloop_0:"));
    assert!(asm.contains("jz .Lendloop_1"));
    assert!(asm.contains("jmp .Lloop_0"));
    assert!(asm.contains(".Lendloop_1:"));
    let cond = asm.find("cmpl").expect("condition compare");
    let body = asm.find("subl").expect("loop body subtraction");
    assert!(cond < body);
}

#[test]
fn boolean_expression_lowers_to_setcc() {
    let asm = compile("bool ok = (2 * 3) == 6 && !(1 > 2); print(ok);");
    assert!(asm.contains("imull"));
    assert!(asm.contains("sete %al"));
    assert!(asm.contains("setg %al"));
    assert!(asm.contains("movzbl %al, %eax"));
    assert!(asm.contains("andl"));
    assert!(asm.contains("call print_bool"));
}

#[test]
fn string_literal_interned_once() {
    let asm = compile("string s = \"hi\"; print(s); print(\"hi\");");
    assert_eq!(asm.matches(".string \"hi\"").count(), 1);
    assert!(asm.contains("leaq .STR_0(%rip)"));
    assert_eq!(asm.matches("call print_str_z").count(), 2);
}

#[test]
fn function_call_passes_arguments_in_registers() {
    let source = "fn add(int a, int b) -> int { return a + b; } int r = add(4, 5); exit(r);";
    let asm = compile(source);
    assert_eq!(asm.matches("add:").count(), 1);
    assert!(asm.contains("movl %edi, -24(%rbp)"));
    assert!(asm.contains("movl %esi, -32(%rbp)"));
    assert!(asm.contains("movq %rax, 0(%rsp)"));
    assert!(asm.contains("movq %rax, 8(%rsp)"));
    assert!(asm.contains("movq 0(%rsp), %rdi"));
    assert!(asm.contains("movq 8(%rsp), %rsi"));
    assert!(asm.contains("call add"));
    assert!(asm.find("add:").unwrap() < asm.find("_start:").unwrap());
}

#[test]
fn nested_call_argument_cannot_clobber_outer_arguments() {
    let source = "fn add(int a, int b) -> int { return a + b; } exit(add(1, add(2, 3)));";
    let asm = compile(source);
    assert_eq!(asm.matches("call add").count(), 2);
    // The outer call's first argument register is filled only after the
    // inner call has returned.
    let inner_call = asm.find("call add").unwrap();
    let outer_rdi_fill = asm.rfind("movq 0(%rsp), %rdi").unwrap();
    assert!(inner_call < outer_rdi_fill, "outer %rdi filled before the inner call:\n{}", asm);
}

#[test]
fn float_function_argument_uses_sse_registers() {
    let source = "fn halve(float x) -> float { return x / 2.0; } print(halve(3.0));";
    let asm = compile(source);
    assert!(asm.contains("movsd %xmm0, -24(%rbp)"));
    assert!(asm.contains("divsd"));
    assert!(asm.contains("call halve"));
    assert!(asm.contains("call print_float"));
}

#[test]
fn struct_fields_use_layout_offsets() {
    let source = "struct Point { int x; int y; } Point p; p.x = 3; p.y = 4; exit(p.x + p.y);";
    let asm = compile(source);
    assert!(asm.contains("movl %eax, -24(%rbp)"));
    assert!(asm.contains("movl %eax, -20(%rbp)"));
    assert!(asm.contains("movl -24(%rbp), %eax"));
    assert!(asm.contains("movl -20(%rbp), %eax"));
}

#[test]
fn mixed_width_struct_layout() {
    // bool at 0, int padded to 4, float padded to 8, total 16.
    let source = "struct Rec { bool ok; int n; float f; } Rec r; r.n = 1; r.f = 2.5; r.ok = true;";
    let asm = compile(source);
    assert!(asm.contains("movl %eax, -28(%rbp)"));
    assert!(asm.contains("movsd %xmm0, -24(%rbp)"));
    assert!(asm.contains("movb %al, -32(%rbp)"));
}

#[test]
fn division_rescues_divisor_out_of_rax() {
    let asm = compile("int a = 10; int b = 2; exit(a / b);");
    assert!(asm.contains("movl %eax, %ecx"));
    assert!(asm.contains("cltd"));
    assert!(asm.contains("idivl %ecx"));
}

#[test]
fn modulo_takes_remainder_from_rdx() {
    let asm = compile("int a = 10; int b = 3; exit(a % b);");
    assert!(asm.contains("idivl"));
    assert!(asm.contains("movl %edx, %eax"));
}

#[test]
fn nested_right_operand_gets_its_own_spill_slot() {
    let asm = compile("int x = 2; int y = 3; int z = 5; exit(x + y * z);");
    assert!(asm.contains("movq %rax, -8(%rbp)"));
    assert!(asm.contains("movq %rax, -16(%rbp)"));
    assert!(asm.contains("movq -16(%rbp), %rbx"));
    let multiply = asm.find("imull").unwrap();
    let outer_reload = asm.rfind("movq -8(%rbp), %rbx").unwrap();
    assert!(multiply < outer_reload, "outer addend reloaded before the product:\n{}", asm);
}

#[test]
fn right_nested_float_expression_spills_two_slots() {
    let asm = compile("float a = 8.0; float b = 4.0; float c = 2.0; print(a - (b - c));");
    assert!(asm.contains("movsd %xmm0, -8(%rbp)"));
    assert!(asm.contains("movsd %xmm0, -16(%rbp)"));
    assert!(asm.contains("movsd -16(%rbp), %xmm1"));
    assert!(asm.contains("movsd -8(%rbp), %xmm1"));
    assert_eq!(asm.matches("subsd").count(), 2);
}

#[test]
fn literal_minus_variable_swaps_operands() {
    let asm = compile("int x = 3; int y = 10 - x; exit(y);");
    assert!(asm.contains("negl %eax"));
}

#[test]
fn double_float_negation_restores_sign() {
    let asm = compile("float a = 1.5; print(-(-a));");
    assert_eq!(asm.matches(".LC_SIGN_MASK:").count(), 1);
    assert_eq!(asm.matches("xorpd .LC_SIGN_MASK(%rip), %xmm0").count(), 2);
}

#[test]
fn conditional_with_else_branch() {
    let asm = compile("int x = 1; x > 0 ? { print(1); } : { print(2); }");
    assert!(asm.contains("testq %rax, %rax"));
    assert!(asm.contains("jz .Lelse_0"));
    assert!(asm.contains("jmp .Lendif_1"));
}

#[test]
fn conditional_without_else_jumps_to_end() {
    let asm = compile("int x = 1; x > 0 ? { print(1); }");
    assert!(asm.contains("jz .Lendif_0"));
    assert!(!asm.contains(".Lelse_"));
}

#[test]
fn inner_block_slots_are_reused() {
    let asm = compile("{ int a = 1; } { int b = 2; }");
    assert!(asm.contains("-24(%rbp)"));
    assert!(!asm.contains("-32(%rbp)"));
}

#[test]
fn shadowed_variable_gets_its_own_slot() {
    let asm = compile("int x = 1; { int x = 2; print(x); } print(x);");
    assert!(asm.contains("movl %eax, -24(%rbp)"));
    assert!(asm.contains("movl %eax, -32(%rbp)"));
    assert!(asm.contains("movl -32(%rbp), %edi"));
    assert!(asm.contains("movl -24(%rbp), %edi"));
}

#[test]
fn post_increment_keeps_original_value() {
    let asm = compile("int i = 1; exit(i++);");
    assert!(asm.contains("movl -24(%rbp), %r10d"));
    assert!(asm.contains("addl $1, %r10d"));
    assert!(asm.contains("movl %r10d, -24(%rbp)"));
}

#[test]
fn string_equality_compares_pointers() {
    let asm = compile("string a = \"x\"; string b = \"y\"; bool same = a == b; print(same);");
    assert!(asm.contains("cmpq"));
    assert!(asm.contains("sete %al"));
}

#[test]
fn every_label_defined_at_most_once() {
    let source = "int i = 0; @ i < 3 { i += 1; i > 1 ? { print(i); } : { print(0); } } exit(i);";
    let asm = compile(source);
    let mut seen = HashSet::new();
    for line in asm.lines() {
        let trimmed = line.trim();
        if let Some(label) = trimmed.strip_suffix(':') {
            assert!(seen.insert(label.to_string()), "label defined twice: {}", label);
        }
    }
}

#[test]
fn frame_offsets_are_negative_and_distinct() {
    let asm = compile("int a = 1; float b = 2.0; bool c = true; string d = \"s\";");
    for offset in ["-24(%rbp)", "-32(%rbp)", "-40(%rbp)", "-48(%rbp)"] {
        assert!(asm.contains(offset), "missing slot {}:\n{}", offset, asm);
    }
}

#[test]
fn prologue_and_epilogue_bracket_every_function() {
    let source = "fn id(int v) -> int { return v; } exit(id(3));";
    let asm = compile(source);
    assert!(asm.matches("pushq %rbp").count() >= 2);
    assert_eq!(
        asm.matches("pushq %rbp").count(),
        asm.matches("popq %rbp").count() - 1
    );
}

#[test]
fn assignment_to_literal_is_rejected() {
    let diags = compile_err("int x = 1; 5 = x;");
    assert!(diags
        .iter()
        .any(|d| d.code == ErrorCode::InvalidAssignmentTarget));
}

#[test]
fn undefined_variable_is_rejected() {
    let diags = compile_err("int x = missing + 1;");
    assert!(diags.iter().any(|d| d.code == ErrorCode::UndefinedVariable));
}

#[test]
fn string_subtraction_is_rejected() {
    let diags = compile_err("string a = \"x\"; string b = \"y\"; a - b;");
    assert!(diags
        .iter()
        .any(|d| d.code == ErrorCode::InvalidOperationForType));
}

#[test]
fn unknown_struct_field_is_rejected() {
    let diags = compile_err("struct P { int x; } P p; p.z = 1;");
    assert!(diags.iter().any(|d| d.code == ErrorCode::UnknownStructField));
}

#[test]
fn misspelled_variable_gets_a_suggestion() {
    let diags = compile_err("int counter = 0; exit(countr);");
    assert!(diags
        .iter()
        .any(|d| d.suggestion.as_deref() == Some("counter")));
}
