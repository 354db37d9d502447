//! x86-64 NASM emitter targeting the Windows x64 calling convention.
//!
//! Lowers flat TAC ([`crate::ir::Instr`]) straight to assembly text. There
//! is no register allocator and no peephole pass: every variable and
//! temporary gets its own 8-byte slot below `rbp`. The stack frame size is
//! computed from the function's actual slot count and rounded up to 16
//! bytes, instead of a blind `sub rsp, 64` that could overflow on a
//! function with more than eight distinct locals.

use crate::ir::{Instr, StringTable};
use std::collections::HashMap;

const PARAM_REGS: [&str; 4] = ["rcx", "rdx", "r8", "r9"];

fn is_immediate(operand: &str) -> bool {
    let digits = operand.strip_prefix('-').unwrap_or(operand);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn round_up_16(n: i64) -> i64 {
    if n <= 0 {
        0
    } else {
        (n + 15) / 16 * 16
    }
}

/// Tracks `rbp`-relative slot assignment for one function at a time. Reset
/// at every `FuncBegin`; a name keeps the same slot for the rest of that
/// function once assigned.
#[derive(Default)]
struct SlotMap {
    offsets: HashMap<String, i64>,
    current: i64,
}

impl SlotMap {
    fn reset(&mut self) {
        self.offsets.clear();
        self.current = 0;
    }

    /// Numeric literals (including negative ones) pass through unchanged;
    /// everything else gets (or reuses) an `rbp`-relative slot. This is
    /// called on string-literal labels too in a few contexts below, which
    /// burns a real stack slot for them outside of `Assign`/`Call`.
    fn loc(&mut self, name: &str) -> String {
        if is_immediate(name) {
            return name.to_string();
        }
        let offset = *self.offsets.entry(name.to_string()).or_insert_with(|| {
            self.current += 8;
            self.current
        });
        format!("QWORD [rbp-{}]", offset)
    }
}

/// Replays the same slot-assignment order [`generate`] will use, purely to
/// learn each function's final frame size before its prologue is emitted.
fn collect_frame_sizes(instrs: &[Instr]) -> Vec<i64> {
    let mut sizes = Vec::new();
    let mut slots = SlotMap::default();

    for instr in instrs {
        match instr {
            Instr::FuncBegin { params, .. } => {
                slots.reset();
                for p in params {
                    slots.loc(p);
                }
            }
            Instr::FuncEnd(_) => sizes.push(round_up_16(slots.current)),
            Instr::Assign { dest, src } => {
                slots.loc(dest);
                if !is_immediate(src) && !src.starts_with("str") {
                    slots.loc(src);
                }
            }
            Instr::BinOp { dest, lhs, rhs, .. } => {
                slots.loc(dest);
                slots.loc(lhs);
                slots.loc(rhs);
            }
            Instr::UnaryOp { dest, operand, .. } => {
                slots.loc(dest);
                slots.loc(operand);
            }
            Instr::IfFalseGoto { cond, .. } | Instr::IfGoto { cond, .. } => {
                slots.loc(cond);
            }
            Instr::Call { dest, args, .. } => {
                for arg in args.iter().take(PARAM_REGS.len()) {
                    slots.loc(arg);
                }
                if let Some(d) = dest {
                    slots.loc(d);
                }
            }
            Instr::Return(Some(v)) => {
                slots.loc(v);
            }
            Instr::Return(None) | Instr::Label(_) | Instr::Goto(_) | Instr::Param(_) => {}
        }
    }

    sizes
}

fn emit_header(out: &mut Vec<String>) {
    out.push("; generated by the compiler".to_string());
    out.push("; architecture: x86-64".to_string());
    out.push("; syntax: NASM (Intel)".to_string());
    out.push(String::new());
    out.push("bits 64".to_string());
    out.push("default rel".to_string());
    out.push(String::new());
}

fn emit_data_section(out: &mut Vec<String>, strings: &StringTable) {
    if strings.is_empty() {
        return;
    }
    out.push("section .data".to_string());
    for (label, text) in strings.ordered() {
        let escaped = text.replace("\\n", "\", 10, \"").replace("\\t", "\", 9, \"");
        out.push(format!("    {}: db \"{}\", 0", label, escaped));
    }
    out.push(String::new());
}

fn emit_code_section(out: &mut Vec<String>, instrs: &[Instr]) {
    out.push("section .text".to_string());
    out.push("    extern printf".to_string());
    out.push("    extern scanf".to_string());
    out.push("    extern exit".to_string());
    out.push(String::new());

    let has_main = instrs
        .iter()
        .any(|i| matches!(i, Instr::FuncBegin { name, .. } if name == "main"));
    if has_main {
        out.push("    global main".to_string());
        out.push(String::new());
    }

    let frame_sizes = collect_frame_sizes(instrs);
    let mut frame_idx = 0;
    let mut slots = SlotMap::default();
    let mut current_fn = String::new();

    for instr in instrs {
        match instr {
            Instr::FuncBegin { name, params } => {
                slots.reset();
                current_fn = name.clone();
                let frame_size = frame_sizes[frame_idx];
                frame_idx += 1;

                out.push(format!("{}:", name));
                out.push("    push rbp".to_string());
                out.push("    mov rbp, rsp".to_string());
                out.push(format!("    sub rsp, {}", frame_size));
                out.push(String::new());

                for (i, p) in params.iter().enumerate() {
                    let loc = slots.loc(p);
                    if i < PARAM_REGS.len() {
                        out.push(format!("    mov {}, {}", loc, PARAM_REGS[i]));
                    }
                }
            }
            Instr::FuncEnd(name) => {
                out.push(format!(".end_{}:", name));
                out.push("    mov rsp, rbp".to_string());
                out.push("    pop rbp".to_string());
                out.push("    ret".to_string());
                out.push(String::new());
            }
            Instr::Label(name) => out.push(format!(".{}:", name)),
            Instr::Assign { dest, src } => {
                let dest_loc = slots.loc(dest);
                if is_immediate(src) {
                    out.push(format!("    mov {}, {}", dest_loc, src));
                } else if src.starts_with("str") {
                    out.push(format!("    lea rax, [{}]", src));
                    out.push(format!("    mov {}, rax", dest_loc));
                } else {
                    let src_loc = slots.loc(src);
                    out.push(format!("    mov rax, {}", src_loc));
                    out.push(format!("    mov {}, rax", dest_loc));
                }
            }
            Instr::BinOp { dest, lhs, op, rhs } => {
                let dest_loc = slots.loc(dest);
                let lhs_loc = slots.loc(lhs);
                let rhs_loc = slots.loc(rhs);
                out.push(format!("    mov rax, {}", lhs_loc));
                out.push(format!("    mov rbx, {}", rhs_loc));
                match *op {
                    "+" => out.push("    add rax, rbx".to_string()),
                    "-" => out.push("    sub rax, rbx".to_string()),
                    "*" => out.push("    imul rax, rbx".to_string()),
                    "/" => {
                        out.push("    xor rdx, rdx".to_string());
                        out.push("    idiv rbx".to_string());
                    }
                    "%" => {
                        out.push("    xor rdx, rdx".to_string());
                        out.push("    idiv rbx".to_string());
                        out.push("    mov rax, rdx".to_string());
                    }
                    "<" | ">" | "<=" | ">=" | "==" | "!=" => {
                        out.push("    cmp rax, rbx".to_string());
                        let setcc = match *op {
                            "<" => "setl",
                            ">" => "setg",
                            "<=" => "setle",
                            ">=" => "setge",
                            "==" => "sete",
                            _ => "setne",
                        };
                        out.push(format!("    {} al", setcc));
                        out.push("    movzx rax, al".to_string());
                    }
                    "&&" | "||" => {
                        // Operands are already 0/1-valued booleans; fold
                        // with the bitwise form, then renormalize.
                        if *op == "&&" {
                            out.push("    and rax, rbx".to_string());
                        } else {
                            out.push("    or rax, rbx".to_string());
                        }
                        out.push("    test rax, rax".to_string());
                        out.push("    setnz al".to_string());
                        out.push("    movzx rax, al".to_string());
                    }
                    _ => {}
                }
                out.push(format!("    mov {}, rax", dest_loc));
            }
            Instr::UnaryOp { dest, op, operand } => {
                let dest_loc = slots.loc(dest);
                let operand_loc = slots.loc(operand);
                out.push(format!("    mov rax, {}", operand_loc));
                match *op {
                    "-" => out.push("    neg rax".to_string()),
                    "!" => {
                        out.push("    test rax, rax".to_string());
                        out.push("    setz al".to_string());
                        out.push("    movzx rax, al".to_string());
                    }
                    _ => {}
                }
                out.push(format!("    mov {}, rax", dest_loc));
            }
            Instr::Goto(label) => out.push(format!("    jmp .{}", label)),
            Instr::IfGoto { cond, label } => {
                let loc = slots.loc(cond);
                out.push(format!("    mov rax, {}", loc));
                out.push("    test rax, rax".to_string());
                out.push(format!("    jnz .{}", label));
            }
            Instr::IfFalseGoto { cond, label } => {
                let loc = slots.loc(cond);
                out.push(format!("    mov rax, {}", loc));
                out.push("    test rax, rax".to_string());
                out.push(format!("    jz .{}", label));
            }
            Instr::Param(_) => {}
            Instr::Call { dest, func, args } => {
                out.push("    sub rsp, 32".to_string());
                for (i, arg) in args.iter().enumerate().take(PARAM_REGS.len()) {
                    let loc = slots.loc(arg);
                    if is_immediate(arg) {
                        out.push(format!("    mov {}, {}", PARAM_REGS[i], arg));
                    } else if arg.starts_with("str") {
                        out.push(format!("    lea {}, [{}]", PARAM_REGS[i], arg));
                    } else {
                        out.push(format!("    mov {}, {}", PARAM_REGS[i], loc));
                    }
                }
                out.push(format!("    call {}", func));
                out.push("    add rsp, 32".to_string());
                if let Some(d) = dest {
                    let loc = slots.loc(d);
                    out.push(format!("    mov {}, rax", loc));
                }
            }
            Instr::Return(value) => {
                match value {
                    Some(v) => {
                        let loc = slots.loc(v);
                        out.push(format!("    mov rax, {}", loc));
                    }
                    None => out.push("    xor rax, rax".to_string()),
                }
                out.push(format!("    jmp .end_{}", current_fn));
            }
        }
    }
}

/// Renders a whole program's IR to NASM source text, including a trailing
/// newline.
pub fn generate(instrs: &[Instr], strings: &StringTable) -> String {
    let mut out = Vec::new();
    emit_header(&mut out);
    emit_data_section(&mut out, strings);
    emit_code_section(&mut out, instrs);
    let mut text = out.join("\n");
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::adapt;
    use crate::ir;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn asm_for(src: &str) -> String {
        let raw = Lexer::new(src).tokenize().unwrap();
        let tokens = adapt(raw).unwrap();
        let program = Parser::new(tokens).parse().unwrap();
        let (instrs, strings) = ir::generate(&program);
        generate(&instrs, &strings)
    }

    #[test]
    fn header_and_text_section_are_present() {
        let asm = asm_for("int main() { return 0; }");
        assert!(asm.contains("bits 64"));
        assert!(asm.contains("default rel"));
        assert!(asm.contains("section .text"));
        assert!(asm.contains("    global main"));
    }

    #[test]
    fn frame_size_is_rounded_to_sixteen_bytes() {
        let asm = asm_for("int main() { int a = 1; int b = 2; int c = 3; return a; }");
        assert!(asm.contains("sub rsp, 32"));
    }

    #[test]
    fn string_literal_uses_lea_on_assignment() {
        let asm = asm_for(r#"int main() { printf("hi"); return 0; }"#);
        assert!(asm.contains("section .data"));
        assert!(asm.contains("lea rcx, [str0]") || asm.contains("lea rdx, [str0]"));
    }

    #[test]
    fn comparison_lowers_to_setcc_sequence() {
        let asm = asm_for("int main() { int x = 1; if (x < 2) { return 1; } return 0; }");
        assert!(asm.contains("setl al"));
        assert!(asm.contains("movzx rax, al"));
    }

    #[test]
    fn division_zeroes_rdx_before_idiv() {
        let asm = asm_for("int main() { int x = 10 / 2; return x; }");
        assert!(asm.contains("xor rdx, rdx"));
        assert!(asm.contains("idiv rbx"));
    }

    #[test]
    fn call_sets_up_and_tears_down_shadow_space() {
        let asm = asm_for(r#"int main() { printf("hi"); return 0; }"#);
        assert!(asm.contains("sub rsp, 32"));
        assert!(asm.contains("add rsp, 32"));
    }

    #[test]
    fn no_main_means_no_global_directive() {
        let asm = asm_for("int helper() { return 1; }");
        assert!(!asm.contains("global main"));
    }
}
