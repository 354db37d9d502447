//! Three-address code (TAC) intermediate representation and lowering.
//!
//! [`generate`] walks a type-checked [`ast::Program`] post-order and
//! produces a flat [`Vec<Instr>`] plus the program's interned string
//! literals. Every destination operand is a fresh `t<N>` temporary or a
//! fresh `L<N>` label; both counters are monotonic for the whole program,
//! never reset per function, so IR text stays unambiguous when printed with
//! `--show-ir`.

use crate::ast::{BinOpKind, Block, Expr, Item, NumLit, Program, Stmt, UnaryOpKind};

/// A single three-address instruction. `IfGoto` is never produced by
/// [`generate`], since the grammar has no unconditional "goto if true", but
/// the ASM generator still lowers it, so the variant stays for completeness.
#[derive(Debug, Clone)]
pub enum Instr {
    Label(String),
    Assign {
        dest: String,
        src: String,
    },
    BinOp {
        dest: String,
        lhs: String,
        op: &'static str,
        rhs: String,
    },
    UnaryOp {
        dest: String,
        op: &'static str,
        operand: String,
    },
    Goto(String),
    IfFalseGoto {
        cond: String,
        label: String,
    },
    IfGoto {
        cond: String,
        label: String,
    },
    Param(String),
    Call {
        dest: Option<String>,
        func: String,
        args: Vec<String>,
    },
    Return(Option<String>),
    FuncBegin {
        name: String,
        params: Vec<String>,
    },
    FuncEnd(String),
}

impl std::fmt::Display for Instr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Instr::Label(name) => write!(f, "{}:", name),
            Instr::Assign { dest, src } => write!(f, "{} = {}", dest, src),
            Instr::BinOp { dest, lhs, op, rhs } => write!(f, "{} = {} {} {}", dest, lhs, op, rhs),
            Instr::UnaryOp { dest, op, operand } => write!(f, "{} = {}{}", dest, op, operand),
            Instr::Goto(label) => write!(f, "goto {}", label),
            Instr::IfFalseGoto { cond, label } => write!(f, "ifFalse {} goto {}", cond, label),
            Instr::IfGoto { cond, label } => write!(f, "if {} goto {}", cond, label),
            Instr::Param(value) => write!(f, "param {}", value),
            Instr::Call { dest, func, args } => {
                let joined = args.join(", ");
                match dest {
                    Some(d) => write!(f, "{} = call {}({})", d, func, joined),
                    None => write!(f, "call {}({})", func, joined),
                }
            }
            Instr::Return(Some(v)) => write!(f, "return {}", v),
            Instr::Return(None) => write!(f, "return"),
            Instr::FuncBegin { name, params } => write!(f, "func {}({})", name, params.join(", ")),
            Instr::FuncEnd(name) => write!(f, "endfunc {}", name),
        }
    }
}

/// The program's string-literal pool. Each distinct literal text is
/// assigned exactly one label, in first-use order, so the same literal
/// appearing twice shares one `.data` entry.
#[derive(Debug, Default)]
pub struct StringTable {
    values: Vec<String>,
    index: std::collections::HashMap<String, usize>,
}

impl StringTable {
    fn intern(&mut self, value: &str) -> String {
        if let Some(&idx) = self.index.get(value) {
            return format!("str{}", idx);
        }
        let idx = self.values.len();
        self.values.push(value.to_string());
        self.index.insert(value.to_string(), idx);
        format!("str{}", idx)
    }

    /// The pool's entries as `(label, text)` pairs, in first-use order.
    pub fn ordered(&self) -> Vec<(String, String)> {
        self.values
            .iter()
            .enumerate()
            .map(|(idx, text)| (format!("str{}", idx), text.clone()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn binop_symbol(op: BinOpKind) -> &'static str {
    match op {
        BinOpKind::Add => "+",
        BinOpKind::Sub => "-",
        BinOpKind::Mul => "*",
        BinOpKind::Div => "/",
        BinOpKind::Mod => "%",
        BinOpKind::Eq => "==",
        BinOpKind::Neq => "!=",
        BinOpKind::Lt => "<",
        BinOpKind::Gt => ">",
        BinOpKind::Le => "<=",
        BinOpKind::Ge => ">=",
        BinOpKind::And => "&&",
        BinOpKind::Or => "||",
    }
}

fn unary_symbol(op: UnaryOpKind) -> &'static str {
    match op {
        UnaryOpKind::Plus => "+",
        UnaryOpKind::Neg => "-",
        UnaryOpKind::Not => "!",
    }
}

struct Generator {
    instrs: Vec<Instr>,
    strings: StringTable,
    temp_counter: usize,
    label_counter: usize,
}

impl Generator {
    fn new() -> Self {
        Generator {
            instrs: Vec::new(),
            strings: StringTable::default(),
            temp_counter: 0,
            label_counter: 0,
        }
    }

    fn push(&mut self, instr: Instr) {
        self.instrs.push(instr);
    }

    fn new_temp(&mut self) -> String {
        let t = format!("t{}", self.temp_counter);
        self.temp_counter += 1;
        t
    }

    fn new_label(&mut self) -> String {
        let l = format!("L{}", self.label_counter);
        self.label_counter += 1;
        l
    }

    fn lower_item(&mut self, item: &Item) {
        match item {
            Item::Func(f) => {
                self.push(Instr::FuncBegin {
                    name: f.name.clone(),
                    params: f.params.iter().map(|p| p.name.clone()).collect(),
                });
                self.lower_block(&f.body);
                self.push(Instr::FuncEnd(f.name.clone()));
            }
            Item::Stmt(s) => self.lower_stmt(s),
        }
    }

    fn lower_block(&mut self, block: &Block) {
        for stmt in &block.stmts {
            self.lower_stmt(stmt);
        }
    }

    fn lower_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Decl { name, init, .. } => {
                if let Some(e) = init {
                    let src = self.lower_expr(e);
                    self.push(Instr::Assign {
                        dest: name.clone(),
                        src,
                    });
                }
            }
            Stmt::Assign { name, expr } => {
                let src = self.lower_expr(expr);
                self.push(Instr::Assign {
                    dest: name.clone(),
                    src,
                });
            }
            Stmt::Return(expr) => {
                let value = expr.as_ref().map(|e| self.lower_expr(e));
                self.push(Instr::Return(value));
            }
            Stmt::If {
                cond,
                then_block,
                else_block,
            } => self.lower_if(cond, then_block, else_block.as_ref()),
            Stmt::While { cond, body } => self.lower_while(cond, body),
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => self.lower_for(init, cond, step, body),
            Stmt::Expr(e) => {
                self.lower_expr(e);
            }
            Stmt::Block(b) => self.lower_block(b),
        }
    }

    fn lower_if(&mut self, cond: &Expr, then_block: &Block, else_block: Option<&Block>) {
        let c = self.lower_expr(cond);
        let l_end = self.new_label();
        match else_block {
            Some(else_b) => {
                let l_else = self.new_label();
                self.push(Instr::IfFalseGoto {
                    cond: c,
                    label: l_else.clone(),
                });
                self.lower_block(then_block);
                self.push(Instr::Goto(l_end.clone()));
                self.push(Instr::Label(l_else));
                self.lower_block(else_b);
                self.push(Instr::Label(l_end));
            }
            None => {
                self.push(Instr::IfFalseGoto {
                    cond: c,
                    label: l_end.clone(),
                });
                self.lower_block(then_block);
                self.push(Instr::Label(l_end));
            }
        }
    }

    fn lower_while(&mut self, cond: &Expr, body: &Block) {
        let l_start = self.new_label();
        let l_end = self.new_label();
        self.push(Instr::Label(l_start.clone()));
        let c = self.lower_expr(cond);
        self.push(Instr::IfFalseGoto {
            cond: c,
            label: l_end.clone(),
        });
        self.lower_block(body);
        self.push(Instr::Goto(l_start));
        self.push(Instr::Label(l_end));
    }

    fn lower_for(&mut self, init: &Stmt, cond: &Expr, step: &Stmt, body: &Block) {
        self.lower_stmt(init);
        let l_start = self.new_label();
        let l_end = self.new_label();
        self.push(Instr::Label(l_start.clone()));
        let c = self.lower_expr(cond);
        self.push(Instr::IfFalseGoto {
            cond: c,
            label: l_end.clone(),
        });
        self.lower_block(body);
        self.lower_stmt(step);
        self.push(Instr::Goto(l_start));
        self.push(Instr::Label(l_end));
    }

    fn lower_expr(&mut self, expr: &Expr) -> String {
        match expr {
            Expr::Num(NumLit::Int(v)) => v.to_string(),
            Expr::Num(NumLit::Float(v)) => v.to_string(),
            Expr::String(s) => self.strings.intern(s),
            Expr::Var(name) => name.clone(),
            Expr::Unary(op, operand) => {
                let o = self.lower_expr(operand);
                let t = self.new_temp();
                self.push(Instr::UnaryOp {
                    dest: t.clone(),
                    op: unary_symbol(*op),
                    operand: o,
                });
                t
            }
            Expr::Binary(lhs, op, rhs) => {
                let l = self.lower_expr(lhs);
                let r = self.lower_expr(rhs);
                let t = self.new_temp();
                self.push(Instr::BinOp {
                    dest: t.clone(),
                    lhs: l,
                    op: binop_symbol(*op),
                    rhs: r,
                });
                t
            }
            Expr::Call(name, args) => {
                let mut arg_ops = Vec::with_capacity(args.len());
                for a in args {
                    let o = self.lower_expr(a);
                    self.push(Instr::Param(o.clone()));
                    arg_ops.push(o);
                }
                let t = self.new_temp();
                self.push(Instr::Call {
                    dest: Some(t.clone()),
                    func: name.clone(),
                    args: arg_ops,
                });
                t
            }
        }
    }
}

/// Lowers a whole program into flat TAC plus its interned string pool.
pub fn generate(program: &Program) -> (Vec<Instr>, StringTable) {
    let mut gen = Generator::new();
    for item in &program.items {
        gen.lower_item(item);
    }
    (gen.instrs, gen.strings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::adapt;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn ir_for(src: &str) -> Vec<Instr> {
        let raw = Lexer::new(src).tokenize().unwrap();
        let tokens = adapt(raw).unwrap();
        let program = Parser::new(tokens).parse().unwrap();
        generate(&program).0
    }

    #[test]
    fn return_of_literal_lowers_directly() {
        let instrs = ir_for("int main() { return 0; }");
        let text: Vec<_> = instrs.iter().map(|i| i.to_string()).collect();
        assert_eq!(text, vec!["func main()", "return 0", "endfunc main"]);
    }

    #[test]
    fn binary_expr_allocates_one_temp() {
        let instrs = ir_for("int main() { int x = 1 + 2; return x; }");
        let strs: Vec<_> = instrs.iter().map(|i| i.to_string()).collect();
        assert!(strs.contains(&"t0 = 1 + 2".to_string()));
        assert!(strs.contains(&"x = t0".to_string()));
    }

    #[test]
    fn string_literal_reuse_shares_one_label() {
        let instrs = ir_for(r#"int main() { printf("hi"); printf("hi"); return 0; }"#);
        let strs: Vec<_> = instrs.iter().map(|i| i.to_string()).collect();
        let param_lines: Vec<_> = strs.iter().filter(|s| s.starts_with("param")).collect();
        assert_eq!(param_lines, vec!["param str0", "param str0"]);
    }

    #[test]
    fn if_else_produces_two_labels() {
        let instrs = ir_for("int main() { int x = 1; if (x) { return 1; } else { return 0; } }");
        let labels: Vec<_> = instrs
            .iter()
            .filter(|i| matches!(i, Instr::Label(_)))
            .collect();
        assert_eq!(labels.len(), 2);
    }

    #[test]
    fn while_loop_jumps_back_to_its_start_label() {
        let instrs = ir_for("int main() { int i = 0; while (i < 3) { i = i + 1; } return 0; }");
        let text: Vec<_> = instrs.iter().map(|i| i.to_string()).collect();
        assert!(text.iter().any(|s| s == "goto L0"));
    }

    #[test]
    fn call_result_still_allocates_a_temp_when_discarded() {
        let instrs = ir_for(r#"int main() { printf("hi"); return 0; }"#);
        assert!(instrs
            .iter()
            .any(|i| matches!(i, Instr::Call { dest: Some(_), .. })));
    }
}
