use crate::parser::ast::*;

/// Print a `Module` back into canonical source text.
///
/// Every compound expression is parenthesized, so the output parses back to
/// the same tree regardless of operator precedence.
pub fn unparse(module: &Module) -> String {
    let mut pp = PrettyPrinter::new();
    for stmt in &module.body {
        pp.emit_stmt(stmt);
        pp.newline();
    }
    pp.buf
}

pub fn unparse_expr(expr: &Expr) -> String {
    let mut pp = PrettyPrinter::new();
    pp.emit_expr(expr);
    pp.buf
}

struct PrettyPrinter {
    buf: String,
}

impl PrettyPrinter {
    fn new() -> Self {
        Self { buf: String::new() }
    }

    fn write(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    fn newline(&mut self) {
        self.buf.push('\n');
    }

    // ── Statements ───────────────────────────────────────────────────

    fn emit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Assign { target, value } => {
                self.write(target);
                self.write(" = ");
                self.emit_expr(value);
            }
            Stmt::Expr(e) => self.emit_expr(e),
            Stmt::Pass => self.write("pass"),
            Stmt::Return(None) => self.write("return"),
            Stmt::Return(Some(e)) => {
                self.write("return ");
                self.emit_expr(e);
            }
            Stmt::If { test, body } => self.emit_compound("if", test, body),
            Stmt::While { test, body } => self.emit_compound("while", test, body),
        }
    }

    fn emit_compound(&mut self, keyword: &str, test: &Expr, body: &Stmt) {
        self.write(keyword);
        self.write(" ");
        self.emit_expr(test);
        self.write(": ");
        self.emit_stmt(body);
    }

    // ── Expressions ──────────────────────────────────────────────────

    fn emit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Name(n) => self.write(n),
            Expr::Int(v) => self.write(&v.to_string()),
            Expr::Float(v) => self.write(&format!("{v:?}")),
            Expr::Str(s) => self.emit_string(s),
            Expr::Bool(true) => self.write("True"),
            Expr::Bool(false) => self.write("False"),
            Expr::NoneLit => self.write("None"),
            Expr::Unary { op, operand } => {
                self.write("(");
                self.write(op.as_str());
                self.emit_expr(operand);
                self.write(")");
            }
            Expr::Binary { op, lhs, rhs } => {
                self.write("(");
                self.emit_expr(lhs);
                self.write(" ");
                self.write(op.as_str());
                self.write(" ");
                self.emit_expr(rhs);
                self.write(")");
            }
            Expr::Call { func, args } => {
                self.write(func);
                self.write("(");
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.emit_expr(arg);
                }
                self.write(")");
            }
        }
    }

    fn emit_string(&mut self, s: &str) {
        self.buf.push('"');
        for c in s.chars() {
            match c {
                '\\' => self.write("\\\\"),
                '"' => self.write("\\\""),
                '\n' => self.write("\\n"),
                '\t' => self.write("\\t"),
                '\r' => self.write("\\r"),
                c if (c as u32) < 0x20 || c == '\x7f' => {
                    self.write(&format!("\\x{:02x}", c as u32))
                }
                c => self.buf.push(c),
            }
        }
        self.buf.push('"');
    }
}
