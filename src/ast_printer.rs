use crate::ast::{Expr, FunctionDecl, LiteralValue, Stmt};

/// Converts syntax trees to the Crafting‑Interpreters parenthesised prefix
/// form, e.g. `(+ 1.0 (group 2.0))`.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr) -> String {
        match expr {
            // ── literals ────────────────────────────────────────────────
            Expr::Literal(lit) => match lit {
                LiteralValue::True => "true".into(),

                LiteralValue::False => "false".into(),

                LiteralValue::Nil => "nil".into(),

                LiteralValue::Str(s) => s.clone(),

                LiteralValue::Number(n) => {
                    if n.fract() == 0.0 {
                        // 3 → 3.0
                        format!("{:.1}", n)
                    } else {
                        n.to_string()
                    }
                }
            },

            // ── grouping ────────────────────────────────────────────────
            Expr::Grouping(inner) => format!("(group {})", Self::print(inner)),

            // ── operators ───────────────────────────────────────────────
            Expr::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, Self::print(right))
            }

            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                Self::print(left),
                Self::print(right)
            ),

            // ── names ───────────────────────────────────────────────────
            Expr::Variable { name, .. } => name.lexeme.clone(),

            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.lexeme, Self::print(value))
            }

            Expr::This { .. } => "this".into(),

            Expr::Super { method, .. } => format!("(super {})", method.lexeme),

            // ── calls and properties ────────────────────────────────────
            Expr::Call {
                callee, arguments, ..
            } => {
                let mut s = format!("(call {}", Self::print(callee));
                for arg in arguments {
                    s.push(' ');
                    s.push_str(&Self::print(arg));
                }
                s.push(')');
                s
            }

            Expr::Get { object, name } => format!("(. {} {})", Self::print(object), name.lexeme),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(= (. {} {}) {})",
                Self::print(object),
                name.lexeme,
                Self::print(value)
            ),
        }
    }

    pub fn print_stmt(stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expression(expr) => format!("(; {})", Self::print(expr)),

            Stmt::Print(expr) => format!("(print {})", Self::print(expr)),

            Stmt::Var { name, initializer } => match initializer {
                Some(init) => format!("(var {} {})", name.lexeme, Self::print(init)),
                None => format!("(var {})", name.lexeme),
            },

            Stmt::Block(statements) => Self::block(statements),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if-else {} {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch),
                    Self::print_stmt(else_branch)
                ),
                None => format!(
                    "(if {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch)
                ),
            },

            Stmt::While { condition, body } => format!(
                "(while {} {})",
                Self::print(condition),
                Self::print_stmt(body)
            ),

            Stmt::Function(declaration) => format!("(fun {})", Self::function(declaration)),

            Stmt::Return { value, .. } => match value {
                Some(value) => format!("(return {})", Self::print(value)),
                None => "(return)".into(),
            },

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let mut s = format!("(class {}", name.lexeme);
                if let Some(superclass) = superclass {
                    s.push_str(" < ");
                    s.push_str(&Self::print(superclass));
                }
                for method in methods {
                    s.push(' ');
                    s.push_str(&Self::function(method));
                }
                s.push(')');
                s
            }
        }
    }

    /// One line per top‑level statement.
    pub fn print_program(statements: &[Stmt]) -> String {
        statements
            .iter()
            .map(Self::print_stmt)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn block(statements: &[Stmt]) -> String {
        let mut s = String::from("(block");
        for stmt in statements {
            s.push(' ');
            s.push_str(&Self::print_stmt(stmt));
        }
        s.push(')');
        s
    }

    fn function(declaration: &FunctionDecl) -> String {
        let params: Vec<&str> = declaration
            .params
            .iter()
            .map(|param| param.lexeme.as_str())
            .collect();

        format!(
            "{}({}) {}",
            declaration.name.lexeme,
            params.join(" "),
            Self::block(&declaration.body)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::scanner::Scanner;

    fn parse(source: &str) -> Vec<Stmt> {
        let (tokens, errors) = Scanner::new(source.as_bytes()).scan_all();
        assert!(errors.is_empty());
        Parser::new(&tokens).parse().unwrap()
    }

    #[test]
    fn prints_nested_expression() {
        let (tokens, _) = Scanner::new(b"-1 + (2 * 3.5)").scan_all();
        let expr = Parser::new(&tokens).parse_expression().unwrap();

        assert_eq!(AstPrinter::print(&expr), "(+ (- 1.0) (group (* 2.0 3.5)))");
    }

    #[test]
    fn prints_class_with_superclass() {
        let program = parse("class B < A { f(x) { return x; } }");

        assert_eq!(
            AstPrinter::print_program(&program),
            "(class B < A f(x) (block (return x)))"
        );
    }

    #[test]
    fn for_loop_shows_desugared_while() {
        let program = parse("for (var i = 0; i < 2; i = i + 1) print i;");

        assert_eq!(
            AstPrinter::print_program(&program),
            "(block (var i 0.0) (while (< i 2.0) (block (print i) (; (= i (+ i 1.0))))))"
        );
    }
}
