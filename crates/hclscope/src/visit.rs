//! Traversal-enumeration helper used by [crate::reference::refs_of]
use hcl::{template::Directive, template::Element, Expression, Operation, Template, Traversal};

/// Recursively visit all [hcl::Traversal]s in `expr`, immutably.
pub fn visit_traversals(expr: &Expression, visitor: &mut dyn FnMut(&Traversal)) {
    match expr {
        Expression::Variable(_) => {}
        Expression::Traversal(traversal) => {
            visitor(traversal);
            visit_traversals(&traversal.expr, visitor);
        }
        Expression::Array(array) => {
            for expr in array {
                visit_traversals(expr, visitor);
            }
        }
        Expression::Object(object) => {
            for value in object.values() {
                visit_traversals(value, visitor);
            }
        }
        Expression::TemplateExpr(template_expr) => {
            if let Ok(template) = Template::from_expr(template_expr) {
                visit_template_traversals(&template, visitor);
            }
        }
        Expression::FuncCall(call) => {
            for arg in call.args.iter() {
                visit_traversals(arg, visitor);
            }
        }
        Expression::Parenthesis(expr) => visit_traversals(expr, visitor),
        Expression::Conditional(cond) => {
            visit_traversals(&cond.cond_expr, visitor);
            visit_traversals(&cond.true_expr, visitor);
            visit_traversals(&cond.false_expr, visitor);
        }
        Expression::Operation(operation) => match operation.as_ref() {
            Operation::Binary(binop) => {
                visit_traversals(&binop.lhs_expr, visitor);
                visit_traversals(&binop.rhs_expr, visitor);
            }
            Operation::Unary(unop) => visit_traversals(&unop.expr, visitor),
        },
        Expression::ForExpr(forexpr) => {
            if let Some(e) = &forexpr.cond_expr {
                visit_traversals(e, visitor);
            }
            if let Some(e) = &forexpr.key_expr {
                visit_traversals(e, visitor);
            }
            visit_traversals(&forexpr.value_expr, visitor);
            visit_traversals(&forexpr.collection_expr, visitor);
        }
        _ => {}
    }
}

fn visit_template_traversals(template: &Template, visitor: &mut dyn FnMut(&Traversal)) {
    for element in template.elements() {
        match element {
            Element::Interpolation(interpolation) => {
                visit_traversals(&interpolation.expr, visitor);
            }
            Element::Directive(directive) => match directive {
                Directive::If(ifdir) => {
                    visit_traversals(&ifdir.cond_expr, visitor);
                    visit_template_traversals(&ifdir.true_template, visitor);
                    if let Some(t) = &ifdir.false_template {
                        visit_template_traversals(t, visitor);
                    }
                }
                Directive::For(fordir) => {
                    visit_template_traversals(&fordir.template, visitor);
                    visit_traversals(&fordir.collection_expr, visitor);
                }
            },
            Element::Literal(_) => {}
        }
    }
}
