//! Partial expression rewriter (C5), AST-flavored
//!
//! Per spec.md §4.5's explicit "alternative" clause, this walks the parsed
//! expression tree rather than a raw token stream: simpler, at the cost of
//! exact source-byte preservation for untouched regions (trivia, comment
//! placement). The behavioral contract — which references get substituted,
//! which are left alone, how interpolations collapse — matches the
//! token-level description.
use crate::error::RewriteError;
use crate::evaluator::Evaluator;
use crate::reference::{refs_of, Ref};
use crate::scope::DirId;
use hcl::template::{Element, Literal};
use hcl::{Expression, Operation, Template, TemplateExpr};
use std::collections::HashSet;

/// The set of namespace roots the rewriter substitutes; everything else
/// passes through untouched.
const TARGET_PREFIX: &str = "tm_";

pub struct PartialRewriter<'a> {
    evaluator: &'a mut Evaluator,
    scope: DirId,
    target_namespaces: HashSet<&'static str>,
}

impl<'a> PartialRewriter<'a> {
    pub fn new(evaluator: &'a mut Evaluator, scope: DirId) -> Self {
        let mut target_namespaces = HashSet::new();
        target_namespaces.insert("global");
        target_namespaces.insert("terramate");

        Self {
            evaluator,
            scope,
            target_namespaces,
        }
    }

    pub fn rewrite(&mut self, expr: &mut Expression) -> Result<(), RewriteError> {
        match expr {
            Expression::Traversal(traversal) => {
                if let Some(r) = Ref::parse(traversal) {
                    if self.is_target(&r) {
                        *expr = self.evaluate_to_literal(expr.clone())?;
                        return Ok(());
                    }
                }
                self.rewrite(&mut traversal.expr)
            }
            Expression::Array(array) => {
                for element in array.iter_mut() {
                    self.rewrite(element)?;
                }
                Ok(())
            }
            Expression::Object(object) => {
                for value in object.values_mut() {
                    self.rewrite(value)?;
                }
                Ok(())
            }
            Expression::TemplateExpr(template_expr) => self.rewrite_template_expr(template_expr),
            Expression::FuncCall(call) => {
                if call.name.as_str().starts_with(TARGET_PREFIX) {
                    *expr = self.evaluate_to_literal(expr.clone())?;
                    return Ok(());
                }

                for arg in call.args.iter_mut() {
                    self.rewrite(arg)?;
                }
                Ok(())
            }
            Expression::Parenthesis(inner) => self.rewrite(inner),
            Expression::Conditional(cond) => {
                self.rewrite(&mut cond.cond_expr)?;
                self.rewrite(&mut cond.true_expr)?;
                self.rewrite(&mut cond.false_expr)
            }
            Expression::Operation(operation) => match operation.as_mut() {
                Operation::Binary(binop) => {
                    self.rewrite(&mut binop.lhs_expr)?;
                    self.rewrite(&mut binop.rhs_expr)
                }
                Operation::Unary(unop) => self.rewrite(&mut unop.expr),
            },
            Expression::ForExpr(forexpr) => {
                self.check_for_disallowed(&forexpr.collection_expr)?;
                if let Some(cond) = &forexpr.cond_expr {
                    self.check_for_disallowed(cond)?;
                }

                self.rewrite(&mut forexpr.collection_expr)?;
                if let Some(cond) = &mut forexpr.cond_expr {
                    self.rewrite(cond)?;
                }
                if let Some(key) = &mut forexpr.key_expr {
                    self.rewrite(key)?;
                }
                self.rewrite(&mut forexpr.value_expr)
            }
            _ => Ok(()),
        }
    }

    fn is_target(&self, r: &Ref) -> bool {
        self.target_namespaces.contains(r.object.as_str())
    }

    fn check_for_disallowed(&self, expr: &Expression) -> Result<(), RewriteError> {
        for r in refs_of(expr) {
            if self.is_target(&r) {
                return Err(RewriteError::ForDisallowed);
            }
        }
        Ok(())
    }

    fn evaluate_to_literal(&mut self, expr: Expression) -> Result<Expression, RewriteError> {
        let value = self
            .evaluator
            .eval(&expr, self.scope)
            .map_err(RewriteError::Eval)?;
        Ok(expr_from_value(value))
    }

    fn rewrite_template_expr(&mut self, template_expr: &mut TemplateExpr) -> Result<(), RewriteError> {
        let mut template = Template::from_expr(template_expr)?;

        let mut rewritten = Vec::with_capacity(template.elements().len());
        for element in std::mem::take(template.elements_mut()) {
            match element {
                Element::Literal(lit) => rewritten.push(Element::Literal(lit)),
                Element::Interpolation(mut interp) => {
                    self.rewrite(&mut interp.expr)?;

                    if matches!(
                        interp.expr,
                        Expression::Array(_) | Expression::Object(_)
                    ) {
                        return Err(RewriteError::Interpolation);
                    }

                    if let Some(literal) = as_plain_literal(&interp.expr) {
                        rewritten.push(Element::Literal(Literal::new(literal)));
                    } else {
                        rewritten.push(Element::Interpolation(interp));
                    }
                }
                Element::Directive(mut directive) => {
                    use hcl::template::Directive;
                    match &mut directive {
                        Directive::If(ifdir) => {
                            self.rewrite(&mut ifdir.cond_expr)?;
                        }
                        Directive::For(fordir) => {
                            self.check_for_disallowed(&fordir.collection_expr)?;
                            self.rewrite(&mut fordir.collection_expr)?;
                        }
                    }
                    rewritten.push(Element::Directive(directive));
                }
            }
        }

        *template.elements_mut() = merge_adjacent_literals(rewritten);
        *template_expr = TemplateExpr::QuotedString(template.to_string());
        Ok(())
    }
}

fn merge_adjacent_literals(elements: Vec<Element>) -> Vec<Element> {
    let mut merged: Vec<Element> = Vec::with_capacity(elements.len());
    for element in elements {
        if let (Some(Element::Literal(prev)), Element::Literal(next)) =
            (merged.last_mut(), &element)
        {
            let combined = format!("{prev}{next}");
            *prev = Literal::new(combined);
            continue;
        }
        merged.push(element);
    }
    merged
}

/// An interpolation collapses to a bare literal only once its rewritten
/// expression is itself a scalar literal; anything else (including an
/// untouched traversal, operation or conditional) keeps the `${…}` wrapper.
fn as_plain_literal(expr: &Expression) -> Option<String> {
    match expr {
        Expression::String(s) => Some(s.clone()),
        Expression::Number(n) => Some(n.to_string()),
        Expression::Bool(b) => Some(b.to_string()),
        Expression::Null => Some(String::new()),
        _ => None,
    }
}

fn expr_from_value(value: hcl::Value) -> Expression {
    match value {
        hcl::Value::Null => Expression::Null,
        hcl::Value::Bool(b) => Expression::Bool(b),
        hcl::Value::Number(n) => Expression::Number(n),
        hcl::Value::String(s) => Expression::String(s),
        hcl::Value::Array(a) => Expression::Array(a.into_iter().map(expr_from_value).collect()),
        hcl::Value::Object(o) => {
            let mut object: hcl::Object<hcl::ObjectKey, hcl::Expression> = Default::default();
            for (k, v) in o {
                object.insert(hcl::Identifier::sanitized(k).into(), expr_from_value(v));
            }
            Expression::Object(object)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::resolver::{GlobalsResolver, Resolver, ResolverRegistry};
    use crate::scope::{DirTree, StatementLoader};
    use crate::statement::{Rhs, SourceRange, Stmt, StatementList};
    use std::path::Path;

    struct FixedLoader(StatementList);

    impl StatementLoader for FixedLoader {
        fn load(&self, _dir: &Path) -> Result<StatementList, crate::error::LoadError> {
            Ok(self.0.clone())
        }
    }

    fn evaluator_with(stmts: StatementList) -> Evaluator {
        let mut dirs = DirTree::new();
        dirs.insert(Path::new("/root"), None);

        let mut resolvers = ResolverRegistry::new();
        resolvers.register(Box::new(GlobalsResolver::new(Box::new(FixedLoader(stmts)))));
        Evaluator::new(dirs, resolvers)
    }

    fn global_string(path: &[&str], value: &str) -> Stmt {
        let r = Ref::new(
            hcl::Identifier::unchecked("global"),
            path.iter().map(|s| s.to_string()).collect(),
        );
        Stmt::new(
            r.clone(),
            Rhs::Value(hcl::Value::String(value.to_string())),
            r,
            DirId::root(),
            SourceRange::default(),
        )
    }

    #[test]
    fn interpolation_collapses_to_plain_literal() {
        let mut stmts = StatementList::new();
        stmts.push(global_string(&["name"], "world"));
        let mut ev = evaluator_with(stmts);

        let mut expr: Expression = "\"hello ${global.name}\"".parse().unwrap();
        PartialRewriter::new(&mut ev, DirId::root())
            .rewrite(&mut expr)
            .unwrap();

        let Expression::TemplateExpr(template_expr) = &expr else {
            panic!("expected template expr")
        };
        assert_eq!(template_expr.to_string(), "hello world");
    }

    #[test]
    fn passthrough_for_unknown_namespace() {
        let mut ev = evaluator_with(StatementList::new());

        let mut expr: Expression = "unknown.value".parse().unwrap();
        let before = expr.clone();
        PartialRewriter::new(&mut ev, DirId::root())
            .rewrite(&mut expr)
            .unwrap();

        assert_eq!(format!("{before:?}"), format!("{expr:?}"));
    }

    #[test]
    fn interpolating_a_resolved_collection_is_an_error() {
        let mut stmts = StatementList::new();
        let r = Ref::new(
            hcl::Identifier::unchecked("global"),
            vec!["items".to_string()],
        );
        stmts.push(Stmt::new(
            r.clone(),
            Rhs::Value(hcl::Value::from(vec![hcl::Value::from(1), hcl::Value::from(2)])),
            r,
            DirId::root(),
            SourceRange::default(),
        ));
        let mut ev = evaluator_with(stmts);

        let mut expr: Expression = "\"${global.items}\"".parse().unwrap();
        let err = PartialRewriter::new(&mut ev, DirId::root())
            .rewrite(&mut expr)
            .unwrap_err();
        assert!(matches!(err, RewriteError::Interpolation));
    }

    #[test]
    fn tm_prefixed_call_is_evaluated_in_place() {
        let mut ev = evaluator_with(StatementList::new());

        let mut expr: Expression = r#"tm_upper("terramate is fun")"#.parse().unwrap();
        PartialRewriter::new(&mut ev, DirId::root())
            .rewrite(&mut expr)
            .unwrap();

        assert_eq!(expr, Expression::String("TERRAMATE IS FUN".to_string()));
    }

    #[test]
    fn target_var_in_for_iterator_is_disallowed() {
        let ev_stmts = StatementList::new();
        let mut ev = evaluator_with(ev_stmts);

        let mut expr: Expression = "[for x in global.items : x]".parse().unwrap();
        let err = PartialRewriter::new(&mut ev, DirId::root())
            .rewrite(&mut expr)
            .unwrap_err();
        assert!(matches!(err, RewriteError::ForDisallowed));
    }
}
