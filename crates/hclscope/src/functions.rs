//! `tm_`-prefixed builtin function registry (spec.md §8)
//!
//! The rewriter treats any `tm_`-prefixed call as a target for substitution
//! (`rewriter.rs`'s `TARGET_PREFIX`), but it is this registry that actually
//! makes such a call evaluable: without a declared function, `hcl::eval`
//! rejects the call outright.
use hcl::eval::{FuncArgs, FuncDef, ParamType};
use hcl::Value;

/// The open-ended set of `tm_*` functions an [crate::evaluator::Evaluator]
/// declares into every evaluation context.
pub struct FunctionRegistry {
    functions: std::collections::HashMap<&'static str, fn() -> FuncDef>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard `tm_upper`/`tm_lower` string functions.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("tm_upper", create_upper_func);
        registry.register("tm_lower", create_lower_func);
        registry
    }

    pub fn register(&mut self, name: &'static str, factory: fn() -> FuncDef) {
        self.functions.insert(name, factory);
    }

    /// Declares every registered function into `ctx`.
    pub fn declare_into(&self, ctx: &mut hcl::eval::Context) {
        for (name, factory) in &self.functions {
            ctx.declare_func(*name, factory());
        }
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self {
            functions: std::collections::HashMap::new(),
        }
    }
}

fn create_upper_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::String)
        .build(|args: FuncArgs| Ok(Value::from(args[0].as_str().unwrap().to_uppercase())))
}

fn create_lower_func() -> FuncDef {
    FuncDef::builder()
        .param(ParamType::String)
        .build(|args: FuncArgs| Ok(Value::from(args[0].as_str().unwrap().to_lowercase())))
}

#[cfg(test)]
mod test {
    use super::*;
    use hcl::eval::Evaluate;

    fn eval(expr_str: &str) -> Value {
        let registry = FunctionRegistry::with_defaults();
        let mut ctx = hcl::eval::Context::new();
        registry.declare_into(&mut ctx);

        let body: hcl::Body = hcl::from_str(&format!("test = {expr_str}")).unwrap();
        let expr = body.attributes().find(|a| a.key() == "test").unwrap().expr();
        expr.evaluate(&ctx).unwrap()
    }

    #[test]
    fn tm_upper_uppercases() {
        assert_eq!(eval(r#"tm_upper("terramate is fun")"#), Value::from("TERRAMATE IS FUN"));
    }

    #[test]
    fn tm_lower_lowercases() {
        assert_eq!(eval(r#"tm_lower("TERRAMATE")"#), Value::from("terramate"));
    }
}
