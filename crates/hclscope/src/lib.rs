//! # hclscope - lazy hierarchical variable evaluator and partial HCL rewriter
//!
//! ## Introduction for developers
//!
//! Read this to understand how `hclscope` works internally.
//!
//! ### HCL terms
//!
//! Quick introduction to terms used to describe elements of HCL documents.
//!
//! In hcl terms...
//! - a file gets parsed as a `body`
//! - ...which is just a list of `structures`
//! - ...where there are two kinds:
//!   - `attribute`: a "key = value" pair
//!   - or `block`:
//!     - 1 `identifier`
//!     - followed by 0 or more `labels`
//!     - and a `body` enclosed in `{` and `}`
//!
//! Configuration is written as `globals` (and `run_env`) blocks scattered
//! across a directory tree:
//!
//! ```hcl
//! globals {
//!   obj = {
//!     a = 1
//!   }
//! }
//!
//! run_env {
//!   PATH = "/usr/bin"
//! }
//! ```
//!
//! ### Loading
//!
//! [loader::BlockLoader] scans one directory's `*.hcl` files for blocks of
//! a given identifier (`globals`, `run_env`) and expands each attribute —
//! recursing through nested object literals — into the leaf [statement::Stmt]s
//! described in [statement].
//!
//! ### Reference and statement model
//!
//! [reference::Ref] is the canonical `namespace.path.to.leaf` address.
//! [statement::StatementList::select_by] walks a length-sorted statement
//! list to find the statements relevant to a reference, distinguishing an
//! exact match from "more specific, needs to keep climbing the directory
//! tree".
//!
//! ### Scope resolution
//!
//! [scope::DirTree] is a parent-linked arena of directories; [scope::ScopeCache]
//! lazily loads and caches each directory's statement list, and recurses to
//! the parent directory whenever a reference isn't fully resolved locally.
//! [resolver] wires a handful of such hierarchical resolvers (`global`,
//! `let`) alongside flat, non-hierarchical ones (`env`, `terramate`) behind
//! one dynamically-dispatched [resolver::Resolver] interface.
//!
//! ### Evaluation
//!
//! [evaluator::Evaluator] discovers exactly the references an expression
//! depends on, recursively resolves and evaluates their right-hand sides
//! (detecting cycles along the way), projects the accumulated leaves back
//! into a nested object per namespace, and hands the original expression to
//! [hcl::eval] for the final arithmetic/interpolation/conditional pass.
//!
//! ### Partial rewriting
//!
//! [rewriter::PartialRewriter] walks a parsed expression, replacing every
//! `global`/`terramate`-namespaced variable and every `tm_`-prefixed
//! function call with its evaluated value while leaving everything else —
//! other functions, other namespaces, for-expressions, string templates —
//! structurally intact.
//!
//! ### Output
//!
//! Evaluated [hcl::Value]s are converted to [value::Value] for serialization
//! via [serde].
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod loader;
pub mod reference;
pub mod resolver;
pub mod rewriter;
pub mod scope;
pub mod statement;
pub mod value;
mod visit;
