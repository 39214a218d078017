//! Error kinds surfaced by the core, per the error-handling design
use crate::reference::Ref;
use crate::statement::SourceRange;

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("no files found in directory")]
    NoFilesFound,
    #[error("io error")]
    Io(#[from] std::io::Error),
    #[error("unable to parse hcl file")]
    HclParse(#[from] hcl_edit::parser::Error),
    #[error("globals label is not a valid identifier: {0:?}")]
    Schema(SchemaIssue),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaIssue {
    InvalidLabel { block_info: SourceRange, label: String },
}

/// `eval` / `cycle` / `undeclared` / `invalid-type` per spec.md §7. These
/// are unified into one enum because they share the same propagation
/// breadcrumb mechanism ("evaluating LHS from SCOPE").
#[derive(thiserror::Error, Debug)]
pub enum EvalError {
    #[error("cycle detected at {reference}")]
    Cycle { reference: Ref },

    #[error("undeclared reference: {reference}")]
    Undeclared { reference: Ref },

    #[error("no resolver registered for namespace {namespace}")]
    UnknownNamespace { namespace: hcl::Identifier },

    #[error("run-environment attribute {reference} must evaluate to a string")]
    InvalidType { reference: Ref },

    #[error("{0}")]
    Hcl(#[from] hcl::eval::Errors),

    #[error("evaluating {reference} from {scope}: {source}")]
    WithBreadcrumb {
        reference: Ref,
        scope: String,
        #[source]
        source: Box<EvalError>,
    },

    #[error(transparent)]
    Load(#[from] LoadError),
}

impl EvalError {
    pub fn with_breadcrumb(self, reference: Ref, scope: impl Into<String>) -> EvalError {
        EvalError::WithBreadcrumb {
            reference,
            scope: scope.into(),
            source: Box::new(self),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum RewriteError {
    #[error("target-namespaced variable used inside a for-expression iterator/generator")]
    ForDisallowed,

    #[error("collection value cannot be interpolated into a string")]
    Interpolation,

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("malformed tokens while partially evaluating HCL")]
    Partial(#[from] hcl_edit::parser::Error),
}
