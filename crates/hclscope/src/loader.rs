//! Loads `globals`/`run_env`-style blocks from a directory into a [StatementList]
//!
//! Rather than a single flat collection of root structures, one
//! [StatementLoader] is asked, per directory, to scan that directory's
//! `*.hcl` files for blocks of a given identifier and expand them into
//! statements per the construction rules of the statement model.
use crate::error::{LoadError, SchemaIssue};
use crate::reference::Ref;
use crate::scope::{DirId, StatementLoader};
use crate::statement::{Rhs, SourceRange, Stmt, StatementList};
use hcl_edit::expr::{Expression, ObjectKey};
use hcl_edit::structure::{Block, Body, Structure};
use std::path::{Path, PathBuf};

/// Scans a directory's `*.hcl` files for blocks named `block_ident` and
/// expands each into [Stmt]s populating the `namespace` object.
pub struct BlockLoader {
    block_ident: &'static str,
    namespace: &'static str,
    /// `run_env` blocks honor a bare `unset` identifier as the right-hand
    /// side of an attribute as a sentinel that deletes an inherited key
    /// (spec.md §6); `globals` blocks do not.
    supports_unset: bool,
}

impl BlockLoader {
    pub fn new(block_ident: &'static str, namespace: &'static str) -> Self {
        Self {
            block_ident,
            namespace,
            supports_unset: false,
        }
    }

    pub fn globals() -> Self {
        Self::new("globals", "global")
    }

    pub fn run_env() -> Self {
        Self {
            supports_unset: true,
            ..Self::new("run_env", "let")
        }
    }
}

impl StatementLoader for BlockLoader {
    fn load(&self, dir: &Path) -> Result<StatementList, LoadError> {
        let mut list = StatementList::new();

        let read_dir = match std::fs::read_dir(dir) {
            Ok(read_dir) => read_dir,
            // A directory with no files at all is a perfectly valid, empty scope.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(list),
            Err(e) => return Err(e.into()),
        };

        for entry in read_dir {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(".hcl") {
                continue;
            }

            let path = entry.path();
            let contents = std::fs::read_to_string(&path)?;
            let body = hcl_edit::parser::parse_body(&contents)?;

            for block in find_blocks(&body, self.block_ident) {
                let stmts = expand_block(block, self.namespace, self.supports_unset, &path)?;
                for stmt in stmts {
                    list.push(stmt);
                }
            }
        }

        Ok(list)
    }
}

fn find_blocks<'a>(body: &'a Body, ident: &str) -> Vec<&'a Block> {
    body.into_iter()
        .filter_map(|structure| match structure {
            Structure::Block(block) if block.ident.as_str() == ident => Some(block),
            _ => None,
        })
        .collect()
}

fn expand_block(
    block: &Block,
    namespace: &'static str,
    supports_unset: bool,
    source: &Path,
) -> Result<Vec<Stmt>, LoadError> {
    let mut path = Vec::with_capacity(block.labels.len());
    for label in &block.labels {
        let label = label.as_str();
        if !is_valid_identifier(label) {
            return Err(LoadError::Schema(SchemaIssue::InvalidLabel {
                block_info: source_range(source),
                label: label.to_string(),
            }));
        }
        path.push(label.to_string());
    }

    let object = hcl::Identifier::unchecked(namespace);

    if block.body.attributes().next().is_none() && block.body.blocks().next().is_none() {
        let origin = Ref::new(object, path);
        return Ok(vec![Stmt::new(
            origin.clone(),
            Rhs::Special,
            origin,
            DirId::root(),
            source_range(source),
        )]);
    }

    let mut stmts = Vec::new();
    expand_body(&block.body, &object, &path, supports_unset, source, &mut stmts)?;
    Ok(stmts)
}

fn expand_body(
    body: &Body,
    object: &hcl::Identifier,
    path: &[String],
    supports_unset: bool,
    source: &Path,
    out: &mut Vec<Stmt>,
) -> Result<(), LoadError> {
    for attr in body.attributes() {
        let mut attr_path = path.to_vec();
        attr_path.push(attr.key.as_str().to_string());

        if supports_unset && is_unset_sentinel(&attr.value) {
            let lhs = Ref::new(object.clone(), attr_path);
            out.push(Stmt::new(
                lhs.clone(),
                Rhs::Unset,
                lhs,
                DirId::root(),
                source_range(source),
            ));
            continue;
        }

        let origin = Ref::new(object.clone(), attr_path.clone());
        expand_value(&attr.value, object, attr_path, origin, source, out);
    }

    for nested in body.blocks() {
        let mut nested_path = path.to_vec();
        for label in &nested.labels {
            let label = label.as_str();
            if !is_valid_identifier(label) {
                return Err(LoadError::Schema(SchemaIssue::InvalidLabel {
                    block_info: source_range(source),
                    label: label.to_string(),
                }));
            }
            nested_path.push(label.to_string());
        }

        expand_body(&nested.body, object, &nested_path, supports_unset, source, out)?;
    }

    Ok(())
}

fn is_unset_sentinel(expr: &Expression) -> bool {
    matches!(expr, Expression::Variable(ident) if ident.as_str() == "unset")
}

/// Recursively descend into object-literal RHSes. Every terminal
/// (non-object-literal) value yields one statement whose `origin` is fixed
/// (the attribute's declaration site) and whose `lhs` extends with the
/// nested path walked so far.
fn expand_value(
    expr: &Expression,
    object: &hcl::Identifier,
    path_so_far: Vec<String>,
    origin: Ref,
    source: &Path,
    out: &mut Vec<Stmt>,
) {
    if let Expression::Object(obj) = expr {
        for (key, value) in obj.iter() {
            let Some(key_str) = object_key_to_string(key) else {
                continue;
            };

            let mut next_path = path_so_far.clone();
            next_path.push(key_str);
            expand_value(value, object, next_path, origin.clone(), source, out);
        }
        return;
    }

    let lhs = Ref::new(object.clone(), path_so_far);
    out.push(Stmt::new(
        lhs,
        Rhs::Expr(expr.clone().into()),
        origin,
        DirId::root(),
        source_range(source),
    ));
}

fn object_key_to_string(key: &ObjectKey) -> Option<String> {
    match key {
        ObjectKey::Ident(ident) => Some(ident.as_str().to_string()),
        ObjectKey::Expression(Expression::String(s)) => Some(s.to_string()),
        _ => None,
    }
}

fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

fn source_range(path: &Path) -> SourceRange {
    SourceRange {
        source: Some(PathBuf::from(path)),
        byte_start: 0,
        byte_end: 0,
    }
}
