mod cli;

use hclscope::evaluator::Evaluator;
use hclscope::scope::DirId;
use hclscope::value::Value;
use std::path::Path;

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("HCLSCOPE_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let command_result = match cli.command {
        cli::Command::Evaluate(evaluate_cli) => evaluate(evaluate_cli),
        cli::Command::Rewrite(rewrite_cli) => rewrite(rewrite_cli),
        cli::Command::Dev(dev_cli) => dev(dev_cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

/// Build an evaluator whose directory tree spans from `root` down to the
/// current directory, and return the current directory's scope id.
fn build_evaluator(root: &Path) -> anyhow::Result<(Evaluator, DirId)> {
    let root = root.canonicalize()?;
    let cwd = std::env::current_dir()?;

    anyhow::ensure!(
        cwd.starts_with(&root) || cwd == root,
        "current directory {} is not inside --root {}",
        cwd.display(),
        root.display()
    );

    let mut evaluator = Evaluator::with_default_resolvers(
        hclscope::scope::DirTree::new(),
        indexmap::IndexMap::new(),
    );
    let scope = evaluator.insert_dir(&cwd, &root);
    Ok((evaluator, scope))
}

pub fn evaluate(cli: cli::EvaluateCommand) -> anyhow::Result<()> {
    let (mut evaluator, scope) = build_evaluator(&cli.scope.root)?;

    let expr: hcl::Expression = cli.expression.parse()?;
    let value = evaluator.eval(&expr, scope)?;

    output(&cli.output, &Value::from(value))?;
    Ok(())
}

pub fn rewrite(cli: cli::RewriteCommand) -> anyhow::Result<()> {
    let (mut evaluator, scope) = build_evaluator(&cli.scope.root)?;

    let mut expr: hcl::Expression = cli.expression.parse()?;
    hclscope::rewriter::PartialRewriter::new(&mut evaluator, scope).rewrite(&mut expr)?;

    println!("{expr}");
    Ok(())
}

fn output(output: &cli::OutputArgs, value: &Value) -> anyhow::Result<()> {
    match output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), value)?,
        cli::OutputFormat::Json => serde_json::to_writer_pretty(std::io::stdout(), value)?,
    };

    Ok(())
}

/// (hclscope-developer) utilities
///
/// A quick way to expose internal structures for debugging purposes
pub fn dev(cli: cli::DevCommand) -> anyhow::Result<()> {
    use cli::DevSubCommand::*;

    let (evaluator, scope) = build_evaluator(&cli.scope.root)?;

    match cli.command {
        Tree => println!("{:#?}", evaluator.dirs()),
        Scope => println!("{scope:?}"),
    }

    Ok(())
}
