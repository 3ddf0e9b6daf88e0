// SPDX-License-Identifier: MIT OR Apache-2.0
//! `ordoplay_matc` - offline material compiler.
//!
//! Reads a material description, compiles it and prints or writes the
//! generated shader sources.
//!
//! ```text
//! ordoplay_matc <description.ron> [--out-dir DIR] [--dump-graph]
//! ```

mod description;

use description::{DescriptionError, MaterialDescription};
use ordoplay_material_graph::{CompileError, ConfigError, SourceBackend};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Command line options
#[derive(Debug, Default, PartialEq)]
struct Options {
    description: PathBuf,
    out_dir: Option<PathBuf>,
    dump_graph: bool,
}

impl Options {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, CliError> {
        let mut options = Options::default();
        let mut description = None;
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--out-dir" => {
                    let dir = args.next().ok_or(CliError::Usage("--out-dir needs a directory"))?;
                    options.out_dir = Some(PathBuf::from(dir));
                }
                "--dump-graph" => options.dump_graph = true,
                flag if flag.starts_with("--") => return Err(CliError::UnknownFlag(flag.to_string())),
                _ if description.is_none() => description = Some(PathBuf::from(&arg)),
                _ => return Err(CliError::Usage("only one description file may be given")),
            }
        }

        options.description = description.ok_or(CliError::Usage("missing description file"))?;
        Ok(options)
    }
}

/// Errors surfaced by the CLI
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("usage: ordoplay_matc <description.ron> [--out-dir DIR] [--dump-graph]: {0}")]
    Usage(&'static str),

    #[error("unknown flag `{0}`")]
    UnknownFlag(String),

    #[error(transparent)]
    Description(#[from] DescriptionError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

fn run(options: &Options) -> Result<(), CliError> {
    let desc = MaterialDescription::load(&options.description)?;
    let base_dir = options.description.parent().unwrap_or_else(|| Path::new("."));
    let mut material = desc.build(base_dir)?;

    if options.dump_graph {
        let ron_str = ron::ser::to_string_pretty(material.graph(), ron::ser::PrettyConfig::default())
            .map_err(ConfigError::from)?;
        println!("{ron_str}");
    }

    let compiled = material.compile(&mut SourceBackend)?;
    let name = if desc.name.trim().is_empty() { "material" } else { desc.name.as_str() };

    match &options.out_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(ConfigError::from)?;
            for (ext, text) in [("vert", &compiled.source.vertex), ("frag", &compiled.source.fragment)] {
                let path = dir.join(format!("{name}.{ext}"));
                std::fs::write(&path, text).map_err(ConfigError::from)?;
                tracing::info!("Wrote {}", path.display());
            }
        }
        None => {
            println!("// {name}.vert\n{}", compiled.source.vertex);
            println!("// {name}.frag\n{}", compiled.source.fragment);
        }
    }

    Ok(())
}

fn main() {
    let env_filter = EnvFilter::from_default_env()
        .add_directive("ordoplay_material_cli=info".parse().unwrap())
        .add_directive("ordoplay_material_graph=info".parse().unwrap());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = Options::parse(std::env::args().skip(1)).and_then(|options| run(&options));
    if let Err(e) = result {
        tracing::error!("Material compile failed: {e}");
        std::process::exit(1);
    }
}
