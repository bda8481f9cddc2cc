use clap::{Parser, ValueEnum};
use env_logger::Env;
use std::path::PathBuf;

use cloudgen_compiler::{
    error::CloudgenError,
    formatter::{ClangFormat, Formatter, Formatters, RuffFormat},
    run, Family, GeneratorConfig, OutputLayout,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FamilyArg {
    Tdf,
    Kv,
    Rpc,
}

impl From<FamilyArg> for Family {
    fn from(arg: FamilyArg) -> Self {
        match arg {
            FamilyArg::Tdf => Family::Tdf,
            FamilyArg::Kv  => Family::Kv,
            FamilyArg::Rpc => Family::Rpc,
        }
    }
}

#[derive(Parser)]
#[command(name = "cloudgen")]
#[command(
    about = "Generate C headers, Kconfig fragments and Python bindings from TDF, KV and RPC definitions",
    long_about = None
)]
struct Cli {
    /// Directory holding `tdf.json`, `kv_store.json` and `rpc.json`
    #[arg(short, long, env = "CLOUDGEN_DEFS")]
    definitions: PathBuf,

    /// Directory holding extension documents with the same file names
    #[arg(short, long, env = "CLOUDGEN_EXT_DEFS")]
    extensions: Option<PathBuf>,

    /// Output directory for the firmware artifacts
    #[arg(short, long)]
    output: PathBuf,

    /// Output directory for the Python bindings (defaults to `<output>/python`)
    #[arg(long)]
    host_output: Option<PathBuf>,

    /// Families to generate (defaults to all)
    #[arg(short, long, value_enum)]
    family: Vec<FamilyArg>,

    /// clang-format binary
    #[arg(long, env = "CLANG_FORMAT", default_value = "clang-format")]
    clang_format: PathBuf,

    /// `.clang-format` style file passed to clang-format
    #[arg(long)]
    clang_format_style: Option<PathBuf>,

    /// ruff binary used on Python extension modules
    #[arg(long, default_value = "ruff")]
    ruff: PathBuf,

    /// Skip the external formatters
    #[arg(long)]
    no_format: bool,

    /// Render everything and list the files, without writing them
    #[arg(long)]
    dry_run: bool,

    /// Debug logging (`RUST_LOG` takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn formatters(&self) -> Formatters {
        if self.no_format {
            return Formatters::none();
        }
        let c: Box<dyn Formatter> = Box::new(ClangFormat {
            binary:     self.clang_format.clone(),
            style_file: self.clang_format_style.clone(),
        });
        let python: Box<dyn Formatter> = Box::new(RuffFormat { binary: self.ruff.clone() });
        Formatters { c, python }
    }

    fn config(&self) -> GeneratorConfig {
        let families = if self.family.is_empty() {
            vec![Family::Tdf, Family::Kv, Family::Rpc]
        } else {
            self.family.iter().copied().map(Family::from).collect()
        };
        GeneratorConfig {
            definitions: self.definitions.clone(),
            extensions:  self.extensions.clone(),
            layout:      OutputLayout {
                firmware: self.output.clone(),
                host:     self.host_output.clone().unwrap_or_else(|| self.output.join("python")),
            },
            families,
            dry_run:     self.dry_run,
        }
    }
}

fn main() -> Result<(), CloudgenError> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    let formatters = if cli.dry_run { Formatters::none() } else { cli.formatters() };

    let paths = run(&cli.config(), &formatters)?;
    if cli.dry_run {
        println!("{} files would be written", paths.len());
    } else {
        println!("Generated {} files", paths.len());
    }
    Ok(())
}
