use clap::{Parser, Subcommand};
use maquette_prep::{config, describe, output, pipeline};
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser)]
#[command(name = "maquette-prep")]
#[command(about = "Prepare maquette assets and configuration for packaging")]
#[command(long_about = "\
Prepare maquette assets and configuration for packaging

Reads the descriptor in the source folder, copies every referenced asset into
the destination media folder, and writes one normalized configuration document.

Source structure:

  maquette/
  ├── maquette.toml                # Tool config (optional, see gen-config)
  ├── Data.json                    # Descriptor: items, parts, media references
  ├── Assets/Media/                # Media referenced by the descriptor
  │   ├── QRCode/qr.png
  │   ├── Buttons/open.png
  │   └── Video/intro.mp4          # Written as Media/Videos/intro.mp4
  └── ModelInfos/3DMODEL/pump.glb  # Models are placed flat in Media/Models/

Destination structure:

  dist/
  ├── config.json                  # {\"equipments\": [...]}
  └── Media/
      ├── Models/pump.glb
      ├── QRCode/qr.png
      └── Videos/intro.mp4

Assets that moved are found by file name anywhere under the source folder.
Run 'maquette-prep describe' to generate Data.json from a ModelInfos/ModelParts
folder, and 'maquette-prep gen-config' for a documented maquette.toml.")]
#[command(version)]
struct Cli {
    /// Maquette source folder
    #[arg(long, default_value = ".", global = true)]
    source: PathBuf,

    /// Destination folder
    #[arg(long, default_value = "dist", global = true)]
    dest: PathBuf,

    /// Log every asset resolution
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Copy assets and write the configuration document
    Build,
    /// Resolve every reference without copying or writing anything
    Check,
    /// Generate the descriptor from the asset-folder layout
    Describe,
    /// Print a stock maquette.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Build => {
            let prep_config = config::load_config(&cli.source)?;
            println!(
                "==> Building {} → {}",
                cli.source.display(),
                cli.dest.display()
            );
            let report = pipeline::build(
                &cli.source,
                &cli.dest,
                &prep_config,
                pipeline::BuildOptions::default(),
            )?;
            output::print_build_output(&report);
        }
        Command::Check => {
            let prep_config = config::load_config(&cli.source)?;
            println!("==> Checking {}", cli.source.display());
            let report = pipeline::build(
                &cli.source,
                &cli.dest,
                &prep_config,
                pipeline::BuildOptions { dry_run: true },
            )?;
            output::print_build_output(&report);
            if report.missing.is_empty() {
                println!("==> All assets resolved");
            } else {
                println!("==> {} assets missing", report.missing.len());
            }
        }
        Command::Describe => {
            let prep_config = config::load_config(&cli.source)?;
            let descriptor = describe::describe(&cli.source)?;
            let path = prep_config.descriptor_path(&cli.source);
            describe::write_descriptor(&descriptor, &path)?;
            output::print_describe_output(&descriptor, &path);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
