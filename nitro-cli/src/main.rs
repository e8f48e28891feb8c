//! Nitro CLI
//!
//! Command-line front end for converting furniture SWFs and poking at
//! `.nitro` archives.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use nitro::{Archive, ArchiveError, NitroError, Settings, convert_batch};
use tracing::{Level, debug, warn};

#[derive(Parser)]
#[command(name = "nitro")]
#[command(about = "Convert SWF furniture into Nitro archives and inspect the results")]
#[command(version)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one or more SWF files to .nitro archives
    Convert {
        /// SWF files to convert
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Directory for the .nitro archives and icons
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Depth for logic dimensions without z (defaults to the settings file)
        #[arg(long)]
        default_z: Option<f64>,
    },

    /// List the entries of a .nitro archive
    Inspect {
        archive: PathBuf,
    },

    /// Extract sprites from a .nitro archive as PNG files
    Extract {
        archive: PathBuf,

        /// Only extract this sprite
        #[arg(short, long)]
        sprite: Option<String>,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Write every entry of a .nitro archive to disk
    Unpack {
        archive: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Paint a PNG over one sprite of the atlas
    ReplaceSprite {
        archive: PathBuf,

        /// Frame name of the sprite to replace
        #[arg(short, long)]
        sprite: String,

        /// Replacement PNG
        #[arg(short, long)]
        image: PathBuf,
    },

    /// Swap the whole atlas for another PNG of compatible size
    ReplaceAtlas {
        archive: PathBuf,

        /// Replacement atlas PNG
        #[arg(short, long)]
        image: PathBuf,
    },

    /// Rename the furniture inside an archive and write it as <to>.nitro
    Rename {
        archive: PathBuf,

        /// New furniture name
        #[arg(long)]
        to: String,

        /// Current furniture name (defaults to the archive file name)
        #[arg(long)]
        from: Option<String>,
    },

    /// Show or change the saved settings
    Settings {
        /// New default depth for logic dimensions
        #[arg(long)]
        set_default_z: Option<f64>,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Nitro(#[from] NitroError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("{failed} of {total} files failed to convert")]
    BatchFailed { failed: usize, total: usize },
    #[error("cannot locate a home directory for the settings file")]
    NoSettingsPath,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn settings_path() -> Result<PathBuf, CliError> {
    Settings::default_path().ok_or(CliError::NoSettingsPath)
}

fn create_dir(path: &Path) -> Result<(), CliError> {
    fs::create_dir_all(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn load_png(path: PathBuf) -> Result<image::RgbaImage, CliError> {
    match image::open(&path) {
        Ok(img) => Ok(img.to_rgba8()),
        Err(source) => Err(CliError::Image { path, source }),
    }
}

fn save_png(image: &image::RgbaImage, path: PathBuf) -> Result<(), CliError> {
    image
        .save_with_format(&path, image::ImageFormat::Png)
        .map_err(|source| CliError::Image { path, source })
}

/// Entry names come from the archive, so keep them inside the output directory.
fn safe_entry_path(out_dir: &Path, name: &str) -> Option<PathBuf> {
    let relative = Path::new(name);
    let clean = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    (clean && !name.is_empty()).then(|| out_dir.join(relative))
}

fn convert(inputs: Vec<PathBuf>, output: PathBuf, default_z: Option<f64>) -> Result<(), CliError> {
    let default_z = match default_z {
        Some(z) => z,
        None => Settings::default_path()
            .map(|path| Settings::load(&path).default_z)
            .unwrap_or(nitro::DEFAULT_DEPTH),
    };
    debug!(default_z, inputs = inputs.len(), "converting");

    let report = convert_batch(&inputs, &output, default_z);
    for item in &report.items {
        match &item.outcome {
            Ok(out) => {
                eprintln!("ok    {} -> {}", item.input.display(), out.archive.display());
                if let Some(icon) = &out.icon {
                    eprintln!("      icon {}", icon.display());
                }
            }
            Err(e) => eprintln!("FAIL  {}: {}", item.input.display(), e),
        }
    }
    eprintln!(
        "{} converted, {} failed",
        report.success_count(),
        report.error_count()
    );

    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::BatchFailed {
            failed: report.error_count(),
            total: report.items.len(),
        })
    }
}

fn inspect(path: PathBuf) -> Result<(), CliError> {
    let archive = Archive::read(&path)?;

    println!("{}: {} entries", path.display(), archive.len());
    println!("{:-<60}", "");
    for (name, data) in archive.entries() {
        println!("  {:<44} {:>10} bytes", name, data.len());
    }

    match archive.asset_model() {
        Ok(model) => {
            println!("{:-<60}", "");
            println!("  Name: {}", model.name);
            if !model.kind.is_empty() {
                println!("  Type: {}", model.kind);
            }
            if !model.visualization_type.is_empty() {
                println!("  Visualization: {}", model.visualization_type);
            }
            if !model.logic_type.is_empty() {
                println!("  Logic: {}", model.logic_type);
            }
            println!("  Assets: {}", model.assets.len());
            println!("  Visualizations: {}", model.visualizations.len());
            if let Some(sheet) = &model.spritesheet {
                println!(
                    "  Atlas: {} ({}x{}), {} frames",
                    sheet.meta.image,
                    sheet.meta.size.w,
                    sheet.meta.size.h,
                    sheet.frames.len()
                );
            }
        }
        Err(e) => debug!(error = %e, "no asset description"),
    }
    Ok(())
}

fn extract(path: PathBuf, sprite: Option<String>, output: PathBuf) -> Result<(), CliError> {
    let archive = Archive::read(&path)?;
    create_dir(&output)?;

    let sprites = match sprite {
        Some(name) => {
            let image = archive.extract_sprite(&name)?;
            vec![(name, image)]
        }
        None => archive.extract_all_sprites()?,
    };

    for (name, image) in &sprites {
        let Some(target) = safe_entry_path(&output, &format!("{name}.png")) else {
            warn!(sprite = %name, "skipping sprite with unsafe name");
            continue;
        };
        save_png(image, target)?;
    }
    eprintln!("extracted {} sprites to {}", sprites.len(), output.display());
    Ok(())
}

fn unpack(path: PathBuf, output: PathBuf) -> Result<(), CliError> {
    let archive = Archive::read(&path)?;
    create_dir(&output)?;

    for (name, data) in archive.entries() {
        let Some(target) = safe_entry_path(&output, name) else {
            warn!(entry = %name, "skipping entry with unsafe name");
            continue;
        };
        if let Some(parent) = target.parent() {
            create_dir(parent)?;
        }
        fs::write(&target, data).map_err(|source| CliError::Io {
            path: target.clone(),
            source,
        })?;
        println!("{}", target.display());
    }
    Ok(())
}

fn replace_sprite(path: PathBuf, sprite: String, image: PathBuf) -> Result<(), CliError> {
    let mut archive = Archive::read(&path)?;
    archive.replace_sprite(&sprite, &load_png(image)?)?;
    archive.write(&path)?;
    eprintln!("replaced {} in {}", sprite, path.display());
    Ok(())
}

fn replace_atlas(path: PathBuf, image: PathBuf) -> Result<(), CliError> {
    let mut archive = Archive::read(&path)?;
    let atlas = load_png(image)?;
    archive.replace_atlas(&atlas)?;
    archive.write(&path)?;
    eprintln!(
        "replaced atlas of {} ({}x{})",
        path.display(),
        atlas.width(),
        atlas.height()
    );
    Ok(())
}

fn rename(path: PathBuf, to: String, from: Option<String>) -> Result<(), CliError> {
    let from = from.unwrap_or_else(|| {
        path.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    let mut archive = Archive::read(&path)?;
    archive.rename(&from, &to);

    let target = path.with_file_name(format!("{to}.nitro"));
    archive.write(&target)?;
    if target != path {
        fs::remove_file(&path).map_err(|source| CliError::Io {
            path: path.clone(),
            source,
        })?;
    }
    eprintln!("{} -> {}", path.display(), target.display());
    Ok(())
}

fn settings(set_default_z: Option<f64>) -> Result<(), CliError> {
    let path = settings_path()?;
    let mut settings = Settings::load(&path);

    if let Some(z) = set_default_z {
        settings.default_z = z;
        settings.save(&path)?;
        eprintln!("saved {}", path.display());
    }

    println!("Settings file: {}", path.display());
    println!("  default_z: {}", settings.default_z);
    Ok(())
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Convert {
            inputs,
            output,
            default_z,
        } => convert(inputs, output, default_z),
        Commands::Inspect { archive } => inspect(archive),
        Commands::Extract {
            archive,
            sprite,
            output,
        } => extract(archive, sprite, output),
        Commands::Unpack { archive, output } => unpack(archive, output),
        Commands::ReplaceSprite {
            archive,
            sprite,
            image,
        } => replace_sprite(archive, sprite, image),
        Commands::ReplaceAtlas { archive, image } => replace_atlas(archive, image),
        Commands::Rename { archive, to, from } => rename(archive, to, from),
        Commands::Settings { set_default_z } => settings(set_default_z),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_convert() {
        let cli = Cli::try_parse_from([
            "nitro",
            "-vv",
            "convert",
            "a.swf",
            "b.swf",
            "-o",
            "out",
            "--default-z",
            "2.5",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Convert {
                inputs,
                output,
                default_z,
            } => {
                assert_eq!(inputs, vec![PathBuf::from("a.swf"), PathBuf::from("b.swf")]);
                assert_eq!(output, PathBuf::from("out"));
                assert_eq!(default_z, Some(2.5));
            }
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn test_parse_rename() {
        let cli =
            Cli::try_parse_from(["nitro", "rename", "chair.nitro", "--to", "throne"]).unwrap();
        match cli.command {
            Commands::Rename { archive, to, from } => {
                assert_eq!(archive, PathBuf::from("chair.nitro"));
                assert_eq!(to, "throne");
                assert_eq!(from, None);
            }
            _ => panic!("expected rename"),
        }
    }

    #[test]
    fn test_replace_sprite_needs_image() {
        assert!(Cli::try_parse_from(["nitro", "replace-sprite", "a.nitro", "-s", "a_64"]).is_err());
    }

    #[test]
    fn test_convert_needs_inputs() {
        assert!(Cli::try_parse_from(["nitro", "convert"]).is_err());
    }

    #[test]
    fn test_safe_entry_path() {
        let out = Path::new("out");
        assert_eq!(safe_entry_path(out, "chair.json"), Some(out.join("chair.json")));
        assert_eq!(safe_entry_path(out, "../evil.png"), None);
        assert_eq!(safe_entry_path(out, "/etc/passwd"), None);
        assert_eq!(safe_entry_path(out, ""), None);
    }
}
