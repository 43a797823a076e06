//! # 取证信号分析 — 命令行入口
//!
//! 本文件仅负责参数解析、读写文件与输出格式。
//! 分析逻辑全部位于库中，详见 `lib.rs` 架构文档。

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Serialize;

use forensic_lens::{ForensicError, ForensicsConfig, ForensicsEngine};

#[derive(Parser)]
#[command(name = "forensic-lens")]
#[command(about = "Forensic signal analysis for binary files and raster images", long_about = None)]
struct Cli {
    /// JSON config file (missing file falls back to defaults)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Magic-byte type, sniffed MIME and extension mismatch
    Signature {
        file: PathBuf,
        /// Content type claimed by the uploader
        #[arg(long)]
        declared_type: Option<String>,
    },
    /// Size, MIME and either a text sample or an entropy score
    Structure { file: PathBuf },
    /// Digests for every supported algorithm
    Hashes { file: PathBuf },
    /// Compare a file against a known digest
    Verify {
        file: PathBuf,
        hash: String,
        #[arg(short, long, default_value = "SHA-256")]
        algorithm: String,
    },
    /// Printable ASCII runs
    Strings {
        file: PathBuf,
        /// Minimum run length (0 = configured default)
        #[arg(short = 'n', long, default_value_t = 0)]
        min_length: usize,
    },
    /// Hex byte pattern or case-insensitive regex search
    Search {
        file: PathBuf,
        pattern: String,
        /// Treat the pattern as hex bytes
        #[arg(long)]
        hex: bool,
    },
    /// High-pass noise residual image (PNG)
    Noise {
        file: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Color filter: invert, equalize, red, green, blue (PNG)
    Filter {
        file: PathBuf,
        filter: String,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Repeated 8x8 block patterns
    Patterns { file: PathBuf },
    /// Error level analysis of a JPEG
    Ela {
        file: PathBuf,
        /// Re-encode quality in (0, 1]
        #[arg(short, long)]
        quality: Option<f32>,
        /// Also write the difference image as PNG
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Estimate prior JPEG compression cycles
    Compression { file: PathBuf },
    /// EXIF tags, GPS position and capture time
    Metadata { file: PathBuf },
    /// JPEG frame header (SOF) and file hash
    JpegStructure { file: PathBuf },
    /// Embedded EXIF thumbnail check plus a regenerated thumbnail
    Thumbnail {
        file: PathBuf,
        /// Also write the regenerated thumbnail as JPEG
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), Box<dyn std::error::Error>> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<(), ForensicError> {
    fs::write(path, bytes)?;
    log::info!("💾 已写入 {}（{} 字节）", path.display(), bytes.len());
    Ok(())
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => ForensicsConfig::load_from_path(path)?,
        None => ForensicsConfig::default(),
    };
    let engine = ForensicsEngine::new(config)?;
    let pretty = cli.pretty;

    match cli.command {
        Command::Signature {
            file,
            declared_type,
        } => {
            let bytes = fs::read(&file)?;
            let report =
                engine.analyze_file_signature(&bytes, &file_name(&file), declared_type.as_deref())?;
            print_json(&report, pretty)
        }
        Command::Structure { file } => {
            let bytes = fs::read(&file)?;
            print_json(&engine.analyze_file_structure(&bytes, &file_name(&file))?, pretty)
        }
        Command::Hashes { file } => {
            let bytes = fs::read(&file)?;
            print_json(&engine.calculate_hashes(&bytes)?, pretty)
        }
        Command::Verify {
            file,
            hash,
            algorithm,
        } => {
            let bytes = fs::read(&file)?;
            print_json(&engine.verify_hash(&bytes, &hash, &algorithm)?, pretty)
        }
        Command::Strings { file, min_length } => {
            let bytes = fs::read(&file)?;
            print_json(&engine.extract_strings(&bytes, min_length)?, pretty)
        }
        Command::Search { file, pattern, hex } => {
            let bytes = fs::read(&file)?;
            print_json(&engine.search_patterns(&bytes, &pattern, hex)?, pretty)
        }
        Command::Noise { file, output } => {
            let bytes = fs::read(&file)?;
            write_output(&output, &engine.apply_noise_filter(&bytes)?)?;
            Ok(())
        }
        Command::Filter {
            file,
            filter,
            output,
        } => {
            let bytes = fs::read(&file)?;
            write_output(&output, &engine.apply_color_filter(&bytes, &filter)?)?;
            Ok(())
        }
        Command::Patterns { file } => {
            let bytes = fs::read(&file)?;
            print_json(&engine.detect_patterns(&bytes)?, pretty)
        }
        Command::Ela {
            file,
            quality,
            output,
        } => {
            let bytes = fs::read(&file)?;
            let result = engine.perform_ela(&bytes, quality)?;
            if let Some(output) = output {
                write_output(&output, &result.difference_image)?;
            }
            print_json(&result, pretty)
        }
        Command::Compression { file } => {
            let bytes = fs::read(&file)?;
            print_json(&engine.analyze_compression_history(&bytes)?, pretty)
        }
        Command::Metadata { file } => {
            let bytes = fs::read(&file)?;
            print_json(&engine.extract_metadata(&bytes, &file_name(&file))?, pretty)
        }
        Command::JpegStructure { file } => {
            let bytes = fs::read(&file)?;
            print_json(&engine.analyze_jpeg_structure(&bytes)?, pretty)
        }
        Command::Thumbnail { file, output } => {
            let bytes = fs::read(&file)?;
            let report = engine.analyze_thumbnail(&bytes)?;
            if let (Some(output), Some(thumbnail)) = (output, &report.generated_thumbnail) {
                write_output(&output, &thumbnail.data)?;
            }
            print_json(&report, pretty)
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run(Cli::parse()) {
        log::error!("❌ 分析失败: {err}");
        eprintln!("{err}");
        std::process::exit(1);
    }
}
