//! 批量提取 LUNA16 候选立方体, 并保存为 npz 归档.

mod profile;
mod result;
mod runner;

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use luna_cube::{BoundaryMode, CubeShape};

#[derive(Parser, Debug)]
#[command(about = "Extract LUNA16 candidate cubes into an npz archive")]
struct Args {
    /// 数据集根目录, 下有 `subset{N}` 分片目录. 默认为 `$LUNA16_DIR` 或 `$HOME/dataset/luna16`.
    #[arg(long, short = 'D')]
    root: Option<PathBuf>,

    /// 候选表路径. 默认为 `$LUNA16_CANDIDATES` 或根目录下的 `candidates.csv`.
    #[arg(long, short = 'c')]
    candidates: Option<PathBuf>,

    /// 参与索引的分片, 如 `0,1` 或 `0-9`.
    #[arg(long, short = 's', default_value = "0", value_parser = utils::parse_subsets)]
    subsets: ::std::vec::Vec<u32>,

    /// 输出 npz 文件路径.
    #[arg(long, short = 'o', default_value = "cubes.npz")]
    out: PathBuf,

    /// 立方体深度.
    #[arg(long, default_value_t = luna_cube::consts::CUBE_DEPTH)]
    depth: usize,

    /// 立方体高度和宽度.
    #[arg(long, default_value_t = luna_cube::consts::CUBE_WIDTH)]
    width: usize,

    /// 越界时以该 HU 值填充, 而不是截断立方体.
    #[arg(long, allow_negative_numbers = true)]
    pad: Option<i16>,

    /// 线程数. 默认为可并行核心数.
    #[arg(long, short = 'j')]
    threads: Option<usize>,
}

fn main() -> Result<(), Box<dyn Error + Sync + Send>> {
    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|l| l.parse().ok())
        .unwrap_or(log::LevelFilter::Info);
    simple_logger::SimpleLogger::new().with_level(level).init()?;

    let args = Args::parse();

    let config = utils::loader::resolve_config(args.root, args.candidates)
        .ok_or("cannot determine dataset location, pass --root or set $LUNA16_DIR")?;
    let boundary = args.pad.map_or(BoundaryMode::Truncate, BoundaryMode::Pad);
    let config = config
        .with_subsets(args.subsets)
        .with_cube(CubeShape::new(args.depth, args.width, args.width))
        .with_window(utils::nodule_window())
        .with_boundary(boundary);
    log::info!("{config:?}");

    let dataset = utils::loader::dataset(&config)?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads.unwrap_or_else(utils::cpus))
        .build()?;

    let result = runner::run(&dataset, &args.out, &pool)?;
    result.analyze()?;
    Ok(())
}
