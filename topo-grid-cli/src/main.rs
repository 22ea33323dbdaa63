use anyhow::{Context, Result};
use clap::Parser;
use rayon::ThreadPoolBuilder;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::PathBuf;
use tracing::{error, info};

use topo_grid::processor::{MAX_DEPTH, MIN_DEPTH};
use topo_grid::{
    read_grid_csv, CsvOutputFile, ErrorPolicy, FeatureSource, GridIdentifierProcessor,
    LayerExtent, LogFeedback, ProcessorConfig,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 入力グリッドCSV（id, left, right, top, bottom カラム必須）
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// 出力CSVファイル
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// 階層の深さ
    #[arg(short, long, default_value_t = MIN_DEPTH,
          value_parser = clap::value_parser!(u32).range(MIN_DEPTH as i64..=MAX_DEPTH as i64))]
    depth: u32,

    /// 行IDを大文字に変換しない
    #[arg(long)]
    keep_case: bool,

    /// IDを計算できないフィーチャーをスキップ
    #[arg(long)]
    skip_invalid: bool,

    /// 識別子を並列で計算
    #[arg(long)]
    parallel: bool,

    /// 並列処理スレッド数（デフォルト: CPUコア数）
    #[arg(short, long)]
    threads: Option<usize>,

    /// レイヤーの幅（手動設定）
    #[arg(long, requires = "layer_height")]
    layer_width: Option<f64>,

    /// レイヤーの高さ（手動設定）
    #[arg(long, requires = "layer_width")]
    layer_height: Option<f64>,
}

fn main() -> Result<()> {
    // ログの初期化
    tracing_subscriber::fmt::init();

    // CLI引数の解析
    let args = Args::parse();

    // 処理開始時間を記録
    let start_time = std::time::Instant::now();

    // スレッドプールの設定
    if let Some(threads) = args.threads {
        ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to build thread pool")?;
    }

    if let Err(e) = run(&args) {
        error!("Failed to process {:?}: {:#}", args.input, e);
        return Err(e);
    }

    // 処理時間を表示
    let elapsed = start_time.elapsed();
    info!("Total processing time: {:?}", elapsed);

    Ok(())
}

fn run(args: &Args) -> Result<()> {
    info!("Processing grid layer: {:?}", args.input);

    let file = File::open(&args.input).with_context(|| format!("Failed to open {:?}", args.input))?;
    let mut source = read_grid_csv(BufReader::new(file))?;

    if let (Some(width), Some(height)) = (args.layer_width, args.layer_height) {
        source = source.with_layer_extent(LayerExtent { width, height });
    }

    // 出力ディレクトリの作成
    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    // 処理が成功した場合のみ出力ファイルを確定する
    let mut output = CsvOutputFile::create(&args.output, source.fields())?;

    let config = ProcessorConfig {
        depth: args.depth,
        uppercase_rows: !args.keep_case,
        error_policy: if args.skip_invalid {
            ErrorPolicy::Skip
        } else {
            ErrorPolicy::Abort
        },
        parallel: args.parallel,
    };

    let processor = GridIdentifierProcessor::new(config);
    let summary = processor.process(&source, &mut output, &mut LogFeedback::new())?;
    output.persist()?;

    info!(
        "Written {:?}: {} features ({} skipped)",
        args.output, summary.written, summary.skipped
    );

    Ok(())
}
