use clap::Parser;
use opsboard::adapters::{parse_rows, FileRecordSource, HttpBackend, JsonLinesSink, LocalStorage, StaticMasterData};
use opsboard::config::cli::{ImportArgs, PivotArgs};
use opsboard::config::{Cli, Command, DashboardConfig, SourceKind};
use opsboard::core::report::{ReportFormat, ReportWriter};
use opsboard::domain::model::{CommitOutcome, Record};
use opsboard::domain::ports::{MasterDataSource, PersistSink, RecordSource};
use opsboard::utils::error::{ErrorSeverity, Result};
use opsboard::utils::{logger, validation::Validate};
use opsboard::DashboardService;
use std::path::PathBuf;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting opsboard CLI");
    if cli.verbose {
        tracing::debug!("CLI args: {:?}", cli);
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    match run(&cli, &config).await {
        Ok(0) => tracing::info!("✅ Completed successfully"),
        Ok(code) => std::process::exit(code),
        Err(e) => {
            tracing::error!(
                "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,      // 警告，但成功
                ErrorSeverity::Medium => 2,   // 上游錯誤，可重試
                ErrorSeverity::High => 1,     // 設定或資料錯誤
                ErrorSeverity::Critical => 3, // 系統錯誤
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }
}

fn load_config(cli: &Cli) -> Result<DashboardConfig> {
    let config = match &cli.config {
        Some(path) => {
            tracing::info!("📄 Loading configuration from {}", path.display());
            DashboardConfig::from_file(path)?
        }
        None => DashboardConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

async fn run(cli: &Cli, config: &DashboardConfig) -> Result<i32> {
    let monitor = cli.monitor || config.monitoring_enabled();

    match config.source.kind {
        SourceKind::Http => {
            let backend = HttpBackend::new(config.endpoint()?, config.timeout())?;
            let service = DashboardService::new(backend.clone(), backend.clone())
                .with_import_settings(config.import.preview_limit, config.import.header_rows)
                .with_monitoring(monitor);
            execute(&cli.command, config, &service, &backend).await
        }
        SourceKind::File => {
            let mut source = FileRecordSource::new(LocalStorage::new(&config.source.base_path));
            for (entity, file) in config.entity_files()? {
                source = source.with_file(entity, file);
            }
            let service = DashboardService::new(source, StaticMasterData::new(config.allowed_sets()))
                .with_import_settings(config.import.preview_limit, config.import.header_rows)
                .with_monitoring(monitor);

            let sink_dir = match &cli.command {
                Command::Commit(args) => args.sink.clone(),
                _ => None,
            }
            .unwrap_or_else(|| PathBuf::from(&config.import.sink_path));
            execute(&cli.command, config, &service, &JsonLinesSink::new(sink_dir)).await
        }
    }
}

async fn read_input(args: &ImportArgs) -> Result<Vec<Record>> {
    let data = tokio::fs::read(&args.input).await?;
    let rows = parse_rows(&args.input.to_string_lossy(), &data)?;
    tracing::info!("📥 Read {} rows from {}", rows.len(), args.input.display());
    Ok(rows)
}

async fn execute<Src, M, S>(
    command: &Command,
    config: &DashboardConfig,
    service: &DashboardService<Src, M>,
    sink: &S,
) -> Result<i32>
where
    Src: RecordSource,
    M: MasterDataSource,
    S: PersistSink,
{
    match command {
        Command::Preview(args) => {
            let rows = read_input(args).await?;
            let summary = service.preview_import(args.entity, &rows).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(0)
        }
        Command::Commit(args) => {
            let rows = read_input(&args.import).await?;
            let outcome = service.commit_import(args.import.entity, &rows, sink).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            match outcome {
                CommitOutcome::Rejected(_) => Ok(1),
                CommitOutcome::Committed(report) => {
                    if report.fail_count > 0 {
                        tracing::warn!("⚠️ {} rows failed to persist", report.fail_count);
                    }
                    Ok(0)
                }
            }
        }
        Command::Pivot(args) => pivot(args, config, service).await,
    }
}

async fn pivot<Src, M>(args: &PivotArgs, config: &DashboardConfig, service: &DashboardService<Src, M>) -> Result<i32>
where
    Src: RecordSource,
    M: MasterDataSource,
{
    let filter = args.filter_spec()?;
    let report = service
        .pivot_report(args.entity, &filter, &args.rows, &args.cols, args.order.into())
        .await?;

    if report.pivot.is_empty() {
        tracing::warn!("No records matched the filter");
    }

    let mut writer = ReportWriter::new(LocalStorage::new(&config.output.path), config.output_formats()?);
    if let Some(bundle) = &config.output.bundle {
        writer = writer.with_bundle(bundle.clone());
    }
    let written = writer.write(&args.output_name, &report).await?;

    println!("{}", report.render(ReportFormat::Csv)?);
    for file in written {
        let path = PathBuf::from(&config.output.path).join(file);
        tracing::info!("📁 Output saved to: {}", path.display());
    }
    Ok(0)
}
