mod cli;
mod error_fmt;
mod watchdog;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use battmon_config::{Config, NotifierKind};
use battmon_core::runner::{MonitorOpts, run_monitor, sample_once};
use battmon_core::{
    CsvTelemetry, Estimator, EstimatorCfg, NullTelemetry, ProfileStore, ShutdownCfg,
    ShutdownPolicy, VoltageCurve,
};
use battmon_hardware::{LogNotifier, NotifySend};
use battmon_traits::{Notifier, PowerSensor, SystemClock};
use clap::Parser;
use eyre::WrapErr;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = run(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn run(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    init_tracing(cli.json, cli.log_level.as_deref(), &cfg);

    let data_dir = resolve_data_dir(cli.data_dir.as_deref(), &cfg)?;
    tracing::debug!(data_dir = %data_dir.display(), "using data directory");

    match cli.cmd {
        Commands::Status => cmd_status(&cfg, &data_dir, cli.sim, cli.json),
        Commands::Monitor {
            status_file,
            samples,
            period_ms,
        } => {
            let opts = MonitorOpts {
                period: Duration::from_millis(period_ms.unwrap_or(cfg.sensor.sample_period_ms)),
                status_path: status_file,
                max_samples: samples,
            };
            cmd_monitor(&cfg, &data_dir, cli.sim, cli.json, &opts)
        }
        Commands::Watchdog {
            interval_s,
            dry_run,
            max_checks,
            pid_file,
        } => {
            let opts = watchdog::WatchdogOpts {
                interval: Duration::from_secs(interval_s.unwrap_or(cfg.shutdown.check_interval_s)),
                dry_run,
                max_checks,
                pid_file: pid_file.unwrap_or_else(|| cfg.shutdown.pid_file.clone()),
            };
            cmd_watchdog(&cfg, &data_dir, cli.sim, &opts)
        }
        Commands::Stats => cmd_stats(&cfg, &data_dir, cli.json),
        Commands::SelfCheck => cmd_self_check(&cfg, cli.sim),
    }
}

fn load_config(path: Option<&Path>) -> eyre::Result<Config> {
    let path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => dirs::config_dir()
            .map(|d| d.join("battmon").join("config.toml"))
            .filter(|p| p.exists()),
    };
    let cfg = match path {
        Some(p) => {
            let text = std::fs::read_to_string(&p)
                .wrap_err_with(|| format!("read config {}", p.display()))?;
            battmon_config::load_toml(&text)?
        }
        None => Config::default(),
    };
    cfg.validate()?;
    Ok(cfg)
}

fn init_tracing(json: bool, cli_level: Option<&str>, cfg: &Config) {
    let level = cli_level
        .or(cfg.logging.level.as_deref())
        .unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stderr_layer = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
            .boxed()
    };

    let file_layer = cfg.logging.file.as_ref().map(|file| {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "battmon.log".to_string());
        let appender = match cfg.logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        fmt::layer().json().with_writer(writer).boxed()
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();
}

fn resolve_data_dir(cli_dir: Option<&Path>, cfg: &Config) -> eyre::Result<PathBuf> {
    let dir = cli_dir
        .map(Path::to_path_buf)
        .or_else(|| cfg.persistence.data_dir.clone())
        .or_else(|| dirs::data_dir().map(|d| d.join("battmon")))
        .ok_or_else(|| eyre::eyre!("no data directory: pass --data-dir"))?;
    std::fs::create_dir_all(&dir).wrap_err_with(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

fn load_curve(cfg: &Config) -> eyre::Result<VoltageCurve> {
    match &cfg.pack.curve_csv {
        Some(path) => {
            let rows = battmon_config::load_curve_csv(path)?;
            Ok(VoltageCurve::try_from(rows.as_slice())?)
        }
        None => Ok(VoltageCurve::default()),
    }
}

fn make_notifier(kind: NotifierKind) -> Box<dyn Notifier + Send> {
    match kind {
        NotifierKind::Desktop => Box::new(NotifySend::new()),
        NotifierKind::Log => Box::new(LogNotifier),
    }
}

fn make_sensor(cfg: &Config, sim: bool) -> eyre::Result<Box<dyn PowerSensor + Send>> {
    #[cfg(all(feature = "hardware", target_os = "linux"))]
    {
        if !sim {
            let s = battmon_hardware::HardwareSensor::new(
                cfg.sensor.i2c_bus,
                cfg.sensor.address,
                cfg.sensor.shunt_ohms,
            )
            .wrap_err("open INA219")?;
            return Ok(Box::new(s));
        }
    }
    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    {
        let _ = (cfg, sim);
    }
    Ok(Box::new(battmon_hardware::SimulatedSensor::from_env()))
}

/// Wire the estimator to the data directory: learned profile, daily CSV
/// telemetry (when enabled), and the configured notifier.
fn build_estimator(cfg: &Config, data_dir: &Path) -> eyre::Result<Estimator> {
    let mut builder = Estimator::builder()
        .with_config(EstimatorCfg::from(cfg))
        .with_curve(load_curve(cfg)?)
        .with_clock(SystemClock::new())
        .with_store(ProfileStore::in_dir(data_dir))
        .with_notifier(make_notifier(cfg.warnings.notifier));

    builder = if cfg.persistence.telemetry {
        match CsvTelemetry::open_today(&data_dir.join("logs")) {
            Ok(t) => builder.with_telemetry(t),
            Err(e) => {
                tracing::warn!(error = %e, "telemetry disabled");
                builder.with_telemetry(NullTelemetry)
            }
        }
    } else {
        builder.with_telemetry(NullTelemetry)
    };

    builder.build()
}

fn cmd_status(cfg: &Config, data_dir: &Path, sim: bool, json: bool) -> eyre::Result<()> {
    let est = build_estimator(cfg, data_dir)?;
    let mut sensor = make_sensor(cfg, sim)?;
    let result = sample_once(&mut sensor, &est);
    est.close();
    if let Err(e) = result {
        if !json {
            println!("> ERR");
        }
        return Err(e.into());
    }

    let snap = est.snapshot();
    if json {
        println!("{}", serde_json::to_string(&snap)?);
    } else {
        for line in snap.conky_lines() {
            println!("{line}");
        }
    }
    Ok(())
}

fn install_stop_handler() -> eyre::Result<Arc<AtomicBool>> {
    let stop = Arc::new(AtomicBool::new(false));
    let s = stop.clone();
    ctrlc::set_handler(move || s.store(true, Ordering::SeqCst))
        .wrap_err("install signal handler")?;
    Ok(stop)
}

fn cmd_monitor(
    cfg: &Config,
    data_dir: &Path,
    sim: bool,
    json: bool,
    opts: &MonitorOpts,
) -> eyre::Result<()> {
    let est = build_estimator(cfg, data_dir)?;
    let sensor = make_sensor(cfg, sim)?;
    let stop = install_stop_handler()?;

    let summary = run_monitor(sensor, SystemClock::new(), &est, opts, &stop, |snap| {
        if json {
            if let Ok(line) = serde_json::to_string(snap) {
                println!("{line}");
            }
        } else {
            println!("{}", snap.conky_lines().join("  "));
        }
    });

    if json {
        println!(
            "{}",
            serde_json::json!({
                "samples": summary.samples,
                "dropped": summary.dropped,
                "read_errors": summary.read_errors,
            })
        );
    }
    Ok(())
}

fn cmd_watchdog(
    cfg: &Config,
    data_dir: &Path,
    sim: bool,
    opts: &watchdog::WatchdogOpts,
) -> eyre::Result<()> {
    let _pid = watchdog::PidGuard::acquire(&opts.pid_file)?;
    let stop = install_stop_handler()?;
    let est = build_estimator(cfg, data_dir)?;
    let mut sensor = make_sensor(cfg, sim)?;
    let notifier = make_notifier(cfg.warnings.notifier);
    let policy = ShutdownPolicy::new(ShutdownCfg::from(&cfg.shutdown));

    let checks = watchdog::run(&est, sensor.as_mut(), notifier.as_ref(), policy, opts, &stop)?;
    tracing::info!(checks, "battery watchdog stopped");
    Ok(())
}

fn cmd_stats(cfg: &Config, data_dir: &Path, json: bool) -> eyre::Result<()> {
    let store = ProfileStore::in_dir(data_dir);
    let profile = store.load(cfg.pack.nominal_capacity_mah);
    if json {
        println!(
            "{}",
            serde_json::json!({
                "effective_capacity_mah": profile.effective_capacity_mah,
                "nominal_capacity_mah": cfg.pack.nominal_capacity_mah,
                "cycle_count": profile.cycle_count,
                "total_discharge_mah": profile.total_discharge_mah,
                "avg_power_mw": profile.avg_power_mw,
                "capacity_samples": profile.capacity_samples,
                "last_soc": profile.last_soc,
            })
        );
        return Ok(());
    }

    let health = profile.effective_capacity_mah / cfg.pack.nominal_capacity_mah * 100.0;
    println!(
        "Capacity: {:.0} mAh learned / {:.0} mAh nominal ({health:.0}%)",
        profile.effective_capacity_mah, cfg.pack.nominal_capacity_mah
    );
    println!("Cycles: {}", profile.cycle_count);
    println!("Total discharge: {:.0} mAh", profile.total_discharge_mah);
    println!("Average power: {:.2} W", profile.avg_power_mw / 1000.0);
    println!("Capacity samples: {}", profile.capacity_samples.len());
    if let Some(soc) = profile.last_soc {
        println!("Last SOC: {soc:.1}%");
    }
    Ok(())
}

fn cmd_self_check(cfg: &Config, sim: bool) -> eyre::Result<()> {
    let mut sensor = make_sensor(cfg, sim)?;
    let r = sensor
        .read()
        .map_err(|e| battmon_core::hw_error::map_sensor_error(e.as_ref()))?;
    if !r.is_finite() {
        eyre::bail!("sensor returned a non-finite reading");
    }
    println!(
        "OK ({:.2} V, {:.0} mA, {:.0} mW)",
        r.voltage, r.current_ma, r.power_mw
    );
    Ok(())
}
