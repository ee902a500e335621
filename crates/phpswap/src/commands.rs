use log::{debug, info};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use phpswap_backend::{Formula, HistoryItem, PhpInstallation, PhpVersion};
use phpswap_brew::{BrewClient, ShellInvoker, ValetClient, detect_brew, detect_valet};
use phpswap_core::{
    ExtensionKind, PhpExtension, PhpManager, RepairReport, Step, SwitchReport, SwitchStrategy,
};
use phpswap_platform::{AppPaths, BrewPaths};

use crate::cli::{Cli, Commands, ExtCommand, OpenArgs, OpenTarget, ServiceCommand, SwitchArgs};
use crate::error::AppError;
use crate::settings::AppSettings;
use crate::switch_lock::SwitchLock;

const EMPTY_DETECTION: &str = "no PHP installations detected";

pub async fn execute(cli: Cli, settings: AppSettings, paths: AppPaths) -> Result<(), AppError> {
    if let Commands::Settings = cli.command {
        return show_settings(&settings, &paths);
    }

    let invoker = Arc::new(
        ShellInvoker::new()
            .with_timeout(Duration::from_secs(settings.command_timeout_secs))
            .with_history_limit(settings.history_limit),
    );
    let echo = cli.show_commands.then(|| spawn_echo(&invoker));

    let result = run(cli.command, &settings, &paths, Arc::clone(&invoker)).await;

    // The echo thread ends once the last sender, owned by the invoker, is gone.
    drop(invoker);
    if let Some(handle) = echo {
        let _ = handle.join();
    }
    result
}

fn spawn_echo(invoker: &ShellInvoker) -> JoinHandle<()> {
    let receiver = invoker.subscribe();
    std::thread::spawn(move || {
        for item in receiver {
            eprintln!("{}", render_history_item(&item));
        }
    })
}

async fn run(
    command: Commands,
    settings: &AppSettings,
    paths: &AppPaths,
    invoker: Arc<ShellInvoker>,
) -> Result<(), AppError> {
    let manager = connect(settings, invoker).await?;

    match command {
        Commands::List => list(&manager).await,
        Commands::Current => current(&manager).await,
        Commands::Info { php } => show_info(&manager, &php).await,
        Commands::Switch(args) => switch(&manager, settings, paths, args).await,
        Commands::Repair => repair(&manager, paths).await,
        Commands::Services { action } => services(&manager, action).await,
        Commands::Ext { action } => extensions(&manager, settings, action).await,
        Commands::Open(args) => open_target(&manager, args).await,
        Commands::Settings => show_settings(settings, paths),
    }
}

async fn connect(
    settings: &AppSettings,
    invoker: Arc<ShellInvoker>,
) -> Result<PhpManager, AppError> {
    let brew_paths = BrewPaths::detect(settings.homebrew_prefix.as_deref());
    let detection = detect_brew(invoker.as_ref(), &brew_paths).await;
    let Some(brew_binary) = detection.path else {
        return Err(AppError::BrewNotFound(brew_paths.brew_binary()));
    };
    debug!(
        "Using {} (version {}, from PATH: {})",
        brew_binary.display(),
        detection.version.as_deref().unwrap_or("unknown"),
        detection.in_path
    );

    let valet = detect_valet().map(|path| ValetClient::new(invoker.clone(), path));
    let brew = BrewClient::new(invoker, brew_paths).with_brew_binary(brew_binary);

    let mut manager = PhpManager::new(brew, settings.supported())
        .with_binary_check(settings.check_binaries)
        .with_valet(valet);
    manager.resolve_alias().await;
    Ok(manager)
}

async fn list(manager: &PhpManager) -> Result<(), AppError> {
    let snapshot = manager.refresh().await;
    if snapshot.is_empty() {
        println!("{EMPTY_DETECTION}");
        return Ok(());
    }

    let active = manager
        .current_version()
        .await
        .ok()
        .and_then(|long| long.short());
    for installation in snapshot.installations() {
        println!("{}", render_installation(installation, active.as_ref()));
    }
    Ok(())
}

async fn current(manager: &PhpManager) -> Result<(), AppError> {
    let long = manager
        .current_version()
        .await
        .map_err(|_| AppError::NoActiveVersion)?;
    match long.short() {
        Some(short) => println!(
            "PHP {long} ({})",
            Formula::for_version(&short, manager.alias())
        ),
        None => println!("PHP {long}"),
    }
    Ok(())
}

async fn show_info(manager: &PhpManager, version: &PhpVersion) -> Result<(), AppError> {
    let snapshot = manager.refresh().await;
    let Some(installation) = snapshot.get(version) else {
        return Err(phpswap_core::CoreError::NotInstalled {
            version: version.to_string(),
        }
        .into());
    };

    let has_binary = manager
        .describe()
        .into_iter()
        .find(|described| &described.version == version)
        .is_some_and(|described| described.has_binary);
    let long = installation
        .long_version
        .as_ref()
        .map_or_else(|| "unknown".to_string(), ToString::to_string);

    println!("PHP {version}");
    println!("  formula:  {}", installation.formula);
    println!("  release:  {long}");
    println!("  binary:   {}", if has_binary { "present" } else { "missing" });
    println!("  php.ini:  {}", manager.ini_path(version).display());
    if manager.alias() == Some(version) {
        println!("  provides the default `php` formula");
    }
    Ok(())
}

async fn switch(
    manager: &PhpManager,
    settings: &AppSettings,
    paths: &AppPaths,
    args: SwitchArgs,
) -> Result<(), AppError> {
    let _lock = SwitchLock::acquire(&paths.switch_lock_file())?;

    let strategy = if args.valet {
        SwitchStrategy::Valet
    } else if args.internal {
        SwitchStrategy::Internal
    } else {
        settings.switcher
    };

    println!("Switching to PHP {}...", args.php);
    let report = manager.switch_to(args.php, strategy).await?;
    print_switch_report(&report);

    match manager.current_version().await {
        Ok(long) => println!("Now using PHP {long}"),
        Err(e) => {
            info!("Could not read the linked version after switching: {e}");
            println!("No PHP version is linked after the switch");
        }
    }
    Ok(())
}

async fn repair(manager: &PhpManager, paths: &AppPaths) -> Result<(), AppError> {
    let _lock = SwitchLock::acquire(&paths.switch_lock_file())?;

    println!("Repairing PHP setup...");
    let report = manager.repair().await?;
    print_repair_report(&report);
    Ok(())
}

async fn services(manager: &PhpManager, action: ServiceCommand) -> Result<(), AppError> {
    let services = manager.services();
    let steps = match action {
        ServiceCommand::RestartPhp => {
            let formula = manager
                .active_formula()
                .await
                .map_err(|_| AppError::NoActiveVersion)?;
            vec![services.restart_php_fpm(&formula).await]
        }
        ServiceCommand::RestartNginx => vec![services.restart_nginx().await],
        ServiceCommand::RestartDnsmasq => vec![services.restart_dnsmasq().await],
        ServiceCommand::StopAll => {
            let formula = manager
                .active_formula()
                .await
                .unwrap_or_else(|_| Formula::default_php());
            services.stop_all(&formula).await
        }
    };

    for step in &steps {
        println!("{}", render_step(step));
    }
    Ok(())
}

async fn target_version(
    manager: &PhpManager,
    requested: Option<PhpVersion>,
) -> Result<PhpVersion, AppError> {
    if let Some(version) = requested {
        return Ok(version);
    }
    manager
        .current_version()
        .await
        .ok()
        .and_then(|long| long.short())
        .ok_or(AppError::NoActiveVersion)
}

async fn extensions(
    manager: &PhpManager,
    settings: &AppSettings,
    action: ExtCommand,
) -> Result<(), AppError> {
    let (php, change) = match action {
        ExtCommand::List { php } => (php, None),
        ExtCommand::Enable { name, php } => (php, Some((name, true))),
        ExtCommand::Disable { name, php } => (php, Some((name, false))),
    };
    let version = target_version(manager, php).await?;

    let Some((name, enabled)) = change else {
        for extension in manager.extensions(&version)? {
            println!("{}", render_extension(&extension));
        }
        return Ok(());
    };

    if !manager.set_extension(&version, &name, enabled).await? {
        println!(
            "{name} is already {}",
            if enabled { "enabled" } else { "disabled" }
        );
        return Ok(());
    }
    println!(
        "{} {name} for PHP {version}",
        if enabled { "Enabled" } else { "Disabled" }
    );

    if settings.auto_restart_after_extension_toggle {
        let formula = Formula::for_version(&version, manager.alias());
        let step = manager.services().restart_php_fpm(&formula).await;
        println!("{}", render_step(&step));
    }
    Ok(())
}

async fn open_target(manager: &PhpManager, args: OpenArgs) -> Result<(), AppError> {
    let path = match args.target {
        OpenTarget::Config => manager.brew().paths().php_config_dir(),
        OpenTarget::Ini => manager.ini_path(&target_version(manager, args.php).await?),
        OpenTarget::Composer => home_dir()?.join(".composer").join("composer.json"),
        OpenTarget::Valet => valet_config_dir(home_dir()?),
    };

    info!("Opening {}", path.display());
    open::that(&path).map_err(|source| AppError::Open { path, source })
}

fn home_dir() -> Result<PathBuf, AppError> {
    dirs::home_dir().ok_or(AppError::Paths(
        phpswap_platform::AppPathsError::HomeDirUnavailable,
    ))
}

/// Valet moved its config from `~/.valet` to `~/.config/valet`.
fn valet_config_dir(home: PathBuf) -> PathBuf {
    let current = home.join(".config").join("valet");
    if current.exists() {
        return current;
    }
    let legacy = home.join(".valet");
    if legacy.exists() { legacy } else { current }
}

/// Writes the defaults first if there is no settings file yet, so there is
/// something to edit.
fn show_settings(settings: &AppSettings, paths: &AppPaths) -> Result<(), AppError> {
    if !paths.settings_file().exists() {
        settings
            .save(paths)
            .map_err(|e| AppError::io("Saving settings", e))?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| AppError::io("Rendering settings", e.into()))?;
    println!("# {}", paths.settings_file().display());
    println!("{json}");
    Ok(())
}

fn print_switch_report(report: &SwitchReport) {
    let failures: Vec<&Step> = report.failures().collect();
    if failures.is_empty() {
        println!("PHP {} has been linked", report.target);
        return;
    }
    println!("Switch to PHP {} finished with {} failed commands:", report.target, failures.len());
    for step in failures {
        println!("  {}", render_step(step));
    }
}

fn print_repair_report(report: &RepairReport) {
    let failures: Vec<&Step> = report.failures().collect();
    println!(
        "Ran {} commands, {} failed",
        report.steps.len(),
        failures.len()
    );
    for step in failures {
        println!("  {}", render_step(step));
    }
}

fn render_step(step: &Step) -> String {
    let detail = step.output.stderr.trim();
    if step.output.is_success() || detail.is_empty() {
        step.to_string()
    } else {
        format!("{step}: {}", detail.lines().next_back().unwrap_or(detail))
    }
}

fn render_installation(installation: &PhpInstallation, active: Option<&PhpVersion>) -> String {
    let marker = if active == Some(&installation.version) { "*" } else { " " };
    let long = installation
        .long_version
        .as_ref()
        .map_or("?", |long| long.raw.as_str());
    format!(
        "{marker} {:<5} {:<10} {long}",
        installation.version.as_str(),
        installation.formula.as_str()
    )
}

fn render_extension(extension: &PhpExtension) -> String {
    let mark = if extension.enabled { "x" } else { " " };
    match extension.kind {
        ExtensionKind::Zend => format!("[{mark}] {} (zend)", extension.name),
        ExtensionKind::Regular => format!("[{mark}] {}", extension.name),
    }
}

fn render_history_item(item: &HistoryItem) -> String {
    format!(
        "[{}] $ {} ({})",
        item.date.format("%H:%M:%S"),
        item.command,
        item.output.status_label()
    )
}
