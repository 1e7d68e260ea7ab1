//! Command-line surface of the `bacstop` binary.

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{WrapErr, bail};
use tracing::warn;

use crate::config::Config;
use crate::device::{BleTransport, BreathTester};
use crate::protocol::{SERVICE_UUID, STATUS_CHARACTERISTIC};
use crate::ui::StatusPrinter;

/// Script installed into `.git/hooks`; identified by [`HOOK_MARKER`] so only
/// hooks we wrote are ever overwritten or removed.
const HOOK_SCRIPT: &str = include_str!("../hooks/bacstop-hook");
const HOOK_MARKER: &str = "BACstop";

#[derive(Parser)]
#[command(name = "bacstop")]
#[command(bin_name = "bacstop", about = "BACtrack breathalyzer CLI")]
pub struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Take a breath test with live status output")]
    Test(TestArgs),
    #[command(about = "Gate on a BAC threshold (for git hooks); exit 0=pass, 1=blocked, 2=error")]
    Check(CheckArgs),
    #[command(about = "Discover the device and show its identifiers")]
    Info,
    #[command(about = "Install the BACstop git hook into a repo")]
    Install(InstallArgs),
    #[command(about = "Remove the BACstop git hook from a repo")]
    Uninstall(UninstallArgs),
}

#[derive(clap::Args)]
struct TestArgs {
    #[clap(long, short, action)]
    quiet: bool,
}

#[derive(clap::Args)]
struct CheckArgs {
    /// BAC threshold in percent; defaults to the configured value.
    #[arg(long, short)]
    threshold: Option<f64>,

    #[clap(long, short, action)]
    quiet: bool,
}

#[derive(clap::Args)]
struct InstallArgs {
    /// Path to the git repo.
    #[arg(long, short, default_value = ".")]
    repo: PathBuf,

    #[arg(long, default_value_t = 0.0)]
    threshold: f64,

    #[arg(long, short, value_enum, default_value_t = Spice::Hot)]
    spice: Spice,

    #[arg(long, value_enum, default_value_t = HookKind::PrePush)]
    hook: HookKind,
}

#[derive(clap::Args)]
struct UninstallArgs {
    /// Path to the git repo.
    #[arg(long, short, default_value = ".")]
    repo: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Spice {
    /// Informational only, always allows.
    Verde,
    /// Blocks when the check fails.
    Hot,
    /// Blocks and discards your changes.
    Diablo,
}

impl Spice {
    fn as_str(self) -> &'static str {
        match self {
            Spice::Verde => "verde",
            Spice::Hot => "hot",
            Spice::Diablo => "diablo",
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Spice::Verde => "informational only, always allows",
            Spice::Hot => "blocks if BAC below threshold",
            Spice::Diablo => "blocks AND destroys your changes",
        }
    }
}

impl fmt::Display for Spice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum HookKind {
    PreCommit,
    PrePush,
}

impl HookKind {
    fn file_name(self) -> &'static str {
        match self {
            HookKind::PreCommit => "pre-commit",
            HookKind::PrePush => "pre-push",
        }
    }

    fn other(self) -> Self {
        match self {
            HookKind::PreCommit => HookKind::PrePush,
            HookKind::PrePush => HookKind::PreCommit,
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

pub async fn run() -> color_eyre::Result<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Test(args) => test(args).await,
        Commands::Check(args) => Ok(check(args).await),
        Commands::Info => info().await,
        Commands::Install(args) => install(args),
        Commands::Uninstall(args) => uninstall(args),
    }
}

async fn connect(config: &Config) -> color_eyre::Result<BleTransport> {
    BleTransport::connect(config.device.address.as_deref(), config.device.scan_timeout())
        .await
        .wrap_err("could not connect to a breathalyzer")
}

async fn test(args: TestArgs) -> color_eyre::Result<ExitCode> {
    let config = Config::load()?;
    let printer = StatusPrinter::new(args.quiet);
    printer.header();
    printer.connecting();

    let transport = connect(&config).await?;
    let mut tester = BreathTester::new(transport);
    printer.connected(
        tester.transport().device_name(),
        &tester.transport().address(),
    );

    let outcome = tester
        .take_test(|n| printer.report(n), config.test.timeout())
        .await;
    disconnect(tester.transport_mut()).await;

    match outcome? {
        Some(bac) => printer.show_result(bac),
        None => printer.show_failure("Test failed or was cancelled"),
    }
    Ok(ExitCode::SUCCESS)
}

/// Threshold gate used by the git hook. Unlike `test`, every failure mode
/// maps to an exit code instead of a rendered error report.
async fn check(args: CheckArgs) -> ExitCode {
    match run_check(args).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(2)
        }
    }
}

async fn run_check(args: CheckArgs) -> color_eyre::Result<ExitCode> {
    let config = Config::load()?;
    let threshold = args.threshold.unwrap_or(config.test.threshold);
    let quiet = args.quiet;

    if !quiet {
        println!("Checking BAC (threshold: {threshold:.2}%)...");
    }

    let transport = connect(&config).await?;
    let mut tester = BreathTester::new(transport);
    let outcome = tester
        .take_test(
            |n| {
                if !quiet {
                    println!("  {n}");
                }
            },
            config.test.timeout(),
        )
        .await;
    disconnect(tester.transport_mut()).await;

    let Some(bac) = outcome? else {
        if !quiet {
            println!("Test did not complete");
        }
        return Ok(ExitCode::from(2));
    };

    if !quiet {
        println!("BAC: {bac:.4}%");
    }
    if bac >= threshold {
        if !quiet {
            println!("Above threshold - allowed");
        }
        Ok(ExitCode::SUCCESS)
    } else {
        if !quiet {
            println!("Below threshold - blocked");
        }
        Ok(ExitCode::from(1))
    }
}

async fn info() -> color_eyre::Result<ExitCode> {
    let config = Config::load()?;
    println!("Scanning...");

    let mut transport = connect(&config).await?;
    println!("Device found");
    println!("  Name:           {}", transport.device_name().unwrap_or("<unknown>"));
    println!("  Address:        {}", transport.address());
    println!("  Service:        {SERVICE_UUID}");
    println!("  Characteristic: {STATUS_CHARACTERISTIC}");

    disconnect(&mut transport).await;
    Ok(ExitCode::SUCCESS)
}

async fn disconnect(transport: &mut BleTransport) {
    if let Err(err) = transport.disconnect().await {
        warn!(error = %err, "disconnect failed");
    }
}

fn install(args: InstallArgs) -> color_eyre::Result<ExitCode> {
    let repo = args
        .repo
        .canonicalize()
        .wrap_err_with(|| format!("no such path: {}", args.repo.display()))?;
    let git_dir = repo.join(".git");
    if !git_dir.is_dir() {
        bail!("not a git repo: {}", repo.display());
    }

    let hooks_dir = git_dir.join("hooks");
    fs::create_dir_all(&hooks_dir)?;
    let dest = hooks_dir.join(args.hook.file_name());

    // Remove any BACstop hook left in the other slot.
    let other = hooks_dir.join(args.hook.other().file_name());
    if other.exists() && fs::read_to_string(&other)?.contains(HOOK_MARKER) {
        fs::remove_file(&other)?;
        println!("Removed old BACstop {} hook.", args.hook.other().file_name());
    }

    if dest.exists() {
        println!("Overwriting existing {} hook.", args.hook.file_name());
    }
    fs::write(&dest, HOOK_SCRIPT)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(&dest)?.permissions();
        perms.set_mode(perms.mode() | 0o111);
        fs::set_permissions(&dest, perms)?;
    }

    fs::write(
        repo.join(".bacstop"),
        format!(
            "threshold={:.2}\nspice={}\nhook={}\n",
            args.threshold,
            args.spice.as_str(),
            args.hook.file_name()
        ),
    )?;

    println!();
    println!("BACstop installed!");
    println!("  Hook:      {}", dest.display());
    println!("  Threshold: {:.2}%", args.threshold);
    println!(
        "  Spice:     {} ({})",
        args.spice.as_str(),
        args.spice.describe()
    );
    if args.spice == Spice::Diablo {
        println!();
        println!("!! DIABLO MODE: failing the check will DESTROY your changes !!");
    }
    Ok(ExitCode::SUCCESS)
}

fn uninstall(args: UninstallArgs) -> color_eyre::Result<ExitCode> {
    let repo = args
        .repo
        .canonicalize()
        .wrap_err_with(|| format!("no such path: {}", args.repo.display()))?;
    let hooks_dir = repo.join(".git").join("hooks");
    let mut removed = false;

    for hook in [HookKind::PreCommit, HookKind::PrePush] {
        let path = hooks_dir.join(hook.file_name());
        if path.exists() && fs::read_to_string(&path)?.contains(HOOK_MARKER) {
            fs::remove_file(&path)?;
            println!("Removed BACstop {} hook.", hook.file_name());
            removed = true;
        }
    }
    if !removed {
        println!("No BACstop hooks found.");
    }

    let bacstop_config = repo.join(".bacstop");
    if bacstop_config.exists() {
        fs::remove_file(&bacstop_config)?;
        println!("Removed .bacstop config.");
    }

    Ok(ExitCode::SUCCESS)
}
