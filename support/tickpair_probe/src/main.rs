use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, error, info};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::path::PathBuf;
use tickpair_counter::{read_cycle, read_time, read_wide_counter_bounded, WideCounterValue};
use tickpair_layout::config::read_params;
use tickpair_layout::{AddressLayout, PlatformParams};
use tickpair_traits::{SplitCounter, TickError, TickResult};

#[derive(Parser)]
#[command(author, version, about)]
pub struct ProbeCli {
    /// Log at debug level.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Read a counter repeatedly and check that it only moves forward
    Sample {
        #[arg(short, long, value_enum, default_value_t = CounterKind::Cycle)]
        counter: CounterKind,
        #[arg(short = 'n', long, default_value_t = 16)]
        count: usize,
        /// Use the retrying reader with this many attempts per read
        #[arg(short, long)]
        bounded: Option<u32>,
    },
    /// Print the address layout of a platform
    Layout {
        #[command(flatten)]
        platform: PlatformArgs,
    },
    /// Tell which region of the layout an address belongs to
    Classify {
        #[arg(value_parser = parse_address)]
        address: u64,
        #[command(flatten)]
        platform: PlatformArgs,
    },
}

#[derive(clap::Args)]
pub struct PlatformArgs {
    /// RON file with the platform parameters, the reference platform otherwise
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Carve the kernel log buffer out of the physical memory window
    #[arg(long)]
    log_buffer: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum CounterKind {
    Time,
    Cycle,
}

fn parse_address(s: &str) -> Result<u64, String> {
    let s = s.trim().replace('_', "");
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid address {s:?}: {e}"))
}

fn load_layout(platform: &PlatformArgs) -> TickResult<AddressLayout> {
    let mut params = match &platform.config {
        Some(path) => read_params(path)?,
        None => PlatformParams::default(),
    };
    if platform.log_buffer {
        params.kernel_log_buffer = true;
    }
    Ok(AddressLayout::new(&params)?)
}

fn print_layout(layout: &AddressLayout) {
    println!("USER_TOP / PPTR_BASE   0x{:08x}", layout.user_top);
    println!("PADDR_BASE             0x{:08x}", layout.paddr_base);
    println!(
        "PPTR_TOP               0x{:08x}  (window 0x{:x} bytes)",
        layout.pptr_top,
        layout.pptr_window_size()
    );
    if let Some(buffer) = layout.log_buffer {
        println!(
            "log buffer             0x{:08x}  (0x{:x} bytes)",
            buffer.base, buffer.size
        );
    }
    println!("KERNEL_ELF_BASE        0x{:08x}", layout.kernel_elf_base);
    println!(
        "KERNEL_ELF_PADDR_BASE  0x{:08x}",
        layout.kernel_elf_paddr_base
    );
    println!("KDEV_BASE              0x{:08x}", layout.kdev_base);
}

/// Split backend of the current target, for the retrying reader.
#[cfg(not(any(target_arch = "riscv32", target_arch = "riscv64")))]
fn split_backend(_kind: CounterKind) -> TickResult<Box<dyn SplitCounter>> {
    Ok(Box::new(tickpair_counter::HostCounter::new()))
}

#[cfg(target_arch = "riscv32")]
fn split_backend(kind: CounterKind) -> TickResult<Box<dyn SplitCounter>> {
    Ok(match kind {
        CounterKind::Time => Box::new(tickpair_counter::TimeCsr),
        CounterKind::Cycle => Box::new(tickpair_counter::CycleCsr),
    })
}

#[cfg(target_arch = "riscv64")]
fn split_backend(_kind: CounterKind) -> TickResult<Box<dyn SplitCounter>> {
    Err("counters are not split on this target".into())
}

/// Takes `count` readings and fails on the first one that goes backwards.
fn sample_with(
    count: usize,
    mut read: impl FnMut() -> TickResult<WideCounterValue>,
) -> TickResult<Vec<WideCounterValue>> {
    let mut samples: Vec<WideCounterValue> = Vec::with_capacity(count);
    for index in 0..count {
        let value = read()?;
        if let Some(previous) = samples.last() {
            if value < *previous {
                return Err(TickError::from(format!(
                    "counter went backwards at sample {index}"
                ))
                .add_cause(&format!("{value} after {previous}")));
            }
        }
        samples.push(value);
    }
    Ok(samples)
}

fn print_samples(samples: &[WideCounterValue]) {
    let mut previous: Option<WideCounterValue> = None;
    for (index, value) in samples.iter().enumerate() {
        let delta = previous.map_or(0, |p| value.ticks_since(p));
        println!("{index:>6}  0x{:016x}  +{delta}", value.ticks());
        previous = Some(*value);
    }
}

fn run(cli: ProbeCli) -> TickResult<()> {
    match cli.command {
        Command::Sample {
            counter,
            count,
            bounded,
        } => {
            tickpair_counter::initialize();
            let samples = match bounded {
                Some(attempts) => {
                    let backend = split_backend(counter)?;
                    sample_with(count, || {
                        Ok(read_wide_counter_bounded(backend.as_ref(), attempts)?)
                    })?
                }
                None => match counter {
                    CounterKind::Time => sample_with(count, || Ok(read_time()))?,
                    CounterKind::Cycle => sample_with(count, || Ok(read_cycle()))?,
                },
            };
            print_samples(&samples);
            if let (Some(first), Some(last)) = (samples.first(), samples.last()) {
                info!(
                    "{count} {counter:?} samples, {} ticks end to end",
                    last.ticks_since(*first)
                );
            }
        }
        Command::Layout { platform } => {
            let layout = load_layout(&platform)?;
            print_layout(&layout);
            info!("layout is valid");
        }
        Command::Classify { address, platform } => {
            let layout = load_layout(&platform)?;
            debug!("{layout:?}");
            println!("0x{address:08x}: {}", layout.region_of(address));
            if let Some(paddr) = layout.pptr_to_paddr(address) {
                println!("  physical 0x{paddr:08x}");
            } else if let Some(paddr) = layout.kernel_elf_vaddr_to_paddr(address) {
                println!("  kernel image physical 0x{paddr:08x}");
            }
        }
    }
    Ok(())
}

fn main() {
    let cli = ProbeCli::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Err(e) = TermLogger::init(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto)
    {
        eprintln!("[tickpair-probe] could not set up logging: {e}");
    }

    if let Err(e) = run(cli) {
        error!("{e}");
        std::process::exit(1);
    }
}
