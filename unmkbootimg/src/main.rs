use std::{
    borrow::Cow,
    fs::{create_dir_all, File},
    io::{stdout, BufReader, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{anyhow, Context, Result};
use bootimg_split::{Destinations, Geometry, Header, Slice, UnpackOptions, Unpacker};
use clap::{Parser, ValueEnum};
use tracing::{info, Level};
use tracing_subscriber::{
    filter::{filter_fn, LevelFilter},
    fmt,
    prelude::*,
};

/// Extracts the kernel, ramdisk and second-stage bootloader from an Android
/// boot image and writes a script that rebuilds it with mkbootimg
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The source Android boot image file to extract from
    #[arg(short, long)]
    src: PathBuf,

    /// Output extracted images here instead of next to the source image
    #[arg(short, long)]
    dest_dir: Option<PathBuf>,

    /// Report progress
    #[arg(short, long)]
    verbose: bool,

    /// Only print header information, extract nothing
    #[arg(short, long)]
    info: bool,

    /// Text output format of --info
    #[arg(value_enum, long, default_value_t = TextOutputFormat::Info)]
    format: TextOutputFormat,

    /// Output null-terminated argument strings with --format mkbootimg
    #[arg(short = '0', long)]
    null: bool,

    /// Save the remake script using this filename [default: remkbootimg.sh]
    #[arg(short, long)]
    remake_script: Option<PathBuf>,

    /// Use this command in the remake script for mkbootimg [default: mkbootimg]
    #[arg(short, long)]
    mkbootimg: Option<String>,

    /// Filename of the image the remake script builds [default: newboot.img]
    #[arg(short, long)]
    new_boot: Option<PathBuf>,

    /// Filename of the extracted kernel [default: kernel.img]
    #[arg(long)]
    kernel_name: Option<PathBuf>,

    /// Filename of the extracted ramdisk [default: ramdisk.img]
    #[arg(long)]
    ramdisk_name: Option<PathBuf>,

    /// Filename of the extracted second-stage bootloader [default: secondary.img]
    #[arg(long)]
    second_name: Option<PathBuf>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum TextOutputFormat {
    /// Pretty-printed info-rich text format suitable for human inspection
    Info,
    /// Output shell-escaped (quoted) argument strings that can be used to
    /// reconstruct the boot image using `mkbootimg`
    Mkbootimg,
}

impl Args {
    fn options(&self) -> UnpackOptions {
        let mut options = UnpackOptions::default();
        let dests = &mut options.destinations;
        let overrides = [
            (&mut dests.script, &self.remake_script),
            (&mut dests.kernel, &self.kernel_name),
            (&mut dests.ramdisk, &self.ramdisk_name),
            (&mut dests.second, &self.second_name),
            (&mut dests.output, &self.new_boot),
        ];
        for (dest, arg) in overrides {
            if let Some(path) = arg {
                dest.clone_from(path);
            }
        }
        if let Some(cmd) = &self.mkbootimg {
            options.rebuild_command.clone_from(cmd);
        }
        options
    }

    /// The source image's directory unless overridden.
    fn dest_dir(&self) -> PathBuf {
        match &self.dest_dir {
            Some(dir) => dir.clone(),
            None => self
                .src
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or(Path::new("."))
                .to_owned(),
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Progress lines go to stdout as plain text, warnings and errors to stderr
/// with their level.
fn init_tracing(verbose: bool) {
    let progress = fmt::layer()
        .with_target(false)
        .without_time()
        .with_level(false)
        .with_writer(std::io::stdout)
        .with_filter(filter_fn(move |meta| is_progress(*meta.level(), verbose)));
    let diagnostics = fmt::layer()
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .with_filter(LevelFilter::WARN);
    let subscriber = tracing_subscriber::registry()
        .with(progress)
        .with(diagnostics);

    tracing::subscriber::set_global_default(subscriber).ok();
}

fn is_progress(level: Level, verbose: bool) -> bool {
    verbose && level == Level::INFO
}

fn run(args: &Args) -> Result<()> {
    let options = args.options();
    let src = File::open(&args.src)
        .with_context(|| format!("failed to open \"{}\"", args.src.display()))?;
    let mut unpacker = Unpacker::open(BufReader::new(src))
        .with_context(|| format!("failed to read header of \"{}\"", args.src.display()))?;

    if args.info {
        return match args.format {
            TextOutputFormat::Info => {
                print_info(unpacker.header(), unpacker.geometry());
                Ok(())
            }
            TextOutputFormat::Mkbootimg => {
                print_mkbootimg_args(unpacker.header(), &options.destinations, args.null)
            }
        };
    }

    let dest_dir = args.dest_dir();
    create_dir_all(&dest_dir)
        .with_context(|| format!("failed to create directory \"{}\"", dest_dir.display()))?;
    let report = unpacker
        .unpack_to(&dest_dir, &options)
        .with_context(|| format!("failed to unpack \"{}\"", args.src.display()))?;
    info!(
        "Wrote {} files to \"{}\"",
        report.written.len(),
        dest_dir.display()
    );
    Ok(())
}

fn print_info(hdr: &Header, geometry: &Geometry) {
    println!("boot magic: ANDROID!");
    println!("kernel_size: {}", hdr.kernel_size);
    println!("kernel load address: 0x{:08x}", hdr.kernel_addr);
    println!("ramdisk size: {}", hdr.ramdisk_size);
    println!("ramdisk load address: 0x{:08x}", hdr.ramdisk_addr);
    println!("second bootloader size: {}", hdr.second_size);
    println!("second bootloader load address: 0x{:08x}", hdr.second_addr);
    println!("kernel tags load address: 0x{:08x}", hdr.tags_addr);
    println!("page size: {}", hdr.page_size);
    println!("os version: {}", hdr.os_version.version());
    println!("os patch level: {}", hdr.os_version.patch());
    println!("boot image header version: {}", hdr.header_version);
    println!("product name: {}", hdr.board_name());
    println!(
        "command line args: {}",
        String::from_utf8_lossy(bootimg_split::take_until_null(&*hdr.cmdline))
    );
    println!(
        "additional command line args: {}",
        String::from_utf8_lossy(bootimg_split::take_until_null(&*hdr.extra_cmdline))
    );
    println!("image id: {}", hdr.id);
    for slice in &Slice::ALL[1..] {
        let s = geometry.slice(*slice);
        if s.is_present() {
            println!("{} offset: 0x{:08x}", slice.name(), s.offset);
        }
    }
    println!("image end: 0x{:08x}", geometry.image_end());
}

/// The same parameters the remake script passes, as separate arguments.
fn mkbootimg_args(hdr: &Header, dests: &Destinations) -> Vec<(&'static str, Vec<u8>)> {
    let os = hdr.os_version_info();
    let path = |p: &Path| p.as_os_str().as_encoded_bytes().to_vec();
    let mut args = vec![
        ("--kernel", path(&dests.kernel)),
        ("--ramdisk", path(&dests.ramdisk)),
    ];
    if hdr.has_second() {
        args.push(("--second", path(&dests.second)));
    }
    args.extend([
        ("--cmdline", hdr.cmdline_bytes()),
        ("--base", format!("{:#x}", 0).into_bytes()),
        ("--kernel_offset", format!("{:#x}", hdr.kernel_addr).into_bytes()),
        ("--ramdisk_offset", format!("{:#x}", hdr.ramdisk_addr).into_bytes()),
        ("--second_offset", format!("{:#x}", hdr.second_addr).into_bytes()),
        ("--os_version", os.version_string().into_bytes()),
        ("--os_patch_level", os.patch_level_string().into_bytes()),
        ("--tags_offset", format!("{:#x}", hdr.tags_addr).into_bytes()),
        ("--board", hdr.board_name_bytes().to_vec()),
        ("--pagesize", format!("{:#x}", hdr.page_size).into_bytes()),
        ("--output", path(&dests.output)),
    ]);
    args
}

fn print_mkbootimg_args(hdr: &Header, dests: &Destinations, null: bool) -> Result<()> {
    let sep: &[u8] = if null { b"\0" } else { b" " };
    let q = shlex::bytes::Quoter::new();
    let mut words: Vec<Cow<'_, [u8]>> = Vec::new();
    for (flag, value) in mkbootimg_args(hdr, dests) {
        words.push(Cow::Borrowed(flag.as_bytes()));
        if null {
            words.push(Cow::Owned(value));
        } else {
            let quoted = q
                .quote(&value)
                .map_err(|err| anyhow!("cannot quote {flag} value: {err:?}"))?
                .into_owned();
            words.push(Cow::Owned(quoted));
        }
    }

    let mut out = stdout().lock();
    out.write_all(&words.join(sep))?;
    out.write_all(if null { b"\0" } else { b"\n" })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("unmkbootimg").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults() {
        let args = parse(&["-s", "images/boot.img"]);
        assert_eq!(args.dest_dir(), Path::new("images"));
        assert_eq!(args.options(), UnpackOptions::default());
        assert!(!args.verbose && !args.info);

        let args = parse(&["--src", "boot.img"]);
        assert_eq!(args.dest_dir(), Path::new("."));
    }

    #[test]
    fn overrides() {
        let args = parse(&[
            "-s", "boot.img", "-d", "out", "-v", "-r", "re.sh", "-m", "mkbootimg.py", "-n",
            "new.img", "--second-name", "2nd.img",
        ]);
        assert_eq!(args.dest_dir(), Path::new("out"));
        assert!(args.verbose);
        let options = args.options();
        assert_eq!(options.destinations.script, Path::new("re.sh"));
        assert_eq!(options.destinations.output, Path::new("new.img"));
        assert_eq!(options.destinations.second, Path::new("2nd.img"));
        assert_eq!(options.destinations.kernel, Path::new("kernel.img"));
        assert_eq!(options.rebuild_command, "mkbootimg.py");
    }

    #[test]
    fn progress_only_when_verbose() {
        assert!(is_progress(Level::INFO, true));
        assert!(!is_progress(Level::INFO, false));
        assert!(!is_progress(Level::WARN, true));
        assert!(!is_progress(Level::DEBUG, true));
    }

    #[test]
    fn src_is_required() {
        assert!(Args::try_parse_from(["unmkbootimg", "-v"]).is_err());
    }

    #[test]
    fn mkbootimg_args_skip_missing_second() {
        let mut hdr = Header {
            kernel_size: 1,
            ramdisk_size: 1,
            page_size: 4096,
            ..Default::default()
        };
        let dests = Destinations::default();
        let flags: Vec<_> = mkbootimg_args(&hdr, &dests).into_iter().map(|(f, _)| f).collect();
        assert!(!flags.contains(&"--second"));
        assert_eq!(flags.len(), 13);

        hdr.second_size = 1;
        let args = mkbootimg_args(&hdr, &dests);
        assert_eq!(args[2], ("--second", b"secondary.img".to_vec()));
        assert_eq!(args.last().unwrap().1, b"newboot.img");

        hdr.cmdline[..3].copy_from_slice(b"a=\xe9");
        let args = mkbootimg_args(&hdr, &dests);
        assert_eq!(args[3], ("--cmdline", b"a=\xe9".to_vec()));
    }
}
