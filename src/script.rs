//! `mkbootimg` rebuild script generation.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::{Error, Header, Result, Slice};

pub const DEFAULT_REBUILD_COMMAND: &str = "mkbootimg";

/// File names of everything an unpack run produces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Destinations {
    /// The rebuild script itself
    pub script: PathBuf,
    pub kernel: PathBuf,
    pub ramdisk: PathBuf,
    pub second: PathBuf,
    /// Image written by running the rebuild script
    pub output: PathBuf,
}

impl Default for Destinations {
    fn default() -> Self {
        Self {
            script: "remkbootimg.sh".into(),
            kernel: "kernel.img".into(),
            ramdisk: "ramdisk.img".into(),
            second: "secondary.img".into(),
            output: "newboot.img".into(),
        }
    }
}

impl Destinations {
    /// Where a slice gets written. The header slot holds the rebuild script.
    pub fn for_slice(&self, slice: Slice) -> &Path {
        match slice {
            Slice::Header => &self.script,
            Slice::Kernel => &self.kernel,
            Slice::Ramdisk => &self.ramdisk,
            Slice::Second => &self.second,
        }
    }
}

/// Shell script that calls `mkbootimg` with the parameters of a header.
///
/// Values are wrapped in double quotes as-is. Quotes, `$` or backslashes
/// inside the command line or board name are not escaped. Header strings
/// and paths are written as raw bytes, so nothing is lost when they are
/// not valid UTF-8.
pub struct RebuildScript<'a> {
    pub header: &'a Header,
    pub destinations: &'a Destinations,
    pub command: &'a str,
}

impl RebuildScript<'_> {
    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        let hdr = self.header;
        let dests = self.destinations;
        let os = hdr.os_version_info();

        writeln!(w, "#!/bin/sh")?;
        writeln!(w, "{} \\", self.command)?;
        write_quoted(w, "--kernel", path_bytes(&dests.kernel))?;
        write_quoted(w, "--ramdisk", path_bytes(&dests.ramdisk))?;
        if hdr.has_second() {
            write_quoted(w, "--second", path_bytes(&dests.second))?;
        }
        write_quoted(w, "--cmdline", &hdr.cmdline_bytes())?;
        writeln!(w, " --base {:#x} \\", 0)?;
        writeln!(w, " --kernel_offset {:#x} \\", hdr.kernel_addr)?;
        writeln!(w, " --ramdisk_offset {:#x} \\", hdr.ramdisk_addr)?;
        writeln!(w, " --second_offset {:#x} \\", hdr.second_addr)?;
        writeln!(w, " --os_version \"{}\" \\", os.version_string())?;
        writeln!(w, " --os_patch_level \"{}\" \\", os.patch_level_string())?;
        writeln!(w, " --tags_offset {:#x} \\", hdr.tags_addr)?;
        write_quoted(w, "--board", hdr.board_name_bytes())?;
        writeln!(w, " --pagesize {:#x} \\", hdr.page_size)?;
        w.write_all(b" --output \"")?;
        w.write_all(path_bytes(&dests.output))?;
        w.write_all(b"\"\n")
    }
}

/// ` <flag> "<value>" \` followed by a newline.
fn write_quoted<W: Write + ?Sized>(w: &mut W, flag: &str, value: &[u8]) -> io::Result<()> {
    write!(w, " {flag} \"")?;
    w.write_all(value)?;
    w.write_all(b"\" \\\n")
}

fn path_bytes(path: &Path) -> &[u8] {
    path.as_os_str().as_encoded_bytes()
}

/// Renders the rebuild script for `header`.
pub fn emit(header: &Header, destinations: &Destinations, command: &str) -> Vec<u8> {
    let mut script = Vec::new();
    // Writing into a Vec can't fail
    RebuildScript {
        header,
        destinations,
        command,
    }
    .write_to(&mut script)
    .ok();
    script
}

/// Writes `script` to `path` and tries to make it executable.
///
/// Failing to change the file mode only logs a warning.
pub fn write_script(path: &Path, script: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|source| Error::FileCreate {
        path: path.to_owned(),
        source,
    })?;
    file.write_all(script)
        .map_err(Error::io("write rebuild script"))?;

    if let Err(err) = mark_executable(&file) {
        warn!(
            "failed to change file mode of '{}' to 0750: {err}",
            path.display()
        );
    }
    Ok(())
}

#[cfg(unix)]
fn mark_executable(file: &File) -> io::Result<()> {
    use std::fs::Permissions;
    use std::os::unix::fs::PermissionsExt;

    file.set_permissions(Permissions::from_mode(0o750))
}

#[cfg(not(unix))]
fn mark_executable(_file: &File) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "file modes are not supported on this platform",
    ))
}
