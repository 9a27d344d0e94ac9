use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use bootimg_split::{Error, ErrorKind, Header, ImageId, OsPatch, OsVersion, OsVersionPatch};
use bootimg_split::{Slice, UnpackOptions, Unpacker};

struct Image {
    header: Header,
    kernel: Vec<u8>,
    ramdisk: Vec<u8>,
    second: Vec<u8>,
}

impl Image {
    fn new(page_size: u32, kernel: usize, ramdisk: usize, second: usize) -> Self {
        let kernel: Vec<u8> = (0..kernel).map(|i| (i % 253) as u8).collect();
        let ramdisk: Vec<u8> = (0..ramdisk).map(|i| (i % 241) as u8 ^ 0x5a).collect();
        let second: Vec<u8> = (0..second).map(|i| (i % 239) as u8 ^ 0xa5).collect();
        let mut header = Header {
            kernel_size: kernel.len() as u32,
            kernel_addr: 0x10008000,
            ramdisk_size: ramdisk.len() as u32,
            ramdisk_addr: 0x11000000,
            second_size: second.len() as u32,
            second_addr: 0x10f00000,
            tags_addr: 0x10000100,
            page_size,
            os_version: OsVersionPatch::new(OsVersion::new(8, 1, 0), OsPatch::new(2018, 7)),
            ..Default::default()
        };
        header.board_name[..6].copy_from_slice(b"angler");
        header.cmdline[..20].copy_from_slice(b"androidboot.hardware");
        header.extra_cmdline[..7].copy_from_slice(b"=angler");
        Self {
            header,
            kernel,
            ramdisk,
            second,
        }
    }

    fn bytes(&self) -> Vec<u8> {
        let page = self.header.page_size as usize;
        let pad = |bytes: &mut Vec<u8>| {
            let len = bytes.len().div_ceil(page) * page;
            bytes.resize(len, 0);
        };
        let mut bytes = self.header.to_bytes().unwrap();
        pad(&mut bytes);
        bytes.extend_from_slice(&self.kernel);
        pad(&mut bytes);
        bytes.extend_from_slice(&self.ramdisk);
        pad(&mut bytes);
        bytes.extend_from_slice(&self.second);
        pad(&mut bytes);
        bytes
    }

    fn write_to(&self, path: &Path) {
        File::create(path).unwrap().write_all(&self.bytes()).unwrap();
    }
}

#[test]
fn scenario_without_second_stage() {
    let dir = tempfile::tempdir().unwrap();
    let image = Image::new(2048, 100, 3000, 0);
    let src = dir.path().join("boot.img");
    image.write_to(&src);

    let mut unpacker = Unpacker::open(File::open(&src).unwrap()).unwrap();
    let kernel = *unpacker.geometry().slice(Slice::Kernel);
    assert_eq!((kernel.offset, kernel.size), (2048, 100));
    let ramdisk = *unpacker.geometry().slice(Slice::Ramdisk);
    assert_eq!((ramdisk.offset, ramdisk.size), (4096, 3000));

    let out = dir.path().join("out");
    fs::create_dir(&out).unwrap();
    let report = unpacker.unpack_to(&out, &UnpackOptions::default()).unwrap();

    let order: Vec<Slice> = report.written.iter().map(|(s, _)| *s).collect();
    assert_eq!(order, [Slice::Header, Slice::Kernel, Slice::Ramdisk]);
    assert_eq!(fs::read(out.join("kernel.img")).unwrap(), image.kernel);
    assert_eq!(fs::read(out.join("ramdisk.img")).unwrap(), image.ramdisk);
    assert!(!out.join("secondary.img").exists());

    let script = fs::read_to_string(out.join("remkbootimg.sh")).unwrap();
    assert!(script.starts_with("#!/bin/sh\nmkbootimg \\\n"));
    assert!(!script.contains("--second "));
    assert!(script.contains(" --cmdline \"androidboot.hardware=angler\" \\\n"));
    assert!(script.contains(" --os_version \"8.1.0\" \\\n"));
    assert!(script.contains(" --os_patch_level \"2018-07-01\" \\\n"));
    assert!(script.contains(" --board \"angler\" \\\n"));
    assert!(script.contains(" --pagesize 0x800 \\\n"));
    assert!(script.ends_with(" --output \"newboot.img\"\n"));
}

#[test]
fn extracts_second_stage_with_custom_names() {
    let dir = tempfile::tempdir().unwrap();
    let image = Image::new(4096, 10_000, 4096, 77);
    let src = dir.path().join("recovery.img");
    image.write_to(&src);

    let mut options = UnpackOptions {
        rebuild_command: "python3 mkbootimg.py".to_owned(),
        ..Default::default()
    };
    options.destinations.script = "rebuild.sh".into();
    options.destinations.second = "second.bin".into();
    options.destinations.output = "recovery-new.img".into();

    let mut unpacker = Unpacker::open(File::open(&src).unwrap()).unwrap();
    assert_eq!(unpacker.geometry().offsets(), [0, 4096, 16384, 20480]);
    let report = unpacker.unpack_to(dir.path(), &options).unwrap();
    assert_eq!(report.written.len(), 4);

    assert_eq!(fs::read(dir.path().join("kernel.img")).unwrap(), image.kernel);
    assert_eq!(fs::read(dir.path().join("ramdisk.img")).unwrap(), image.ramdisk);
    assert_eq!(fs::read(dir.path().join("second.bin")).unwrap(), image.second);

    let script = fs::read_to_string(dir.path().join("rebuild.sh")).unwrap();
    assert!(script.starts_with("#!/bin/sh\npython3 mkbootimg.py \\\n"));
    assert!(script.contains(" --second \"second.bin\" \\\n"));
    assert!(script.ends_with(" --output \"recovery-new.img\"\n"));
}

#[test]
fn truncated_ramdisk_fails_after_partial_output() {
    let dir = tempfile::tempdir().unwrap();
    let image = Image::new(2048, 100, 3000, 0);
    let mut bytes = image.bytes();
    bytes.truncate(4096 + 1000);
    let src = dir.path().join("boot.img");
    fs::write(&src, &bytes).unwrap();

    let mut unpacker = Unpacker::open(File::open(&src).unwrap()).unwrap();
    let err = unpacker
        .unpack_to(dir.path(), &UnpackOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(matches!(err, Error::UnexpectedEof { .. }));
    assert!(dir.path().join("remkbootimg.sh").exists());
    assert_eq!(fs::read(dir.path().join("kernel.img")).unwrap(), image.kernel);
}

#[test]
fn rejects_invalid_headers() {
    let image = Image::new(2048, 100, 3000, 0);

    let mut bytes = image.bytes();
    bytes[..8].copy_from_slice(b"ANDROID?");
    let err = Unpacker::open(std::io::Cursor::new(bytes)).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Format);

    let mut header = image.header.clone();
    header.ramdisk_size = 0;
    let err = Header::parse(&header.to_bytes().unwrap()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);

    header.ramdisk_size = 3000;
    header.page_size = 0;
    let err = Header::parse(&header.to_bytes().unwrap()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[test]
fn image_id_presentation() {
    let mut image = Image::new(2048, 100, 3000, 0);
    image.header.id = ImageId([0xab; 32]);
    let unpacker = Unpacker::open(std::io::Cursor::new(image.bytes())).unwrap();
    let id = unpacker.header().id.to_string();
    assert!(id.starts_with("ab:ab:ab:ab ab:ab"));

    let mut digest = [0u8; 32];
    digest[..20].fill(0xcd);
    image.header.id = ImageId(digest);
    let unpacker = Unpacker::open(std::io::Cursor::new(image.bytes())).unwrap();
    assert_eq!(
        unpacker.header().id.to_string(),
        format!("{} sha1", "cd".repeat(20))
    );
}
