use std::time::{Duration, SystemTime};

use fakeos_core::*;

fn driver() -> MemDriver {
    MemDriver::new(SimConfig::default()).unwrap()
}

fn perm(bits: u32) -> FileMode {
    FileMode::new(bits)
}

#[test]
fn test_open_unbound_path_is_not_found() {
    let os = driver();
    let err = os.open("/no/such/file").unwrap_err();
    assert_eq!(err.cause(), Errno::NotFound);
    assert!(os.is_not_exist(&err));
    assert_eq!(err.to_string(), "open /no/such/file: no such file or directory");
}

#[test]
fn test_mkdir_requires_parent() {
    let os = driver();
    let err = os.mkdir("/a/b", perm(0o755)).unwrap_err();
    assert!(err.is_not_exist());

    os.mkdir("/a", perm(0o755)).unwrap();
    os.mkdir("/a/b", perm(0o750)).unwrap();
    let info = os.stat("/a/b").unwrap();
    assert!(info.is_dir());
    assert_eq!(info.mode.perm(), 0o750);
    assert_eq!(info.name, "b");
}

#[test]
fn test_mkdir_existing_is_already_exists() {
    let os = driver();
    let err = os.mkdir("/tmp", perm(0o755)).unwrap_err();
    assert!(os.is_exist(&err));
    assert!(os.mkdir("/", perm(0o755)).unwrap_err().is_exist());
}

#[test]
fn test_mkdir_inherits_parent_owner() {
    let os = driver();
    os.mkdir("/owned", perm(0o755)).unwrap();
    os.chown("/owned", 1000, 1000).unwrap();
    os.mkdir("/owned/child", perm(0o755)).unwrap();
    let info = os.stat("/owned/child").unwrap();
    assert_eq!((info.uid, info.gid), (1000, 1000));
}

#[test]
fn test_mkdir_all_inherits_parent_owner() {
    let os = driver();
    os.mkdir("/owned", perm(0o755)).unwrap();
    os.chown("/owned", 1000, 1000).unwrap();
    os.mkdir_all("/owned/x/y", perm(0o755)).unwrap();
    for dir in ["/owned/x", "/owned/x/y"] {
        let info = os.stat(dir).unwrap();
        assert_eq!((info.uid, info.gid), (1000, 1000));
    }
}

#[test]
fn test_mkdir_all_rejects_symlink_component_like_mkdir() {
    let os = driver();
    os.mkdir("/tmp/real", perm(0o755)).unwrap();
    os.symlink("/tmp/real", "/tmp/link").unwrap();

    let err = os.mkdir("/tmp/link/sub", perm(0o755)).unwrap_err();
    assert_eq!(err.cause(), Errno::InvalidArgument);
    let err = os.mkdir_all("/tmp/link/sub", perm(0o755)).unwrap_err();
    assert_eq!(err.cause(), Errno::InvalidArgument);
    assert!(os.lstat("/tmp/link/sub").unwrap_err().is_not_exist());
}

#[test]
fn test_mkdir_all_creates_every_component_and_is_idempotent() {
    let os = driver();
    os.mkdir_all("/a/b/c", perm(0o755)).unwrap();
    for dir in ["/a", "/a/b", "/a/b/c"] {
        assert!(os.stat(dir).unwrap().is_dir(), "{dir} should be a directory");
    }
    os.mkdir_all("/a/b/c", perm(0o700)).unwrap();
    assert_eq!(os.stat("/a/b/c").unwrap().mode.perm(), 0o755);
}

#[test]
fn test_mkdir_all_through_regular_file_fails() {
    let os = driver();
    os.create("/tmp/file").unwrap();
    let err = os.mkdir_all("/tmp/file/sub", perm(0o755)).unwrap_err();
    assert_eq!(err.cause(), Errno::InvalidArgument);
}

#[test]
fn test_remove_single_binding() {
    let os = driver();
    os.create("/tmp/f").unwrap();
    os.remove("/tmp/f").unwrap();
    assert!(os.stat("/tmp/f").unwrap_err().is_not_exist());
    assert!(os.remove("/tmp/f").unwrap_err().is_not_exist());
    assert_eq!(os.remove("/").unwrap_err().cause(), Errno::InvalidArgument);
}

#[test]
fn test_remove_all_prefix_and_idempotent() {
    let os = driver();
    os.mkdir_all("/tmp/x/y", perm(0o755)).unwrap();
    os.create("/tmp/x/y/f").unwrap();
    os.create("/tmp/xy").unwrap();

    os.remove_all("/tmp/x").unwrap();
    assert!(os.lstat("/tmp/x").unwrap_err().is_not_exist());
    assert!(os.lstat("/tmp/x/y/f").unwrap_err().is_not_exist());
    assert!(os.lstat("/tmp/xy").is_ok());

    os.remove_all("/tmp/x").unwrap();
    os.remove_all("/never/existed").unwrap();
}

#[test]
fn test_rename_moves_binding_and_keeps_content() {
    let os = driver();
    let mut f = os.create("/tmp/old").unwrap();
    f.write(b"payload").unwrap();
    f.close().unwrap();
    let before = os.stat("/tmp/old").unwrap();

    os.rename("/tmp/old", "/tmp/new").unwrap();
    assert!(os.open("/tmp/old").unwrap_err().is_not_exist());

    let mut g = os.open("/tmp/new").unwrap();
    let mut buf = [0u8; 16];
    let n = g.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"payload");
    assert!(os.same_file(&before, &os.stat("/tmp/new").unwrap()));
}

#[test]
fn test_rename_overwrites_existing_target() {
    let os = driver();
    os.create("/tmp/a").unwrap().write_string("from a").unwrap();
    os.create("/tmp/b").unwrap().write_string("from b, longer").unwrap();

    os.rename("/tmp/a", "/tmp/b").unwrap();
    assert_eq!(os.stat("/tmp/b").unwrap().size, 6);
    assert!(os.lstat("/tmp/a").is_err());
}

#[test]
fn test_rename_missing_source() {
    let os = driver();
    let err = os.rename("/tmp/ghost", "/tmp/other").unwrap_err();
    assert!(err.is_not_exist());
    assert_eq!(err.to_string(), "rename /tmp/ghost /tmp/other: no such file or directory");
}

#[test]
fn test_rename_directory_moves_children() {
    let os = driver();
    os.mkdir_all("/src/inner", perm(0o755)).unwrap();
    os.create("/src/inner/file").unwrap();

    os.rename("/src", "/dst").unwrap();
    assert!(os.stat("/dst/inner/file").is_ok());
    assert!(os.stat("/src/inner/file").is_err());

    let err = os.rename("/dst", "/dst/inner/self").unwrap_err();
    assert_eq!(err.cause(), Errno::InvalidArgument);
}

#[test]
fn test_rename_onto_own_ancestor_keeps_everything() {
    let os = driver();
    os.mkdir_all("/a/b", perm(0o755)).unwrap();
    os.create("/a/b/f").unwrap().write(b"data").unwrap();

    let err = os.rename("/a/b", "/a").unwrap_err();
    assert_eq!(err.cause(), Errno::InvalidArgument);
    let err = os.rename("/a/b/f", "/a").unwrap_err();
    assert_eq!(err.cause(), Errno::InvalidArgument);

    assert!(os.stat("/a").unwrap().is_dir());
    assert!(os.stat("/a/b").unwrap().is_dir());
    assert_eq!(os.stat("/a/b/f").unwrap().size, 4);
}

#[test]
fn test_hard_link_shares_identity() {
    let os = driver();
    os.create("/tmp/a").unwrap();
    os.link("/tmp/a", "/tmp/b").unwrap();

    let mut via_a = os.open("/tmp/a").unwrap();
    via_a.write(b"shared").unwrap();

    let mut via_b = os.open("/tmp/b").unwrap();
    let mut buf = [0u8; 6];
    assert_eq!(via_b.read(&mut buf).unwrap(), 6);
    assert_eq!(&buf, b"shared");
    assert!(os.same_file(&os.stat("/tmp/a").unwrap(), &os.stat("/tmp/b").unwrap()));

    os.remove("/tmp/a").unwrap();
    assert_eq!(os.stat("/tmp/b").unwrap().size, 6);
}

#[test]
fn test_link_errors() {
    let os = driver();
    assert!(os.link("/tmp/missing", "/tmp/x").unwrap_err().is_not_exist());

    os.create("/tmp/a").unwrap();
    os.create("/tmp/b").unwrap();
    let err = os.link("/tmp/a", "/tmp/b").unwrap_err();
    assert!(err.is_exist());
    assert_eq!(err.to_string(), "link /tmp/a /tmp/b: file already exists");

    assert_eq!(os.link("/tmp", "/tmp2").unwrap_err().cause(), Errno::InvalidArgument);
}

#[test]
fn test_symlink_and_readlink() {
    let os = driver();
    os.symlink("/tmp/real", "/tmp/link").unwrap();
    assert_eq!(os.readlink("/tmp/link").unwrap(), "/tmp/real");

    let err = os.symlink("/tmp/other", "/tmp/link").unwrap_err();
    assert!(err.is_exist());

    os.create("/tmp/plain").unwrap();
    let err = os.readlink("/tmp/plain").unwrap_err();
    assert_eq!(err.cause(), Errno::InvalidArgument);
    assert!(os.readlink("/tmp/nothing").unwrap_err().is_not_exist());
}

#[test]
fn test_stat_follows_symlinks_lstat_does_not() {
    let os = driver();
    os.create("/tmp/real").unwrap().write(b"abc").unwrap();
    os.symlink("real", "/tmp/rel").unwrap();
    os.symlink("/tmp/rel", "/tmp/chain").unwrap();

    let info = os.stat("/tmp/chain").unwrap();
    assert!(info.mode.is_regular());
    assert_eq!(info.size, 3);
    assert_eq!(info.name, "chain");

    let link = os.lstat("/tmp/chain").unwrap();
    assert!(link.is_symlink());
    assert_eq!(link.kind(), FileKind::Symlink);
}

#[test]
fn test_stat_broken_and_cyclic_links() {
    let os = driver();
    os.symlink("/tmp/missing", "/tmp/broken").unwrap();
    assert!(os.stat("/tmp/broken").unwrap_err().is_not_exist());
    assert!(os.lstat("/tmp/broken").is_ok());

    os.symlink("/tmp/b", "/tmp/a").unwrap();
    os.symlink("/tmp/a", "/tmp/b").unwrap();
    assert_eq!(os.stat("/tmp/a").unwrap_err().cause(), Errno::InvalidArgument);
}

#[test]
fn test_metadata_operations() {
    let os = driver();
    os.create("/tmp/f").unwrap();

    os.chmod("/tmp/f", perm(0o600)).unwrap();
    os.chown("/tmp/f", 42, 43).unwrap();
    let atime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
    let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(2_000);
    os.chtimes("/tmp/f", atime, mtime).unwrap();

    let info = os.stat("/tmp/f").unwrap();
    assert_eq!(info.mode.perm(), 0o600);
    assert!(info.mode.is_regular());
    assert_eq!((info.uid, info.gid), (42, 43));
    assert_eq!(info.accessed, atime);
    assert_eq!(info.modified, mtime);

    for err in [
        os.chmod("/tmp/none", perm(0o600)).unwrap_err(),
        os.chown("/tmp/none", 1, 1).unwrap_err(),
        os.lchown("/tmp/none", 1, 1).unwrap_err(),
        os.chtimes("/tmp/none", atime, mtime).unwrap_err(),
    ] {
        assert!(err.is_not_exist());
    }
}

#[test]
fn test_lchown_changes_the_link_only() {
    let os = driver();
    os.create("/tmp/target").unwrap();
    os.symlink("/tmp/target", "/tmp/link").unwrap();

    os.lchown("/tmp/link", 7, 8).unwrap();
    let link = os.lstat("/tmp/link").unwrap();
    let target = os.stat("/tmp/link").unwrap();
    assert_eq!((link.uid, link.gid), (7, 8));
    assert_eq!((target.uid, target.gid), (501, 20));
}

#[test]
fn test_truncate_by_path() {
    let os = driver();
    let mut f = os.create("/tmp/f").unwrap();
    assert_eq!(f.write(b"hello").unwrap(), 5);

    os.truncate("/tmp/f", 3).unwrap();
    assert_eq!(os.stat("/tmp/f").unwrap().size, 3);

    let mut buf = [0u8; 8];
    let n = f.read_at(&mut buf, 0).unwrap();
    assert_eq!(&buf[..n], b"hel");

    os.truncate("/tmp/f", 100).unwrap();
    assert_eq!(os.stat("/tmp/f").unwrap().size, 3);
    assert!(os.truncate("/tmp/none", 0).unwrap_err().is_not_exist());
}

#[test]
fn test_chdir_and_relative_paths() {
    let os = driver();
    assert_eq!(os.getwd().unwrap(), "/");

    let err = os.chdir("/i/dont/exist").unwrap_err();
    assert!(matches!(err, OsError::Path { op: "chdir", .. }));

    os.chdir(&os.temp_dir()).unwrap();
    assert_eq!(os.getwd().unwrap(), "/tmp");

    os.create("relative").unwrap();
    assert!(os.stat("/tmp/relative").is_ok());
    os.mkdir("../top", perm(0o755)).unwrap();
    assert!(os.stat("/top").unwrap().is_dir());

    assert_eq!(os.chdir("/tmp/relative").unwrap_err().cause(), Errno::InvalidArgument);
}

#[test]
fn test_same_file_distinguishes_nodes_and_drivers() {
    let os = driver();
    os.create("/tmp/a").unwrap();
    os.create("/tmp/b").unwrap();
    let a = os.stat("/tmp/a").unwrap();
    let b = os.stat("/tmp/b").unwrap();
    assert!(os.same_file(&a, &a.clone()));
    assert!(!os.same_file(&a, &b));

    let other = driver();
    other.create("/tmp/a").unwrap();
    assert!(!os.same_file(&a, &other.stat("/tmp/a").unwrap()));
}
