use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::fs::MetadataExt;

use anyhow::Result;
use tempfile::tempdir;

mod common;
use common::*;

/// The working directory every scenario below starts from:
/// a.txt ("hello") and b/c.txt ("world").
fn populate(work: &std::path::Path) -> Result<()> {
    fs::write(work.join("a.txt"), "hello")?;
    fs::create_dir(work.join("b"))?;
    fs::write(work.join("b/c.txt"), "world")?;
    Ok(())
}

#[test]
fn base_only() -> Result<()> {
    let store = tempdir()?;
    let work = tempdir()?;
    let out = tempdir()?;
    populate(work.path())?;

    cli_run(store.path())?.arg("init").assert().success();
    cli_run(store.path())?
        .arg("commit")
        .arg(work.path())
        .assert()
        .success();

    let restored = out.path().join("r0");
    cli_run(store.path())?
        .args(["restore", "0", "-o"])
        .arg(&restored)
        .assert()
        .success();

    assert_dirs_match(work.path(), &restored);
    Ok(())
}

#[test]
fn single_delta() -> Result<()> {
    let store = tempdir()?;
    let work = tempdir()?;
    let out = tempdir()?;
    populate(work.path())?;

    cli_run(store.path())?.arg("init").assert().success();
    cli_run(store.path())?
        .arg("commit")
        .arg(work.path())
        .assert()
        .success();

    fs::write(work.path().join("a.txt"), "hi")?;
    fs::write(work.path().join("new.txt"), "ok")?;
    cli_run(store.path())?
        .arg("commit")
        .arg(work.path())
        .assert()
        .success();

    let r1 = out.path().join("r1");
    cli_run(store.path())?
        .args(["restore", "1", "-o"])
        .arg(&r1)
        .assert()
        .success();
    assert_eq!(fs::read_to_string(r1.join("a.txt"))?, "hi");
    assert_eq!(fs::read_to_string(r1.join("new.txt"))?, "ok");
    assert_eq!(fs::read_to_string(r1.join("b/c.txt"))?, "world");
    assert_dirs_match(work.path(), &r1);

    // The base still restores to its original state.
    let r0 = out.path().join("r0");
    cli_run(store.path())?
        .args(["restore", "0", "-o"])
        .arg(&r0)
        .assert()
        .success();
    assert_eq!(fs::read_to_string(r0.join("a.txt"))?, "hello");
    assert!(!r0.join("new.txt").exists());
    Ok(())
}

#[test]
fn deletion() -> Result<()> {
    let store = tempdir()?;
    let work = tempdir()?;
    let out = tempdir()?;
    populate(work.path())?;

    cli_run(store.path())?.arg("init").assert().success();
    cli_run(store.path())?
        .arg("commit")
        .arg(work.path())
        .assert()
        .success();

    fs::write(work.path().join("new.txt"), "ok")?;
    cli_run(store.path())?
        .arg("commit")
        .arg(work.path())
        .assert()
        .success();

    fs::remove_file(work.path().join("b/c.txt"))?;
    cli_run(store.path())?
        .arg("commit")
        .arg(work.path())
        .assert()
        .success();

    let r2 = out.path().join("r2");
    cli_run(store.path())?
        .args(["restore", "2", "-o"])
        .arg(&r2)
        .assert()
        .success();
    assert!(r2.join("b").is_dir());
    assert!(!r2.join("b/c.txt").exists());
    assert_dirs_match(work.path(), &r2);
    Ok(())
}

#[test]
fn chain_replay() -> Result<()> {
    let store = tempdir()?;
    let work = tempdir()?;
    let out = tempdir()?;
    fs::write(work.path().join("f0.txt"), "contents")?;

    cli_run(store.path())?.arg("init").assert().success();
    cli_run(store.path())?
        .arg("commit")
        .arg(work.path())
        .assert()
        .success();

    // Each revision renames the file once more.
    for step in 1..=3 {
        fs::rename(
            work.path().join(format!("f{}.txt", step - 1)),
            work.path().join(format!("f{step}.txt")),
        )?;
        cli_run(store.path())?
            .arg("commit")
            .arg(work.path())
            .assert()
            .success();
    }

    let r3 = out.path().join("r3");
    cli_run(store.path())?
        .args(["restore", "3", "-o"])
        .arg(&r3)
        .assert()
        .success();
    assert!(r3.join("f3.txt").exists());
    assert!(!r3.join("f0.txt").exists());
    assert_dirs_match(work.path(), &r3);
    Ok(())
}

#[test]
fn compression_parity() -> Result<()> {
    let plain_store = tempdir()?;
    let packed_store = tempdir()?;
    let work = tempdir()?;
    let out = tempdir()?;
    populate(work.path())?;
    // Something long enough that deflate actually shrinks it.
    fs::write(work.path().join("big.txt"), "zzzz".repeat(4096))?;

    cli_run(plain_store.path())?.arg("init").assert().success();
    cli_run(packed_store.path())?
        .args(["init", "--compress"])
        .assert()
        .success();

    for store in [plain_store.path(), packed_store.path()] {
        cli_run(store)?.arg("commit").arg(work.path()).assert().success();
    }

    let from_plain = out.path().join("plain");
    let from_packed = out.path().join("packed");
    cli_run(plain_store.path())?
        .args(["restore", "0", "-o"])
        .arg(&from_plain)
        .assert()
        .success();
    cli_run(packed_store.path())?
        .args(["restore", "0", "-o"])
        .arg(&from_packed)
        .assert()
        .success();

    assert_dirs_match(work.path(), &from_plain);
    assert_dirs_match(work.path(), &from_packed);
    assert_dirs_match(&from_plain, &from_packed);
    Ok(())
}

#[test]
fn modes_and_mtimes_survive() -> Result<()> {
    let store = tempdir()?;
    let work = tempdir()?;
    let out = tempdir()?;
    populate(work.path())?;
    fs::set_permissions(work.path().join("a.txt"), fs::Permissions::from_mode(0o750))?;
    let before = fs::metadata(work.path().join("a.txt"))?;

    cli_run(store.path())?.arg("init").assert().success();
    cli_run(store.path())?
        .arg("commit")
        .arg(work.path())
        .assert()
        .success();

    let restored = out.path().join("r0");
    cli_run(store.path())?
        .args(["restore", "0", "-o"])
        .arg(&restored)
        .assert()
        .success();

    let after = fs::metadata(restored.join("a.txt"))?;
    assert_eq!(after.permissions().mode() & 0o7777, 0o750);
    assert_eq!(after.mtime(), before.mtime());
    assert_eq!(after.mtime_nsec(), before.mtime_nsec());
    Ok(())
}

#[test]
fn symlinks_are_skipped_by_default() -> Result<()> {
    let store = tempdir()?;
    let work = tempdir()?;
    let out = tempdir()?;
    populate(work.path())?;
    std::os::unix::fs::symlink("a.txt", work.path().join("link"))?;

    cli_run(store.path())?.arg("init").assert().success();
    cli_run(store.path())?
        .arg("commit")
        .arg(work.path())
        .assert()
        .success();

    let restored = out.path().join("r0");
    cli_run(store.path())?
        .args(["restore", "0", "-o"])
        .arg(&restored)
        .assert()
        .success();

    assert!(restored.join("a.txt").exists());
    assert!(!restored.join("link").exists());
    Ok(())
}

#[test]
fn symlinks_survive_when_kept() -> Result<()> {
    let store = tempdir()?;
    let work = tempdir()?;
    let out = tempdir()?;
    populate(work.path())?;
    std::os::unix::fs::symlink("a.txt", work.path().join("link"))?;

    cli_run(store.path())?
        .args(["init", "--keep-symlinks"])
        .assert()
        .success();
    cli_run(store.path())?
        .arg("commit")
        .arg(work.path())
        .assert()
        .success();

    let restored = out.path().join("r0");
    cli_run(store.path())?
        .args(["restore", "0", "-o"])
        .arg(&restored)
        .assert()
        .success();

    assert_eq!(
        fs::read_link(restored.join("link"))?,
        std::path::PathBuf::from("a.txt")
    );
    assert_dirs_match(work.path(), &restored);
    Ok(())
}
