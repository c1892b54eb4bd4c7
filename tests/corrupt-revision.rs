use std::fs;

use anyhow::Result;
use predicates::prelude::*;
use tempfile::tempdir;

mod common;
use common::*;

#[test]
fn truncated_revision_aborts_everything_downstream() -> Result<()> {
    let store = tempdir()?;
    let work = tempdir()?;
    let out = tempdir()?;
    fs::write(work.path().join("a.txt"), "hello")?;

    cli_run(store.path())?.arg("init").assert().success();

    // Three revisions, then chop revision_1 off mid-payload.
    for contents in ["hello", "hi", "hey"] {
        fs::write(work.path().join("a.txt"), contents)?;
        cli_run(store.path())?
            .arg("commit")
            .arg(work.path())
            .assert()
            .success();
    }

    let wounded = store.path().join("revision_1");
    let len = fs::metadata(&wounded)?.len();
    let fh = fs::OpenOptions::new().write(true).open(&wounded)?;
    fh.set_len(len / 2)?;
    drop(fh);

    // Restoring the truncated revision fails...
    cli_run(store.path())?
        .args(["restore", "1", "-o"])
        .arg(out.path().join("r1"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("corrupt revision"));

    // ...and so does anything that has to replay through it.
    cli_run(store.path())?
        .args(["restore", "2", "-o"])
        .arg(out.path().join("r2"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("corrupt revision"));

    cli_run(store.path())?
        .arg("revisions")
        .assert()
        .failure()
        .stderr(predicate::str::contains("corrupt revision"));

    // The untouched base still restores.
    cli_run(store.path())?
        .args(["restore", "0", "-o"])
        .arg(out.path().join("r0"))
        .assert()
        .success();
    Ok(())
}

#[test]
fn tampered_delta_breaks_the_hash_chain() -> Result<()> {
    let store = tempdir()?;
    let work = tempdir()?;
    let out = tempdir()?;
    fs::write(work.path().join("a.txt"), "hello")?;

    cli_run(store.path())?.arg("init").assert().success();
    cli_run(store.path())?
        .arg("commit")
        .arg(work.path())
        .assert()
        .success();

    fs::write(work.path().join("a.txt"), "hi")?;
    cli_run(store.path())?
        .arg("commit")
        .arg(work.path())
        .assert()
        .success();

    fs::write(work.path().join("a.txt"), "hey")?;
    cli_run(store.path())?
        .arg("commit")
        .arg(work.path())
        .assert()
        .success();

    // Swap revisions 1 and 2. Each file still parses, but the recorded
    // hashes no longer match what replay recomputes.
    let one = store.path().join("revision_1");
    let two = store.path().join("revision_2");
    let stash = store.path().join("stash");
    fs::rename(&one, &stash)?;
    fs::rename(&two, &one)?;
    fs::rename(&stash, &two)?;

    cli_run(store.path())?
        .args(["restore", "2", "-o"])
        .arg(out.path().join("r2"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("corrupt revision"));
    Ok(())
}
