use assert_cmd::prelude::*; // Add methods on commands
use predicates::prelude::*; // Used for writing assertions
use assert_cmd::Command; // Run programs
use tempfile;

type STDRESULT = Result<(),Box<dyn std::error::Error>>;

fn mkdsk(typ: &str,path: &std::path::Path) -> STDRESULT {
    Command::cargo_bin("cbmkit")?
        .arg("mkdsk")
        .arg("-t").arg(typ)
        .arg("-n").arg("cli test")
        .arg("-i").arg("ct")
        .arg("-d").arg(path)
        .assert()
        .success();
    Ok(())
}

#[test]
fn create_and_catalog() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("blank.d64");
    mkdsk("d64",&path)?;
    assert_eq!(std::fs::metadata(&path)?.len(),174848);
    Command::cargo_bin("cbmkit")?
        .arg("catalog")
        .arg("-d").arg(&path)
        .assert()
        .success()
        .stdout(predicate::eq("0 \"CLI TEST        \" CT 2A\n664 BLOCKS FREE.\n"));
    Ok(())
}

#[test]
fn refuse_overwrite() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("blank.d81");
    mkdsk("d81",&path)?;
    Command::cargo_bin("cbmkit")?
        .arg("mkdsk")
        .arg("-t").arg("d81")
        .arg("-n").arg("again")
        .arg("-d").arg(&path)
        .assert()
        .failure();
    Ok(())
}

#[test]
fn put_get_delete() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("files.d71");
    mkdsk("d71",&path)?;
    let dat: Vec<u8> = (0..1000).map(|i| (i % 256) as u8).collect();
    Command::cargo_bin("cbmkit")?
        .arg("put")
        .arg("-f").arg("hello")
        .arg("-t").arg("prg")
        .arg("-d").arg(&path)
        .write_stdin(dat.clone())
        .assert()
        .success();
    let out = Command::cargo_bin("cbmkit")?
        .arg("get")
        .arg("-f").arg("hello")
        .arg("-t").arg("prg")
        .arg("-d").arg(&path)
        .output()?;
    assert!(out.status.success());
    assert_eq!(out.stdout,dat);
    Command::cargo_bin("cbmkit")?
        .arg("put")
        .arg("-f").arg("hello")
        .arg("-t").arg("prg")
        .arg("-d").arg(&path)
        .write_stdin(dat.clone())
        .assert()
        .failure()
        .stderr(predicate::str::contains("63,FILE EXISTS"));
    Command::cargo_bin("cbmkit")?
        .arg("catalog")
        .arg("-d").arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("4    \"HELLO\"            PRG"))
        .stdout(predicate::str::contains("1324 BLOCKS FREE."));
    Command::cargo_bin("cbmkit")?
        .arg("delete")
        .arg("-f").arg("hel*")
        .arg("-d").arg(&path)
        .assert()
        .success();
    Command::cargo_bin("cbmkit")?
        .arg("get")
        .arg("-f").arg("hello")
        .arg("-t").arg("prg")
        .arg("-d").arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("62,FILE NOT FOUND"));
    Ok(())
}

#[test]
fn rename_copy_validate() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("work.d64");
    mkdsk("d64",&path)?;
    Command::cargo_bin("cbmkit")?
        .arg("put")
        .arg("-f").arg("notes")
        .arg("-t").arg("seq")
        .arg("-d").arg(&path)
        .write_stdin("HELLO")
        .assert()
        .success();
    Command::cargo_bin("cbmkit")?
        .arg("rename")
        .arg("-f").arg("notes")
        .arg("-n").arg("memo")
        .arg("-d").arg(&path)
        .assert()
        .success();
    Command::cargo_bin("cbmkit")?
        .arg("copy")
        .arg("-f").arg("memo,memo")
        .arg("-n").arg("twice")
        .arg("-d").arg(&path)
        .assert()
        .success();
    Command::cargo_bin("cbmkit")?
        .arg("validate")
        .arg("-d").arg(&path)
        .assert()
        .success();
    let out = Command::cargo_bin("cbmkit")?
        .arg("get")
        .arg("-f").arg("twice")
        .arg("-t").arg("seq")
        .arg("-d").arg(&path)
        .output()?;
    assert!(out.status.success());
    assert_eq!(out.stdout,b"HELLOHELLO".to_vec());
    Ok(())
}

#[test]
fn sectors() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("sec.d64");
    mkdsk("d64",&path)?;
    let dat = vec![0xaa;256];
    Command::cargo_bin("cbmkit")?
        .arg("put")
        .arg("-f").arg("1,0")
        .arg("-t").arg("sec")
        .arg("-d").arg(&path)
        .write_stdin(dat.clone())
        .assert()
        .success();
    let out = Command::cargo_bin("cbmkit")?
        .arg("get")
        .arg("-f").arg("1,0")
        .arg("-t").arg("sec")
        .arg("-d").arg(&path)
        .output()?;
    assert!(out.status.success());
    assert_eq!(out.stdout,dat);
    Command::cargo_bin("cbmkit")?
        .arg("get")
        .arg("-f").arg("36,0")
        .arg("-t").arg("sec")
        .arg("-d").arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("66,ILLEGAL TRACK OR SECTOR,36,00"));
    Ok(())
}

#[test]
fn raw_command() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("cmd.d64");
    mkdsk("d64",&path)?;
    Command::cargo_bin("cbmkit")?
        .arg("cmd")
        .arg("-c").arg("ui")
        .arg("-d").arg(&path)
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("73,CBM DOS V2.6 1541,00,00"));
    Command::cargo_bin("cbmkit")?
        .arg("cmd")
        .arg("-c").arg("s:nothing")
        .arg("-d").arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("01,FILES SCRATCHED,00,00"));
    Ok(())
}

#[test]
fn stat_and_geometry() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("info.d64");
    mkdsk("d64",&path)?;
    let out = Command::cargo_bin("cbmkit")?
        .arg("stat")
        .arg("-d").arg(&path)
        .output()?;
    let parsed = json::parse(std::str::from_utf8(&out.stdout)?)?;
    assert_eq!(parsed["name"],"CLI TEST");
    assert_eq!(parsed["blocks_free"],664);
    assert_eq!(parsed["image"],"d64");
    assert_eq!(parsed["capacity"],174848);
    assert_eq!(parsed["files"].len(),0);
    let out = Command::cargo_bin("cbmkit")?
        .arg("geometry")
        .arg("-d").arg(&path)
        .output()?;
    let parsed = json::parse(std::str::from_utf8(&out.stdout)?)?;
    assert_eq!(parsed["blocks"],683);
    assert_eq!(parsed["tracks"].len(),35);
    assert_eq!(parsed["tracks"][17]["sectors"],19);
    Ok(())
}

#[test]
fn completions() -> STDRESULT {
    Command::cargo_bin("cbmkit")?
        .arg("completions")
        .arg("-s").arg("bash")
        .assert()
        .success()
        .stdout(predicate::str::contains("cbmkit"));
    Ok(())
}
