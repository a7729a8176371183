//! `trompet --check`.

use std::process::{Command, Stdio};

mod common;
use common::relay::binary;

fn check(name: &str, body: &str) -> anyhow::Result<bool> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join(name);
    std::fs::write(&path, body)?;
    let status = Command::new(binary())
        .arg("--check")
        .arg(&path)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()?;
    Ok(status.success())
}

#[test]
fn valid_toml_passes() -> anyhow::Result<()> {
    let ok = check(
        "trompet.toml",
        r##"
[networks.libera]
servers = [["irc.libera.chat", 6697]]
nick = "trompet"
tls = true

[projects.widget]
token = "widget"
channels = { libera = ["#widget"] }
github = { message = "$revision" }
"##,
    )?;
    assert!(ok);
    Ok(())
}

#[test]
fn valid_json_passes() -> anyhow::Result<()> {
    let ok = check(
        "trompet.json",
        r##"{
  "networks": {"libera": {"servers": [["irc.libera.chat", 6667]], "nick": "trompet",
                          "nickserv-password": "secret"}},
  "projects": {"widget": {"token": "widget", "channels": {"libera": ["#widget"]},
                          "github": {"message": "$revision",
                                     "max commit messages per push": 3}}}
}"##,
    )?;
    assert!(ok);
    Ok(())
}

#[test]
fn missing_token_fails() -> anyhow::Result<()> {
    let ok = check(
        "trompet.toml",
        "[projects.widget]\ngithub = { message = \"$revision\" }\n",
    )?;
    assert!(!ok);
    Ok(())
}

#[test]
fn unknown_network_fails() -> anyhow::Result<()> {
    let ok = check(
        "trompet.toml",
        "[projects.widget]\ntoken = \"w\"\nchannels = { nowhere = [\"#w\"] }\n",
    )?;
    assert!(!ok);
    Ok(())
}

#[test]
fn unreadable_file_fails() -> anyhow::Result<()> {
    let status = Command::new(binary())
        .args(["--check", "/nonexistent/trompet.toml"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()?;
    assert!(!status.success());
    Ok(())
}
