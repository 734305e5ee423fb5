#![cfg(target_os = "linux")]

use std::{
    fs,
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
    thread,
    time::{Duration, Instant},
};

use pass_trigger::scheduler::PassLog;

use nix::{
    sys::signal::{kill, Signal},
    unistd::Pid,
};

const GEO_TLE: &str = "\
1 90002U 20001A   26001.00000000  .00000000  00000-0  00000-0 0  9993
2 90002   0.0500 100.0000 0002000 100.0000 200.0000  1.00270000  1005
";

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "pass-trigger-shutdown-{}-{}",
        std::process::id(),
        name
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Starts watching with a threshold every elevation passes, so the capture
/// starts on the first step.
fn start_watching(dir: &Path) -> Child {
    let tle = dir.join("geo.tle");
    fs::write(&tle, GEO_TLE).unwrap();

    Command::new(env!("CARGO_BIN_EXE_pass-trigger"))
        .arg("run")
        .arg(&tle)
        .args(["90002", "0", "0", "--min-elevation", "-90"])
        .arg("--output-dir")
        .arg(dir.join("captures"))
        .args(["--capture-cmd", "echo $$ > {output}; sleep 777"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap()
}

/// Process group of the capture, read from the recording it writes.
fn capture_group(dir: &Path) -> i32 {
    let captures = dir.join("captures");
    let deadline = Instant::now() + Duration::from_secs(30);
    while Instant::now() < deadline {
        let recordings = fs::read_dir(&captures)
            .into_iter()
            .flatten()
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "wav"));
        for path in recordings {
            if let Ok(pid) = fs::read_to_string(&path).unwrap_or_default().trim().parse() {
                return pid;
            }
        }
        thread::sleep(Duration::from_millis(50));
    }
    panic!("capture never started");
}

/// Live (non-zombie) processes in process group `pgid`.
fn group_members(pgid: i32) -> Vec<i32> {
    let mut members = Vec::new();
    for entry in fs::read_dir("/proc").unwrap().flatten() {
        let Ok(pid) = entry.file_name().to_string_lossy().parse::<i32>() else {
            continue;
        };
        let Ok(stat) = fs::read_to_string(entry.path().join("stat")) else {
            continue;
        };
        // Fields after the command name: state, ppid, pgrp, ...
        let Some((_, rest)) = stat.rsplit_once(')') else {
            continue;
        };
        let fields: Vec<&str> = rest.split_whitespace().collect();
        if fields.len() > 2 && fields[0] != "Z" && fields[2].parse::<i32>() == Ok(pgid) {
            members.push(pid);
        }
    }
    members
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> std::process::ExitStatus {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait().unwrap() {
            return status;
        }
        if Instant::now() > deadline {
            let _ = child.kill();
            panic!("pass-trigger did not exit after the signal");
        }
        thread::sleep(Duration::from_millis(50));
    }
}

fn assert_group_gone(pgid: i32) {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let members = group_members(pgid);
        if members.is_empty() {
            return;
        }
        if Instant::now() > deadline {
            let _ = nix::sys::signal::killpg(Pid::from_raw(pgid), Signal::SIGKILL);
            panic!("capture processes {:?} outlived pass-trigger", members);
        }
        thread::sleep(Duration::from_millis(50));
    }
}

fn signal_ends_capture(name: &str, signal: Signal) {
    let dir = scratch_dir(name);
    let mut watcher = start_watching(&dir);
    let pgid = capture_group(&dir);
    assert!(!group_members(pgid).is_empty());

    kill(Pid::from_raw(watcher.id() as i32), signal).unwrap();
    let status = wait_with_timeout(&mut watcher, Duration::from_secs(20));
    assert!(status.success(), "exit status {:?}", status);
    assert_group_gone(pgid);

    // The pass log records the early stop.
    let logs: Vec<PathBuf> = fs::read_dir(dir.join("captures"))
        .unwrap()
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "yaml"))
        .collect();
    assert_eq!(logs.len(), 1);
    let pass_log = PassLog::load(&logs[0]).unwrap();
    assert!(pass_log.stopped_at.is_some());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn sigint_stops_the_capture_before_exit() {
    signal_ends_capture("sigint", Signal::SIGINT);
}

#[test]
fn sigterm_stops_the_capture_before_exit() {
    signal_ends_capture("sigterm", Signal::SIGTERM);
}
