use std::os::unix::process::CommandExt;
use std::process::Command;

use nix::sys::signal::kill;
use nix::unistd::Pid;

pub fn configure_detached(cmd: &mut Command) {
    // A fresh process group keeps the IDE alive when the terminal that ran
    // `juggler open` sends SIGHUP/SIGINT to its foreground group.
    cmd.process_group(0);
}

pub fn is_process_alive(pid: u32) -> bool {
    kill(Pid::from_raw(pid as i32), None).is_ok()
}
