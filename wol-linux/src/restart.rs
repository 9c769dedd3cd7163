//! Crash-only restart: replace the process with a fresh copy of itself.

use std::io;
use std::process::Command;

/// Exit status when re-exec is not possible; the unit restarts on any exit.
pub const EXIT_RESTART: i32 = 75;

/// Exit status for a rejected configuration; the unit does not restart on it.
pub const EXIT_CONFIG: i32 = 78;

/// Same executable, same arguments.
fn relaunch_command() -> io::Result<Command> {
    let exe = std::env::current_exe()?;
    let mut cmd = Command::new(exe);
    cmd.args(std::env::args_os().skip(1));
    Ok(cmd)
}

/// Full restart. Nothing survives: counters, sockets and the core are rebuilt from
/// configuration by the new process.
pub fn restart() -> ! {
    tracing::warn!("restarting");
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        match relaunch_command() {
            Ok(mut cmd) => {
                let err = cmd.exec();
                tracing::error!("re-exec failed: {}", err);
            }
            Err(e) => tracing::error!("cannot locate own executable: {}", e),
        }
    }
    #[cfg(not(unix))]
    {
        if let Err(e) = relaunch_command().and_then(|mut cmd| cmd.spawn()) {
            tracing::error!("relaunch failed: {}", e);
        }
    }
    std::process::exit(EXIT_RESTART)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relaunches_own_executable_with_same_arguments() {
        let cmd = relaunch_command().unwrap();
        assert_eq!(
            std::path::Path::new(cmd.get_program()),
            std::env::current_exe().unwrap()
        );
        let args: Vec<_> = cmd.get_args().collect();
        let expected: Vec<_> = std::env::args_os().skip(1).collect();
        assert_eq!(args, expected.iter().map(|a| a.as_os_str()).collect::<Vec<_>>());
    }
}
