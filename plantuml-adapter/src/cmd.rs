//! Command-line argument builder for PlantUML invocations.

use crate::types::{ImageFormat, Launcher};
use std::ffi::{OsStr, OsString};

/// Builds the argument list for rendering `source_file`.
///
/// The source is passed by file name only; the subprocess runs with the
/// working directory set to the directory that holds it.
#[must_use]
pub fn build_args(launcher: &Launcher, source_file: &OsStr, format: ImageFormat) -> Vec<OsString> {
    let mut args = launcher_args(launcher);

    args.push(OsString::from("-charset"));
    args.push(OsString::from("UTF-8"));
    args.push(OsString::from("-stdrpt:1"));

    if let Some(flag) = format.flag() {
        args.push(OsString::from(flag));
    }

    args.push(source_file.to_os_string());

    args
}

/// Builds the argument list for a `-version` check.
#[must_use]
pub fn build_version_args(launcher: &Launcher) -> Vec<OsString> {
    let mut args = launcher_args(launcher);
    args.push(OsString::from("-version"));
    args
}

fn launcher_args(launcher: &Launcher) -> Vec<OsString> {
    match launcher {
        Launcher::Jar { jar, .. } => vec![
            OsString::from("-Djava.awt.headless=true"),
            OsString::from("-jar"),
            jar.as_os_str().to_os_string(),
        ],
        Launcher::Command { leading_args, .. } => leading_args.clone(),
    }
}
