// SPDX-License-Identifier: GPL-3.0-or-later
// src/main.rs
//
// Application entry point: parse arguments, open windows and run.

mod app;
mod config;
mod constant;
mod domain;
mod i18n;
mod launcher;

use std::path::PathBuf;

use clap::Parser;
use cosmic::app::Settings;

use crate::app::document::portable::Toolset;
use crate::app::{CuteViewApp, Flags};
use crate::launcher::Launch;

/// Touch friendly viewer for PDF pages and images.
#[derive(Parser, Debug)]
#[command(name = "cuteview", version, about)]
struct Args {
    /// PDF or image files. Images share one window, each PDF gets its own.
    files: Vec<PathBuf>,
}

fn main() -> cosmic::iced::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let requested_languages = i18n_embed::DesktopLanguageRequester::requested_languages();
    i18n::init(&requested_languages);

    let args = Args::parse();
    let tools = Toolset::detect();

    let mut sessions = match launcher::sessions(args.files, &tools) {
        Launch::Run(sessions) => sessions.into_iter(),
        Launch::Exit(code) => std::process::exit(code),
    };
    let Some(files) = sessions.next() else {
        return Ok(());
    };

    for extra in sessions {
        if let Err(e) = launcher::spawn_window(&extra) {
            log::error!("Failed to open a window for {:?}: {:#}", extra, e);
        }
    }

    let settings = Settings::default().transparent(true);
    cosmic::app::run::<CuteViewApp>(settings, Flags::Session { files, tools })
}
