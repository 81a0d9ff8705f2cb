// SPDX-License-Identifier: GPL-3.0-or-later
// src/launcher.rs
//
// Startup: pick files, group them into windows and spawn extra windows.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::app::document::is_pdf;
use crate::app::document::portable::Toolset;
use crate::constant::IMAGE_EXTENSIONS;
use crate::fl;

/// What `main` should do after startup checks.
#[derive(Debug, PartialEq, Eq)]
pub enum Launch {
    /// One file list per window. Never empty.
    Run(Vec<Vec<PathBuf>>),
    /// Nothing to show.
    Exit(i32),
}

/// Split the command line into images and PDFs, keeping their order.
pub fn split_files(files: &[PathBuf]) -> (Vec<PathBuf>, Vec<PathBuf>) {
    files.iter().cloned().partition(|path| !is_pdf(path))
}

/// All images share one window; every PDF gets its own.
pub fn group_sessions(images: Vec<PathBuf>, pdfs: Vec<PathBuf>) -> Vec<Vec<PathBuf>> {
    let mut sessions = Vec::with_capacity(pdfs.len() + 1);
    if !images.is_empty() {
        sessions.push(images);
    }
    sessions.extend(pdfs.into_iter().map(|pdf| vec![pdf]));
    sessions
}

/// Windows to open for `files`, and how many PDFs had to be left out.
///
/// PDFs are dropped when poppler is missing; with nothing left the
/// viewer exits with status 1.
pub fn plan_launch(files: &[PathBuf], tools: &Toolset) -> (Launch, usize) {
    let (images, mut pdfs) = split_files(files);
    let mut dropped = 0;
    if !pdfs.is_empty() && !tools.poppler {
        dropped = pdfs.len();
        pdfs.clear();
        if images.is_empty() {
            return (Launch::Exit(1), dropped);
        }
    }
    (Launch::Run(group_sessions(images, pdfs)), dropped)
}

/// Decide which windows to open, asking the user when needed.
pub fn sessions(files: Vec<PathBuf>, tools: &Toolset) -> Launch {
    let files = if files.is_empty() {
        match pick_files() {
            Some(files) => files,
            None => {
                log::info!("open dialog cancelled");
                return Launch::Exit(0);
            }
        }
    } else {
        files
    };

    let (launch, dropped) = plan_launch(&files, tools);
    if dropped > 0 {
        log::error!("pdfinfo not found, skipping {dropped} PDF file(s)");
        show_poppler_missing();
    }
    launch
}

/// Filters of the open dialog, in the order they are offered.
fn dialog_filters() -> Vec<(String, Vec<&'static str>)> {
    let mut supported = vec!["pdf"];
    supported.extend_from_slice(IMAGE_EXTENSIONS);

    vec![
        (fl!("filter-supported"), supported),
        (fl!("filter-images"), IMAGE_EXTENSIONS.to_vec()),
        (fl!("filter-pdf"), vec!["pdf"]),
        (fl!("filter-all"), vec!["*"]),
    ]
}

fn pick_files() -> Option<Vec<PathBuf>> {
    dialog_filters()
        .into_iter()
        .fold(
            rfd::FileDialog::new().set_title(fl!("open-dialog-title")),
            |dialog, (name, extensions)| dialog.add_filter(name, extensions.as_slice()),
        )
        .pick_files()
        .filter(|files| !files.is_empty())
}

fn show_poppler_missing() {
    rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Error)
        .set_title(fl!("poppler-missing-title"))
        .set_description(fl!("poppler-missing-body"))
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}

/// Start another viewer process for one window's files.
///
/// The child is left running on its own.
pub fn spawn_window(files: &[PathBuf]) -> anyhow::Result<()> {
    let exe = std::env::current_exe()?;
    Command::new(exe)
        .arg("--")
        .args(files.iter().map(PathBuf::as_path).map(Path::as_os_str))
        .stdin(Stdio::null())
        .spawn()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn split_keeps_order_and_ignores_case() {
        let (images, pdfs) = split_files(&paths(&["a.png", "b.PDF", "c.jpg", "d.pdf"]));
        assert_eq!(images, paths(&["a.png", "c.jpg"]));
        assert_eq!(pdfs, paths(&["b.PDF", "d.pdf"]));
    }

    #[test]
    fn images_share_a_window_and_pdfs_do_not() {
        let sessions = group_sessions(paths(&["a.png", "b.gif"]), paths(&["x.pdf", "y.pdf"]));
        assert_eq!(
            sessions,
            vec![paths(&["a.png", "b.gif"]), paths(&["x.pdf"]), paths(&["y.pdf"])]
        );
    }

    #[test]
    fn pdfs_only_open_one_window_each() {
        let sessions = group_sessions(Vec::new(), paths(&["x.pdf"]));
        assert_eq!(sessions, vec![paths(&["x.pdf"])]);
    }

    const NO_POPPLER: Toolset = Toolset {
        poppler: false,
        mutool: false,
    };

    #[test]
    fn pdfs_without_poppler_fall_back_to_images() {
        let (launch, dropped) = plan_launch(&paths(&["a.pdf", "b.png", "c.PDF"]), &NO_POPPLER);

        assert_eq!(launch, Launch::Run(vec![paths(&["b.png"])]));
        assert_eq!(dropped, 2);
    }

    #[test]
    fn only_pdfs_without_poppler_exit_with_failure() {
        let (launch, dropped) = plan_launch(&paths(&["a.pdf"]), &NO_POPPLER);

        assert_eq!(launch, Launch::Exit(1));
        assert_eq!(dropped, 1);
    }

    #[test]
    fn pdfs_with_poppler_are_kept() {
        let tools = Toolset {
            poppler: true,
            ..NO_POPPLER
        };
        let (launch, dropped) = plan_launch(&paths(&["a.pdf", "b.png"]), &tools);

        assert_eq!(
            launch,
            Launch::Run(vec![paths(&["b.png"]), paths(&["a.pdf"])])
        );
        assert_eq!(dropped, 0);
    }

    #[test]
    fn open_dialog_offers_every_filter() {
        let filters = dialog_filters();
        let names: Vec<&str> = filters.iter().map(|(name, _)| name.as_str()).collect();

        assert_eq!(
            names,
            ["All Supported Files", "Image Files", "PDF Files", "All Files"]
        );
        assert_eq!(filters[0].1.len(), IMAGE_EXTENSIONS.len() + 1);
        assert_eq!(filters[3].1, vec!["*"]);
    }

    #[test]
    fn poppler_dialog_names_the_package() {
        assert_eq!(fl!("poppler-missing-title"), "poppler-tools not found");
        assert_eq!(
            fl!("poppler-missing-body"),
            "The package 'poppler-tools' is required for viewing PDF files, but it is not found."
        );
    }

    #[test]
    fn images_alone_never_ask_about_poppler() {
        let launch = sessions(paths(&["a.png"]), &NO_POPPLER);
        assert_eq!(launch, Launch::Run(vec![paths(&["a.png"])]));
    }
}
