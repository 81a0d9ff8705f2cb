// SPDX-License-Identifier: GPL-3.0-or-later
// src/app/document/portable.rs
//
// Portable documents (PDF) rendered by external command-line tools.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, bail};

/// Find an executable on `PATH`.
pub fn which(program: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

/// External tools available on this system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toolset {
    /// `pdfinfo` and `pdftoppm` (poppler-utils).
    pub poppler: bool,
    /// `mutool` (MuPDF).
    pub mutool: bool,
}

impl Toolset {
    pub fn detect() -> Self {
        let tools = Self {
            poppler: which("pdfinfo").is_some(),
            mutool: which("mutool").is_some(),
        };
        log::info!("detected tools: {tools:?}");
        tools
    }

    /// Preferred page renderer.
    pub fn backend(&self) -> RenderBackend {
        if self.mutool {
            RenderBackend::Mutool
        } else {
            RenderBackend::Pdftoppm
        }
    }
}

/// One page to rasterize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub pdf: PathBuf,
    /// Page index (0-based).
    pub page: usize,
    /// Long side of the output in pixels.
    pub longdim: u32,
    pub invert: bool,
    /// Final file name, including the extension.
    pub outfile: PathBuf,
}

impl RenderRequest {
    /// Output name without extension, for tools that append their own.
    pub fn outfile_base(&self) -> PathBuf {
        self.outfile.with_extension("")
    }

    /// The same request writing to `<page>.part.<ext>`, so a render in
    /// progress never shows up under the final name.
    pub fn staged(&self) -> RenderRequest {
        let extension = self
            .outfile
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();
        RenderRequest {
            outfile: self.outfile.with_extension(format!("part.{extension}")),
            ..self.clone()
        }
    }
}

/// Something that turns a [`RenderRequest`] into a bitmap file.
pub trait PageRenderer {
    /// File extension the renderer produces.
    fn extension(&self, invert: bool) -> &'static str;

    /// Whether inverted requests come out inverted (not just grayscale).
    fn inverts(&self) -> bool;

    /// Render synchronously.
    fn render(&self, request: &RenderRequest) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderBackend {
    /// `mutool draw`: inverts itself and writes to the exact name given.
    Mutool,
    /// `pdftoppm`: cannot invert, renders gray instead and picks the extension.
    Pdftoppm,
}

impl RenderBackend {
    pub fn args(&self, request: &RenderRequest) -> Vec<OsString> {
        let page = (request.page + 1).to_string();
        let longdim = request.longdim.to_string();
        let mut args: Vec<OsString> = Vec::new();
        match self {
            RenderBackend::Mutool => {
                args.extend(
                    ["draw", "-w", longdim.as_str(), "-h", longdim.as_str()].map(OsString::from),
                );
                if request.invert {
                    args.extend(["-I", "-c", "g"].map(OsString::from));
                }
                args.push("-o".into());
                args.push(request.outfile.clone().into_os_string());
                args.push(request.pdf.clone().into_os_string());
                args.push(page.into());
            }
            RenderBackend::Pdftoppm => {
                args.extend(
                    ["-singlefile", "-f", page.as_str(), "-scale-to", longdim.as_str()]
                        .map(OsString::from),
                );
                if request.invert {
                    args.push("-gray".into());
                }
                args.push(request.pdf.clone().into_os_string());
                args.push(request.outfile_base().into_os_string());
            }
        }
        args
    }

    pub fn program(&self) -> &'static str {
        match self {
            RenderBackend::Mutool => "mutool",
            RenderBackend::Pdftoppm => "pdftoppm",
        }
    }

    /// Command line for `request`, with output streams discarded.
    pub fn command(&self, request: &RenderRequest) -> Command {
        let mut command = Command::new(self.program());
        command
            .args(self.args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        command
    }
}

impl PageRenderer for RenderBackend {
    fn extension(&self, invert: bool) -> &'static str {
        if invert && *self == RenderBackend::Pdftoppm {
            "pgm"
        } else {
            "ppm"
        }
    }

    fn inverts(&self) -> bool {
        *self == RenderBackend::Mutool
    }

    fn render(&self, request: &RenderRequest) -> anyhow::Result<()> {
        let status = self
            .command(request)
            .status()
            .with_context(|| format!("Failed to run {}", self.program()))?;
        if !status.success() {
            bail!(
                "{} failed on page {} of {}: {}",
                self.program(),
                request.page + 1,
                request.pdf.display(),
                status
            );
        }
        Ok(())
    }
}

/// Render on the tokio runtime without blocking the UI thread.
///
/// The tool writes to a staging file that is renamed into place once it
/// exits successfully.
pub async fn render_async(backend: RenderBackend, request: RenderRequest) -> anyhow::Result<()> {
    let staged = request.staged();
    let status = tokio::process::Command::from(backend.command(&staged))
        .status()
        .await
        .with_context(|| format!("Failed to run {}", backend.program()))?;
    if !status.success() {
        bail!(
            "{} failed on page {}: {}",
            backend.program(),
            request.page + 1,
            status
        );
    }
    tokio::fs::rename(&staged.outfile, &request.outfile)
        .await
        .with_context(|| format!("Failed to move {}", staged.outfile.display()))?;
    Ok(())
}

/// Title and page count reported by `pdfinfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfInfo {
    pub title: String,
    pub pages: usize,
}

/// Query `pdfinfo` for the document title and page count.
pub fn pdf_info(path: &Path) -> anyhow::Result<PdfInfo> {
    let output = Command::new("pdfinfo")
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .context("Failed to run pdfinfo")?;
    let info = parse_pdf_info(&output.stdout, path);
    if info.pages == 0 {
        bail!("{} has no pages", path.display());
    }
    Ok(info)
}

/// Parse `pdfinfo` output.
///
/// Without a `Title:` line the file name up to its first dot is used.
pub fn parse_pdf_info(output: &[u8], path: &Path) -> PdfInfo {
    let mut title = None;
    let mut pages = 0;
    for line in String::from_utf8_lossy(output).lines() {
        if let Some(rest) = line.strip_prefix("Title:") {
            let rest = rest.trim_start();
            if !rest.is_empty() {
                title = Some(rest.to_string());
            }
        } else if let Some(rest) = line.strip_prefix("Pages:") {
            pages = rest
                .split_whitespace()
                .next()
                .and_then(|n| n.parse().ok())
                .unwrap_or(0);
        }
    }
    let title = title.unwrap_or_else(|| {
        path.file_name()
            .map(|name| name.to_string_lossy())
            .and_then(|name| name.split('.').next().map(str::to_string))
            .unwrap_or_default()
    });
    PdfInfo { title, pages }
}
