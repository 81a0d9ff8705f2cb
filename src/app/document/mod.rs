// SPDX-License-Identifier: GPL-3.0-or-later
// src/app/document/mod.rs
//
// Document module root: the page model shared by PDF and image sessions.

pub mod cache;
pub mod history;
pub mod portable;
pub mod raster;
#[cfg(feature = "vector")]
pub mod vector;
pub mod watcher;

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use image::DynamicImage;

use self::cache::{CachedPage, PageCache};
use self::history::{History, HistoryEntry, ViewPrefs};
use self::portable::{PageRenderer, PdfInfo, RenderBackend, RenderRequest, Toolset};
use crate::config::AppConfig;
use crate::constant::{MAX_OPACITY, MIN_OPACITY, VECTOR_EXTENSIONS};

/// Re-export the image handle type for use by the views.
pub type ImageHandle = cosmic::widget::image::Handle;

/// Create an iced image handle from a DynamicImage.
pub fn create_image_handle(img: &DynamicImage) -> ImageHandle {
    let (w, h) = (img.width(), img.height());
    let rgba = img.to_rgba8();
    ImageHandle::from_rgba(w, h, rgba.into_raw())
}

/// High-level classification of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// A single PDF, one page at a time.
    Pdf,
    /// A list of image files.
    Images,
}

/// Whether `path` names a PDF file.
pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

fn is_vector(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| VECTOR_EXTENSIONS.iter().any(|v| ext.eq_ignore_ascii_case(v)))
}

/// Decode an image file for display, rasterizing vector images at `longdim`.
#[cfg_attr(not(feature = "vector"), allow(unused_variables))]
pub fn load_image(path: &Path, longdim: u32) -> anyhow::Result<DynamicImage> {
    if is_vector(path) {
        #[cfg(feature = "vector")]
        return vector::load(path, longdim);
        #[cfg(not(feature = "vector"))]
        anyhow::bail!("{} is a vector image; SVG support is not built in", path.display());
    }
    raster::load(path)
}

/// Settings the page model takes from the configuration.
#[derive(Debug, Clone, Copy)]
pub struct PageSettings {
    pub defaults: ViewPrefs,
    pub opacity_step: u8,
    pub keep_before: usize,
    pub keep_after: usize,
}

impl From<&AppConfig> for PageSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            defaults: ViewPrefs {
                page: 0,
                invert: config.default_invert,
                trim: config.default_trim,
                opacity: config.default_opacity,
            },
            opacity_step: config.opacity_step,
            keep_before: config.cache_keep_before,
            keep_after: config.cache_keep_after,
        }
    }
}

/// A PDF rendered page by page through an external tool.
#[derive(Debug)]
struct PdfSource {
    path: PathBuf,
    title: String,
    backend: RenderBackend,
    cache: PageCache,
    modified: Option<SystemTime>,
    history_path: Option<PathBuf>,
    history_key: String,
}

#[derive(Debug)]
enum Source {
    Pdf(PdfSource),
    Images(Vec<PathBuf>),
}

/// Background render of the page the reader is likely to open next.
#[derive(Debug, Clone)]
pub struct PrefetchJob {
    pub backend: RenderBackend,
    pub request: RenderRequest,
}

/// Page model: the current position in a document, its view preferences,
/// the render cache and the history glue.
#[derive(Debug)]
pub struct Pages {
    source: Source,
    page: usize,
    to_prefetch: usize,
    length: usize,
    title: String,
    invert: bool,
    trim: bool,
    opacity: u8,
    settings: PageSettings,
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

impl Pages {
    /// Open a session.
    ///
    /// A single PDF becomes a PDF session and picks up its history; anything
    /// else is a list of images.
    pub fn open(
        files: &[PathBuf],
        tools: Toolset,
        config: &AppConfig,
        history_path: Option<PathBuf>,
    ) -> anyhow::Result<Self> {
        let settings = PageSettings::from(config);
        match files {
            [] => Err(anyhow::anyhow!("Nothing to open")),
            [path] if is_pdf(path) => Self::open_pdf(path, tools, settings, history_path),
            _ => Ok(Self::open_images(files.to_vec(), settings)),
        }
    }

    fn open_pdf(
        path: &Path,
        tools: Toolset,
        settings: PageSettings,
        history_path: Option<PathBuf>,
    ) -> anyhow::Result<Self> {
        let info = portable::pdf_info(path)?;
        Self::open_pdf_with(
            path,
            info,
            tools.backend(),
            PageCache::default_dir(path),
            settings,
            history_path,
        )
    }

    /// Open a PDF whose `pdfinfo` output is already known.
    fn open_pdf_with(
        path: &Path,
        info: PdfInfo,
        backend: RenderBackend,
        cache_dir: PathBuf,
        settings: PageSettings,
        history_path: Option<PathBuf>,
    ) -> anyhow::Result<Self> {
        let defaults = settings.defaults;
        let cache = PageCache::in_dir(cache_dir, path, info.pages, defaults.invert)?
            .with_window(settings.keep_before, settings.keep_after);

        let mut pages = Self {
            source: Source::Pdf(PdfSource {
                path: path.to_path_buf(),
                title: info.title,
                backend,
                cache,
                modified: modified(path),
                history_key: history::history_key(path),
                history_path,
            }),
            page: 0,
            to_prefetch: 1 % info.pages,
            length: info.pages,
            title: String::new(),
            invert: defaults.invert,
            trim: defaults.trim,
            opacity: defaults.opacity,
            settings,
        };
        pages.read_history();
        pages.title = pages.make_title();
        log::info!("opened {} ({} pages)", path.display(), pages.length);
        Ok(pages)
    }

    fn open_images(files: Vec<PathBuf>, settings: PageSettings) -> Self {
        let length = files.len();
        let mut pages = Self {
            source: Source::Images(files),
            page: 0,
            to_prefetch: 1 % length,
            length,
            title: String::new(),
            invert: false,
            trim: false,
            opacity: MAX_OPACITY,
            settings,
        };
        pages.title = pages.make_title();
        pages
    }

    pub fn mode(&self) -> Mode {
        match self.source {
            Source::Pdf(_) => Mode::Pdf,
            Source::Images(_) => Mode::Images,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    #[cfg(test)]
    pub fn page(&self) -> usize {
        self.page
    }

    pub fn invert(&self) -> bool {
        self.invert
    }

    pub fn trim(&self) -> bool {
        self.trim
    }

    pub fn opacity(&self) -> u8 {
        self.opacity
    }

    /// The watched PDF, if this is a PDF session.
    pub fn pdf_path(&self) -> Option<&Path> {
        match &self.source {
            Source::Pdf(pdf) => Some(&pdf.path),
            Source::Images(_) => None,
        }
    }

    pub fn prefs(&self) -> ViewPrefs {
        ViewPrefs {
            page: self.page,
            invert: self.invert,
            trim: self.trim,
            opacity: self.opacity,
        }
    }

    fn make_title(&self) -> String {
        let base = match &self.source {
            Source::Pdf(pdf) => pdf.title.clone(),
            Source::Images(files) => files[self.page]
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        format!("{} ({}/{})", base, self.page + 1, self.length)
    }

    fn load(
        &mut self,
        page: i64,
        to_prefetch: i64,
        longdim: u32,
    ) -> anyhow::Result<Option<DynamicImage>> {
        let length = self.length as i64;
        self.page = page.rem_euclid(length) as usize;
        self.to_prefetch = to_prefetch.rem_euclid(length) as usize;
        self.title = self.make_title();
        self.fetch(longdim)
    }

    /// Bitmap of the current page, at least `longdim` pixels on its long side.
    ///
    /// `None` means the page is still rendering in the background; it can be
    /// fetched once [`Pages::finish_prefetch`] reports it.
    pub fn get_page(&mut self, longdim: u32) -> anyhow::Result<Option<DynamicImage>> {
        self.load(self.page as i64, self.to_prefetch as i64, longdim)
    }

    pub fn next(&mut self, longdim: u32) -> anyhow::Result<Option<DynamicImage>> {
        let page = self.page as i64;
        self.load(page + 1, page + 2, longdim)
    }

    pub fn prev(&mut self, longdim: u32) -> anyhow::Result<Option<DynamicImage>> {
        let page = self.page as i64;
        self.load(page - 1, page - 2, longdim)
    }

    fn fetch(&mut self, longdim: u32) -> anyhow::Result<Option<DynamicImage>> {
        let (path, pixel_invert) = match &mut self.source {
            Source::Pdf(pdf) => {
                let cached =
                    pdf.cache
                        .ensure(&pdf.backend, self.page, longdim, self.invert, self.page)?;
                let CachedPage::Ready(path) = cached else {
                    log::debug!("page {} is still rendering", self.page + 1);
                    return Ok(None);
                };
                (path, self.invert && !pdf.backend.inverts())
            }
            Source::Images(files) => (files[self.page].clone(), self.invert),
        };

        let mut image = load_image(&path, longdim)
            .map_err(|e| anyhow::anyhow!("Cannot load {}: {}", path.display(), e))?;
        if pixel_invert {
            image.invert();
        }
        Ok(Some(image))
    }

    /// Plan a background render of the page in the direction of travel, at
    /// the size the current page was rendered at.
    pub fn prefetch_job(&mut self) -> Option<PrefetchJob> {
        let Source::Pdf(pdf) = &mut self.source else {
            return None;
        };
        let longdim = pdf.cache.recorded_longdim(self.page);
        if longdim == 0 {
            return None;
        }
        let request =
            pdf.cache
                .begin_background(&pdf.backend, self.to_prefetch, longdim, self.invert);
        pdf.cache.evict(self.page);
        request.map(|request| PrefetchJob {
            backend: pdf.backend,
            request,
        })
    }

    /// A prefetch of `page` ended. Returns `true` when that page is the one
    /// on screen and has to be fetched again.
    pub fn finish_prefetch(&mut self, page: usize) -> bool {
        let Source::Pdf(pdf) = &mut self.source else {
            return false;
        };
        pdf.cache.finish_background(page);
        page == self.page
    }

    pub fn less_opaque(&mut self) {
        if self.mode() == Mode::Pdf {
            self.opacity = self
                .opacity
                .saturating_sub(self.settings.opacity_step)
                .max(MIN_OPACITY);
        }
    }

    pub fn more_opaque(&mut self) {
        if self.mode() == Mode::Pdf {
            self.opacity = self
                .opacity
                .saturating_add(self.settings.opacity_step)
                .min(MAX_OPACITY);
        }
    }

    pub fn toggle_invert(&mut self) {
        self.invert = !self.invert;
    }

    pub fn toggle_trim(&mut self) {
        self.trim = !self.trim;
    }

    fn read_history(&mut self) {
        let Source::Pdf(pdf) = &self.source else {
            return;
        };
        let history = History::load_or_ephemeral(pdf.history_path.as_deref());
        let Some(entry) = history.get(&pdf.history_key) else {
            return;
        };
        let mut prefs = self.prefs();
        entry.apply(&mut prefs, self.length);
        log::debug!("restored {prefs:?} for {}", pdf.history_key);

        self.page = prefs.page;
        self.invert = prefs.invert;
        self.trim = prefs.trim;
        self.opacity = prefs.opacity;
        self.to_prefetch = (self.page + 1) % self.length;
    }

    /// Store the view state of a PDF session.
    ///
    /// The history file is read again first, so other windows' entries
    /// survive, and only written when this document's entry changed.
    pub fn write_history(&self) {
        let Source::Pdf(pdf) = &self.source else {
            return;
        };
        let mut history = History::load_or_ephemeral(pdf.history_path.as_deref());
        let entry = HistoryEntry::from_prefs(&self.prefs(), &self.settings.defaults);
        if !history.record(&pdf.history_key, entry) {
            return;
        }
        if let Err(e) = history.save() {
            log::error!("Failed to save history: {}", e);
        }
    }

    /// Check whether the PDF changed on disk.
    ///
    /// On a change the page count and title are read again and every cached
    /// page is dropped. Returns `true` when the page must be redrawn.
    pub fn source_changed(&mut self) -> bool {
        self.source_changed_with(portable::pdf_info)
    }

    fn source_changed_with(
        &mut self,
        read_info: impl FnOnce(&Path) -> anyhow::Result<PdfInfo>,
    ) -> bool {
        let Source::Pdf(pdf) = &mut self.source else {
            return false;
        };
        let now = modified(&pdf.path);
        if now == pdf.modified {
            return false;
        }
        // Remember this version even if it cannot be read, so it is reported
        // once; the next write changes the time again.
        pdf.modified = now;

        let info = match read_info(&pdf.path) {
            Ok(info) => info,
            Err(e) => {
                log::warn!("{} changed but cannot be read: {:#}", pdf.path.display(), e);
                return false;
            }
        };
        log::info!("{} changed on disk", pdf.path.display());
        pdf.title = info.title;
        pdf.cache.invalidate_all(info.pages);

        self.length = info.pages;
        self.page = self.page.min(self.length - 1);
        self.to_prefetch %= self.length;
        self.title = self.make_title();
        true
    }
}
