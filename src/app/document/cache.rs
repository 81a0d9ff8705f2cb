// SPDX-License-Identifier: GPL-3.0-or-later
// src/app/document/cache.rs
//
// On-disk cache of rendered PDF pages.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use sha2::{Digest, Sha256};

use super::portable::{PageRenderer, RenderRequest};
use crate::constant::APP_DIR;

/// Extensions a cached page may carry.
const PAGE_EXTENSIONS: [&str; 2] = ["ppm", "pgm"];

/// Outcome of looking up a page in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedPage {
    /// The page file is complete.
    Ready(PathBuf),
    /// A background render of this page has not finished yet.
    Rendering,
}

/// How a cached page was last rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PageRecord {
    longdim: u32,
    invert: bool,
}

/// Rendered pages of one PDF, one file per page.
///
/// A page is rendered again when its file is gone, when a larger size is
/// requested, or when the invert flag differs from the cached render. Only a
/// window of pages around the current one is kept. Pages rendered in the
/// background are tracked until they finish, so they are neither rendered
/// twice nor evicted half-written. The directory is removed when the cache is
/// dropped.
#[derive(Debug)]
pub struct PageCache {
    dir: PathBuf,
    source: PathBuf,
    records: Vec<PageRecord>,
    pending: HashSet<usize>,
    default_invert: bool,
    keep_before: usize,
    keep_after: usize,
}

/// Directory name for a document: hash of its path.
pub fn cache_key(source: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.to_string_lossy().as_bytes());
    format!("{:x}", hasher.finalize())
}

impl PageCache {
    /// Directory below the user cache directory: `<cache dir>/cuteview/<hash>-<pid>`.
    ///
    /// The process id is part of the name, so two windows on the same file
    /// never share files.
    pub fn default_dir(source: &Path) -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(APP_DIR)
            .join(format!("{}-{}", cache_key(source), std::process::id()))
    }

    pub fn in_dir(
        dir: PathBuf,
        source: &Path,
        length: usize,
        default_invert: bool,
    ) -> anyhow::Result<Self> {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache directory {}", dir.display()))?;
        log::debug!("page cache for {} in {}", source.display(), dir.display());

        Ok(Self {
            dir,
            source: source.to_path_buf(),
            records: vec![
                PageRecord {
                    longdim: 0,
                    invert: default_invert,
                };
                length
            ],
            pending: HashSet::new(),
            default_invert,
            keep_before: 5,
            keep_after: 5,
        })
    }

    /// Set how many pages around the current one survive eviction.
    pub fn with_window(mut self, keep_before: usize, keep_after: usize) -> Self {
        self.keep_before = keep_before;
        self.keep_after = keep_after;
        self
    }

    #[cfg(test)]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn page_count(&self) -> usize {
        self.records.len()
    }

    pub fn page_path(&self, page: usize, extension: &str) -> PathBuf {
        self.dir.join(format!("{page}.{extension}"))
    }

    /// Long side the page was last rendered at.
    pub fn recorded_longdim(&self, page: usize) -> u32 {
        self.records
            .get(page % self.page_count().max(1))
            .map_or(0, |record| record.longdim)
    }

    /// Decide whether `page` has to be rendered.
    ///
    /// Returns the page file and, when it is missing or stale, the request
    /// that produces it. The page is recorded as rendered right away.
    pub fn plan<R: PageRenderer>(
        &mut self,
        renderer: &R,
        page: usize,
        longdim: u32,
        invert: bool,
    ) -> (PathBuf, Option<RenderRequest>) {
        let page = page % self.page_count().max(1);
        let outfile = self.page_path(page, renderer.extension(invert));
        let Some(record) = self.records.get_mut(page) else {
            return (outfile, None);
        };

        let stale = record.longdim < longdim || record.invert != invert;
        if outfile.exists() && !stale {
            return (outfile, None);
        }
        *record = PageRecord { longdim, invert };

        let request = RenderRequest {
            pdf: self.source.clone(),
            page,
            longdim,
            invert,
            outfile: outfile.clone(),
        };
        (outfile, Some(request))
    }

    /// Make sure `page` is rendered at least at `longdim`, then evict pages
    /// far from `current`.
    ///
    /// A page still being rendered in the background is not rendered again;
    /// the caller shows it once [`PageCache::finish_background`] is called.
    pub fn ensure<R: PageRenderer>(
        &mut self,
        renderer: &R,
        page: usize,
        longdim: u32,
        invert: bool,
        current: usize,
    ) -> anyhow::Result<CachedPage> {
        if self.is_pending(page) {
            self.evict(current);
            return Ok(CachedPage::Rendering);
        }
        let (outfile, request) = self.plan(renderer, page, longdim, invert);
        let rendered = match request {
            Some(request) => renderer.render(&request),
            None => Ok(()),
        };
        self.evict(current);
        rendered?;
        Ok(CachedPage::Ready(outfile))
    }

    /// Plan a background render of `page`.
    ///
    /// Returns `None` when the page is fresh or already being rendered. The
    /// page stays pending until [`PageCache::finish_background`].
    pub fn begin_background<R: PageRenderer>(
        &mut self,
        renderer: &R,
        page: usize,
        longdim: u32,
        invert: bool,
    ) -> Option<RenderRequest> {
        if self.is_pending(page) {
            return None;
        }
        let (_, request) = self.plan(renderer, page, longdim, invert);
        let request = request?;
        self.pending.insert(request.page);
        Some(request)
    }

    /// A background render of `page` ended, successfully or not.
    pub fn finish_background(&mut self, page: usize) {
        self.pending.remove(&page);
    }

    pub fn is_pending(&self, page: usize) -> bool {
        self.pending.contains(&(page % self.page_count().max(1)))
    }

    /// Delete cached pages outside the window around `current`.
    pub fn evict(&mut self, current: usize) {
        let length = self.page_count();
        if self.keep_before + self.keep_before >= length + 1 {
            return;
        }
        let start = current + self.keep_after + 1;
        let end = current + length - self.keep_before;
        for page in (start..end).map(|page| page % length) {
            if !self.pending.contains(&page) {
                self.remove_page(page);
            }
        }
    }

    /// Forget every page, for example after the document changed on disk.
    ///
    /// Pending background renders stay pending; their records are reset, so
    /// whatever they produce is rendered again on the next lookup.
    pub fn invalidate_all(&mut self, length: usize) {
        match fs::read_dir(&self.dir) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    remove_file(&entry.path());
                }
            }
            Err(e) => log::warn!("Failed to list {}: {}", self.dir.display(), e),
        }
        self.records = vec![
            PageRecord {
                longdim: 0,
                invert: self.default_invert,
            };
            length
        ];
        self.pending.retain(|&page| page < length);
    }

    fn remove_page(&mut self, page: usize) {
        for extension in PAGE_EXTENSIONS {
            remove_file(&self.page_path(page, extension));
        }
        if let Some(record) = self.records.get_mut(page) {
            record.longdim = 0;
        }
    }
}

fn remove_file(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Failed to remove {}: {}", path.display(), e),
    }
}

impl Drop for PageCache {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.dir) {
            log::warn!("Failed to remove page cache {}: {}", self.dir.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    /// Writes an empty page file and remembers every request.
    #[derive(Default)]
    struct FakeRenderer {
        requests: RefCell<Vec<RenderRequest>>,
    }

    impl FakeRenderer {
        fn count(&self) -> usize {
            self.requests.borrow().len()
        }
    }

    impl PageRenderer for FakeRenderer {
        fn extension(&self, _invert: bool) -> &'static str {
            "ppm"
        }

        fn inverts(&self) -> bool {
            true
        }

        fn render(&self, request: &RenderRequest) -> anyhow::Result<()> {
            fs::write(&request.outfile, b"P6")?;
            self.requests.borrow_mut().push(request.clone());
            Ok(())
        }
    }

    fn ready(page: CachedPage) -> PathBuf {
        match page {
            CachedPage::Ready(path) => path,
            CachedPage::Rendering => panic!("page is still rendering"),
        }
    }

    fn cache(tmp: &tempfile::TempDir, length: usize) -> PageCache {
        PageCache::in_dir(
            tmp.path().join("pages"),
            Path::new("/docs/book.pdf"),
            length,
            false,
        )
        .unwrap()
    }

    #[test]
    fn renders_once_for_the_same_size() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cache = cache(&tmp, 20);
        let renderer = FakeRenderer::default();

        let path = ready(cache.ensure(&renderer, 3, 800, false, 3).unwrap());
        assert_eq!(path, cache.dir().join("3.ppm"));
        assert!(path.exists());

        cache.ensure(&renderer, 3, 800, false, 3).unwrap();
        cache.ensure(&renderer, 3, 400, false, 3).unwrap();
        assert_eq!(renderer.count(), 1);
        assert_eq!(cache.recorded_longdim(3), 800);
    }

    #[test]
    fn larger_size_or_invert_change_renders_again() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cache = cache(&tmp, 20);
        let renderer = FakeRenderer::default();

        cache.ensure(&renderer, 0, 800, false, 0).unwrap();
        cache.ensure(&renderer, 0, 1200, false, 0).unwrap();
        cache.ensure(&renderer, 0, 1200, true, 0).unwrap();

        let requests = renderer.requests.borrow();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1].longdim, 1200);
        assert!(requests[2].invert);
        assert_eq!(requests[2].pdf, PathBuf::from("/docs/book.pdf"));
    }

    #[test]
    fn missing_file_renders_again() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cache = cache(&tmp, 20);
        let renderer = FakeRenderer::default();

        let path = ready(cache.ensure(&renderer, 1, 800, false, 1).unwrap());
        fs::remove_file(&path).unwrap();
        cache.ensure(&renderer, 1, 800, false, 1).unwrap();

        assert_eq!(renderer.count(), 2);
    }

    #[test]
    fn page_index_wraps_around() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cache = cache(&tmp, 20);
        let renderer = FakeRenderer::default();

        let path = ready(cache.ensure(&renderer, 21, 800, false, 1).unwrap());

        assert_eq!(path, cache.dir().join("1.ppm"));
        assert_eq!(renderer.requests.borrow()[0].page, 1);
    }

    #[test]
    fn plan_records_before_rendering() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cache = cache(&tmp, 4);
        let renderer = FakeRenderer::default();

        let (_, request) = cache.plan(&renderer, 2, 640, false);
        assert!(request.is_some());
        assert_eq!(cache.recorded_longdim(2), 640);
        assert_eq!(renderer.count(), 0);
    }

    #[test]
    fn page_rendering_in_background_is_not_rendered_again() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cache = cache(&tmp, 20);
        let renderer = FakeRenderer::default();

        let request = cache.begin_background(&renderer, 2, 800, false).unwrap();
        assert!(request.outfile.ends_with("2.ppm"));
        // The child has written part of its staging file.
        fs::write(request.staged().outfile, b"P6\n800 600\n255\n").unwrap();

        assert_eq!(
            cache.ensure(&renderer, 2, 800, false, 2).unwrap(),
            CachedPage::Rendering
        );
        assert!(cache.begin_background(&renderer, 22, 800, false).is_none());
        assert_eq!(renderer.count(), 0);
        assert!(!cache.page_path(2, "ppm").exists());
    }

    #[test]
    fn finished_background_page_is_reused() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cache = cache(&tmp, 20);
        let renderer = FakeRenderer::default();

        let request = cache.begin_background(&renderer, 2, 800, false).unwrap();
        fs::write(&request.outfile, b"P6").unwrap();
        cache.finish_background(2);

        let path = ready(cache.ensure(&renderer, 2, 800, false, 2).unwrap());
        assert_eq!(path, request.outfile);
        assert_eq!(renderer.count(), 0);
    }

    #[test]
    fn failed_background_page_is_rendered_on_demand() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cache = cache(&tmp, 20);
        let renderer = FakeRenderer::default();

        cache.begin_background(&renderer, 4, 800, false).unwrap();
        cache.finish_background(4);

        ready(cache.ensure(&renderer, 4, 800, false, 4).unwrap());
        assert_eq!(renderer.count(), 1);
    }

    #[test]
    fn eviction_spares_pages_rendering_in_background() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cache = cache(&tmp, 20);
        let renderer = FakeRenderer::default();
        for page in 0..20 {
            fs::write(cache.page_path(page, "ppm"), b"P6").unwrap();
        }
        fs::remove_file(cache.page_path(0, "ppm")).unwrap();
        cache.begin_background(&renderer, 0, 800, false).unwrap();
        fs::write(cache.page_path(0, "ppm"), b"P6").unwrap();

        cache.evict(10);

        assert!(cache.page_path(0, "ppm").exists());
        assert!(!cache.page_path(1, "ppm").exists());
        assert_eq!(cache.recorded_longdim(0), 800);
    }

    #[test]
    fn eviction_keeps_a_window_around_the_current_page() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cache = cache(&tmp, 20);
        for page in 0..20 {
            fs::write(cache.page_path(page, "ppm"), b"P6").unwrap();
        }

        cache.evict(10);

        let kept: Vec<usize> = (0..20)
            .filter(|&page| cache.page_path(page, "ppm").exists())
            .collect();
        assert_eq!(kept, (5..=15).collect::<Vec<_>>());
    }

    #[test]
    fn eviction_wraps_past_the_last_page() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cache = cache(&tmp, 20);
        for page in 0..20 {
            fs::write(cache.page_path(page, "pgm"), b"P5").unwrap();
        }

        cache.evict(18);

        let kept: Vec<usize> = (0..20)
            .filter(|&page| cache.page_path(page, "pgm").exists())
            .collect();
        assert_eq!(kept, vec![0, 1, 2, 3, 13, 14, 15, 16, 17, 18, 19]);
    }

    #[test]
    fn short_documents_are_never_evicted() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cache = cache(&tmp, 9);
        for page in 0..9 {
            fs::write(cache.page_path(page, "ppm"), b"P6").unwrap();
        }

        cache.evict(0);

        assert!((0..9).all(|page| cache.page_path(page, "ppm").exists()));
    }

    #[test]
    fn invalidate_all_clears_files_and_resizes() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cache = cache(&tmp, 3);
        let renderer = FakeRenderer::default();
        cache.ensure(&renderer, 0, 800, false, 0).unwrap();

        cache.invalidate_all(5);

        assert_eq!(cache.page_count(), 5);
        assert_eq!(cache.recorded_longdim(0), 0);
        assert_eq!(fs::read_dir(cache.dir()).unwrap().count(), 0);
    }

    #[test]
    fn dropping_removes_the_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = cache(&tmp, 3);
        let dir = cache.dir().to_path_buf();
        assert!(dir.is_dir());

        drop(cache);
        assert!(!dir.exists());
    }

    #[test]
    fn cache_key_is_stable_hex() {
        let key = cache_key(Path::new("/docs/book.pdf"));
        assert_eq!(key.len(), 64);
        assert_eq!(key, cache_key(Path::new("/docs/book.pdf")));
        assert_ne!(key, cache_key(Path::new("/docs/other.pdf")));
    }
}
