// SPDX-License-Identifier: GPL-3.0-or-later
// src/app/document/watcher.rs
//
// Change notifications for the open PDF.

use std::path::Path;

use notify_debouncer_mini::{
    DebounceEventResult, DebouncedEvent, DebouncedEventKind, Debouncer, new_debouncer,
};

use crate::constant::SOURCE_DEBOUNCE;

/// Watches the directory holding a document and reports writes to it.
///
/// The directory is watched rather than the file, so documents replaced by
/// a rename (as most tools save) keep being followed.
pub struct SourceWatcher {
    _debouncer: Debouncer<notify::RecommendedWatcher>,
}

/// Directory to watch for `source`.
fn watch_dir(source: &Path) -> &Path {
    match source.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

/// Whether a debounced event concerns `source`.
///
/// Only direct children of the watched directory are reported, so the
/// file name identifies the document.
pub fn concerns(source: &Path, event: &DebouncedEvent) -> bool {
    event.kind == DebouncedEventKind::Any && event.path.file_name() == source.file_name()
}

impl SourceWatcher {
    /// Start watching `source`; `on_change` runs on the watcher thread after
    /// each burst of writes settles.
    pub fn new(
        source: &Path,
        mut on_change: impl FnMut() + Send + 'static,
    ) -> Result<Self, notify::Error> {
        let watched = source.to_path_buf();
        let mut debouncer = new_debouncer(SOURCE_DEBOUNCE, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    if events.iter().any(|event| concerns(&watched, event)) {
                        on_change();
                    }
                }
                Err(e) => log::warn!("File watcher error: {e:?}"),
            }
        })?;

        debouncer
            .watcher()
            .watch(watch_dir(source), notify::RecursiveMode::NonRecursive)?;
        log::info!("watching {} for changes", source.display());

        Ok(Self {
            _debouncer: debouncer,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;

    fn event(path: &str, kind: DebouncedEventKind) -> DebouncedEvent {
        DebouncedEvent {
            path: PathBuf::from(path),
            kind,
        }
    }

    #[test]
    fn relative_documents_watch_the_working_directory() {
        assert_eq!(watch_dir(Path::new("book.pdf")), Path::new("."));
        assert_eq!(watch_dir(Path::new("/docs/book.pdf")), Path::new("/docs"));
    }

    #[test]
    fn only_settled_events_for_the_document_count() {
        let source = Path::new("docs/book.pdf");

        assert!(concerns(source, &event("/home/me/docs/book.pdf", DebouncedEventKind::Any)));
        assert!(!concerns(source, &event("/home/me/docs/other.pdf", DebouncedEventKind::Any)));
        assert!(!concerns(
            source,
            &event("/home/me/docs/book.pdf", DebouncedEventKind::AnyContinuous)
        ));
    }

    #[test]
    fn watcher_starts_on_an_existing_document() {
        let tmp = tempfile::tempdir().unwrap();
        let pdf = tmp.path().join("book.pdf");
        fs::write(&pdf, b"%PDF-1.4").unwrap();

        assert!(SourceWatcher::new(&pdf, || {}).is_ok());
    }

    #[test]
    #[ignore] // File system event timing varies by platform.
    fn rewriting_the_document_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let pdf = tmp.path().join("book.pdf");
        fs::write(&pdf, b"%PDF-1.4").unwrap();
        let (tx, rx) = mpsc::channel();
        let _watcher = SourceWatcher::new(&pdf, move || {
            let _ = tx.send(());
        })
        .unwrap();

        fs::write(tmp.path().join("notes.txt"), b"unrelated").unwrap();
        fs::write(&pdf, b"%PDF-1.5").unwrap();

        assert!(rx.recv_timeout(Duration::from_secs(3)).is_ok());
    }
}
