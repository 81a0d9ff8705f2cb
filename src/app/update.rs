// SPDX-License-Identifier: GPL-3.0-or-later
// src/app/update.rs
//
// Message handling: map user actions onto the page model and redraw.

use cosmic::{Action, Task};
use image::DynamicImage;

use super::document::Mode;
use super::document::portable;
use super::{AppMessage, CuteViewApp};
use crate::domain::gesture::SwipeDirection;

pub enum UpdateResult {
    None,
    Task(Task<Action<AppMessage>>),
}

pub fn update(app: &mut CuteViewApp, message: &AppMessage) -> UpdateResult {
    match message {
        AppMessage::NextPage | AppMessage::Swipe(SwipeDirection::Left) => turn(app, true),
        AppMessage::PrevPage | AppMessage::Swipe(SwipeDirection::Right) => turn(app, false),

        AppMessage::ToggleInvert => with_pages(app, |pages| pages.toggle_invert()),
        AppMessage::ToggleTrim => with_pages(app, |pages| pages.toggle_trim()),
        AppMessage::LessOpaque => with_pages(app, |pages| pages.less_opaque()),
        AppMessage::MoreOpaque => with_pages(app, |pages| pages.more_opaque()),

        AppMessage::ToggleCursor => {
            app.model.cursor_hidden = !app.model.cursor_hidden;
            UpdateResult::None
        }

        AppMessage::Pinch { scale, dx, dy } => {
            if app.model.mode() == Some(Mode::Images) {
                app.model.zoom.pinch(*scale, (*dx, *dy));
                app.model.redraw(&app.config);
            }
            UpdateResult::None
        }

        AppMessage::ViewerResized { width, height } => {
            app.model.viewer_size = (width.max(0.0) as u32, height.max(0.0) as u32);
            if app.model.pixmap.is_none() {
                return draw(app);
            }
            let longdim = app.model.longdim();
            if let Some(pages) = app.model.pages.as_mut()
                && longdim > 0
                && let Some(result) = pages.get_page(longdim).transpose()
            {
                app.model.set_pixmap(result);
            }
            app.model.redraw(&app.config);
            UpdateResult::None
        }

        AppMessage::Prefetched { page, result } => {
            if let Err(e) = result {
                log::warn!("Prefetch of page {} failed: {e}", page + 1);
            }
            let shown = app
                .model
                .pages
                .as_mut()
                .is_some_and(|pages| pages.finish_prefetch(*page));
            if shown { draw(app) } else { UpdateResult::None }
        }

        AppMessage::SourceChanged => {
            let changed = app
                .model
                .pages
                .as_mut()
                .is_some_and(|pages| pages.source_changed());
            if changed { draw(app) } else { UpdateResult::None }
        }

        AppMessage::Quit => {
            write_history(app);
            app.model.write_history_on_close = false;
            UpdateResult::Task(cosmic::iced::exit())
        }

        AppMessage::QuitWithoutHistory => {
            app.model.write_history_on_close = false;
            UpdateResult::Task(cosmic::iced::exit())
        }

        AppMessage::CloseRequested => {
            if app.model.write_history_on_close {
                write_history(app);
                app.model.write_history_on_close = false;
            }
            UpdateResult::None
        }
    }
}

fn write_history(app: &CuteViewApp) {
    if let Some(pages) = &app.model.pages {
        pages.write_history();
    }
}

/// Change a display preference and show the page again.
fn with_pages(app: &mut CuteViewApp, f: impl FnOnce(&mut super::document::Pages)) -> UpdateResult {
    match app.model.pages.as_mut() {
        Some(pages) => {
            f(pages);
            draw(app)
        }
        None => UpdateResult::None,
    }
}

/// Fetch the current page again and show it.
fn draw(app: &mut CuteViewApp) -> UpdateResult {
    let longdim = app.model.longdim();
    if longdim == 0 {
        return UpdateResult::None;
    }
    match app.model.pages.as_mut() {
        Some(pages) => {
            let result = pages.get_page(longdim);
            set_page(app, result)
        }
        None => UpdateResult::None,
    }
}

fn turn(app: &mut CuteViewApp, forward: bool) -> UpdateResult {
    let longdim = app.model.longdim();
    if longdim == 0 {
        return UpdateResult::None;
    }
    match app.model.pages.as_mut() {
        Some(pages) => {
            let result = if forward {
                pages.next(longdim)
            } else {
                pages.prev(longdim)
            };
            set_page(app, result)
        }
        None => UpdateResult::None,
    }
}

/// Show a new page: reset zoom, update the title and prefetch the next one.
///
/// A page still rendering in the background leaves the old bitmap up; it is
/// drawn when its prefetch finishes.
fn set_page(app: &mut CuteViewApp, result: anyhow::Result<Option<DynamicImage>>) -> UpdateResult {
    if let Some(result) = result.transpose() {
        app.model.set_pixmap(result);
    }
    app.model.zoom.reset();
    app.model.redraw(&app.config);

    let title_task = app.update_title();
    let prefetch_task = prefetch(app);
    UpdateResult::Task(Task::batch([title_task, prefetch_task]))
}

fn prefetch(app: &mut CuteViewApp) -> Task<Action<AppMessage>> {
    let Some(job) = app.model.pages.as_mut().and_then(|pages| pages.prefetch_job()) else {
        return Task::none();
    };
    let page = job.request.page;
    log::debug!("prefetching page {}", page + 1);
    Task::perform(portable::render_async(job.backend, job.request), move |result| {
        Action::App(AppMessage::Prefetched {
            page,
            result: result.map_err(|e| format!("{e:#}")),
        })
    })
}
