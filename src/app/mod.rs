// SPDX-License-Identifier: GPL-3.0-or-later
// src/app/mod.rs
//
// COSMIC application wiring and main app struct.

pub mod document;
pub mod message;
pub mod model;
pub mod update;
pub mod view;

pub use message::AppMessage;
pub use model::AppModel;

use std::path::{Path, PathBuf};

use cosmic::app::Core;
use cosmic::cosmic_config::{self, CosmicConfigEntry};
use cosmic::iced::keyboard::{self, Key, Modifiers, key::Named};
use cosmic::iced::{Subscription, stream, window};
use cosmic::{Action, ApplicationExt, Element, Task};

use self::document::history::History;
use self::document::portable::Toolset;
use self::document::watcher::SourceWatcher;
use self::document::Pages;
use crate::config::AppConfig;
use crate::constant::APP_NAME;

/// Flags passed from `main` into the application.
#[derive(Debug, Clone)]
pub enum Flags {
    /// Files shown in this window: one PDF, or any number of images.
    Session { files: Vec<PathBuf>, tools: Toolset },
}

/// Main application type.
pub struct CuteViewApp {
    core: Core,
    pub model: AppModel,
    pub config: AppConfig,
}

impl cosmic::Application for CuteViewApp {
    type Executor = cosmic::SingleThreadExecutor;
    type Flags = Flags;
    type Message = AppMessage;

    const APP_ID: &'static str = "io.github.cuteview.CuteView";

    fn core(&self) -> &Core {
        &self.core
    }

    fn core_mut(&mut self) -> &mut Core {
        &mut self.core
    }

    fn init(core: Core, flags: Self::Flags) -> (Self, Task<Action<Self::Message>>) {
        // Load persisted config.
        let config = match cosmic_config::Config::new(Self::APP_ID, AppConfig::VERSION) {
            Ok(handler) => AppConfig::get_entry(&handler).unwrap_or_default(),
            Err(_) => AppConfig::default(),
        };

        let Flags::Session { files, tools } = flags;

        let pages = match Pages::open(&files, tools, &config, History::default_path()) {
            Ok(pages) => Some(pages),
            Err(e) => {
                log::error!("Failed to open {:?}: {:#}", files, e);
                None
            }
        };
        let mut model = AppModel::new(pages, &config);
        if model.pages.is_none() {
            model.set_error(crate::fl!("open-failed"));
        }

        let mut app = Self {
            core,
            model,
            config,
        };

        // Pages are fetched once the viewer reports its size.
        let title_task = app.update_title();
        let maximize_task = match app.core.main_window_id() {
            Some(id) => window::maximize(id, true),
            None => Task::none(),
        };

        (app, Task::batch([title_task, maximize_task]))
    }

    fn on_close_requested(&self, _id: window::Id) -> Option<Self::Message> {
        Some(AppMessage::CloseRequested)
    }

    fn update(&mut self, message: Self::Message) -> Task<Action<Self::Message>> {
        match update::update(self, &message) {
            update::UpdateResult::None => Task::none(),
            update::UpdateResult::Task(task) => task,
        }
    }

    fn view(&self) -> Element<'_, Self::Message> {
        view::view(&self.model, &self.config)
    }

    fn subscription(&self) -> Subscription<Self::Message> {
        let watch = self
            .model
            .pages
            .as_ref()
            .and_then(Pages::pdf_path)
            .map_or_else(Subscription::none, source_subscription);

        Subscription::batch([keyboard::on_key_press(handle_key_press), watch])
    }
}

/// Emit [`AppMessage::SourceChanged`] whenever the PDF is written.
fn source_subscription(source: &Path) -> Subscription<AppMessage> {
    let source = source.to_path_buf();
    Subscription::run_with_id(
        source.clone(),
        stream::channel(1, move |mut output| async move {
            let watcher = SourceWatcher::new(&source, move || {
                // A full channel already holds a change for the UI.
                let _ = output.try_send(AppMessage::SourceChanged);
            });
            let _watcher = match watcher {
                Ok(watcher) => watcher,
                Err(e) => {
                    log::warn!("Cannot watch {}: {}", source.display(), e);
                    return;
                }
            };
            std::future::pending::<()>().await;
        }),
    )
}

impl CuteViewApp {
    /// Push the page title into the window title.
    pub fn update_title(&mut self) -> Task<Action<AppMessage>> {
        let title = window_title(self.model.pages.as_ref().map(Pages::title));
        match self.core.main_window_id() {
            Some(id) => self.set_window_title(title, id),
            None => Task::none(),
        }
    }
}

/// Window title for a page title.
pub fn window_title(title: Option<&str>) -> String {
    match title {
        Some(title) if !title.is_empty() => format!("{title} - {APP_NAME}"),
        _ => APP_NAME.to_string(),
    }
}

/// Map raw key presses + modifiers into high-level application messages.
fn handle_key_press(key: Key, modifiers: Modifiers) -> Option<AppMessage> {
    use AppMessage::{
        LessOpaque, MoreOpaque, NextPage, PrevPage, Quit, QuitWithoutHistory, ToggleCursor,
        ToggleInvert, ToggleTrim,
    };

    // Ignore key presses when command-style modifiers are pressed.
    if modifiers.command() || modifiers.alt() || modifiers.logo() || modifiers.control() {
        return None;
    }

    match key.as_ref() {
        // Quitting; Shift+Q leaves the history untouched.
        Key::Character(ch) if ch.eq_ignore_ascii_case("q") => {
            if modifiers.shift() {
                Some(QuitWithoutHistory)
            } else {
                Some(Quit)
            }
        }

        // Navigation.
        Key::Named(Named::ArrowLeft) => Some(PrevPage),
        Key::Named(Named::ArrowRight) => Some(NextPage),

        // Opacity; the easier key makes the page more opaque.
        Key::Character("*") => Some(LessOpaque),
        Key::Character("/") => Some(MoreOpaque),

        Key::Character("^") => Some(ToggleCursor),
        Key::Character(ch) if ch.eq_ignore_ascii_case("i") => Some(ToggleInvert),
        Key::Character(ch) if ch.eq_ignore_ascii_case("t") => Some(ToggleTrim),

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(key: Key, modifiers: Modifiers) -> Option<AppMessage> {
        handle_key_press(key, modifiers)
    }

    fn char_key(c: &str) -> Key {
        Key::Character(c.into())
    }

    #[test]
    fn window_title_appends_app_name() {
        assert_eq!(window_title(Some("Book (3/10)")), "Book (3/10) - CuteView");
        assert_eq!(window_title(Some("")), "CuteView");
        assert_eq!(window_title(None), "CuteView");
    }

    #[test]
    fn q_quits_and_shift_q_skips_history() {
        assert!(matches!(
            press(char_key("q"), Modifiers::empty()),
            Some(AppMessage::Quit)
        ));
        assert!(matches!(
            press(char_key("Q"), Modifiers::SHIFT),
            Some(AppMessage::QuitWithoutHistory)
        ));
    }

    #[test]
    fn display_keys() {
        assert!(matches!(
            press(char_key("*"), Modifiers::empty()),
            Some(AppMessage::LessOpaque)
        ));
        assert!(matches!(
            press(char_key("/"), Modifiers::empty()),
            Some(AppMessage::MoreOpaque)
        ));
        assert!(matches!(
            press(char_key("i"), Modifiers::empty()),
            Some(AppMessage::ToggleInvert)
        ));
        assert!(matches!(
            press(char_key("T"), Modifiers::SHIFT),
            Some(AppMessage::ToggleTrim)
        ));
        assert!(matches!(
            press(char_key("^"), Modifiers::empty()),
            Some(AppMessage::ToggleCursor)
        ));
    }

    #[test]
    fn arrows_turn_pages() {
        assert!(matches!(
            press(Key::Named(Named::ArrowLeft), Modifiers::empty()),
            Some(AppMessage::PrevPage)
        ));
        assert!(matches!(
            press(Key::Named(Named::ArrowRight), Modifiers::empty()),
            Some(AppMessage::NextPage)
        ));
    }

    #[test]
    fn control_shortcuts_are_ignored() {
        assert!(press(char_key("q"), Modifiers::CTRL).is_none());
    }
}
