// SPDX-License-Identifier: GPL-3.0-or-later
// src/app/view/canvas.rs
//
// Render the page area: the current bitmap on a themed background with the
// gesture layer on top.

use cosmic::Element;
use cosmic::iced::widget::container::Style;
use cosmic::iced::{Background, Color, ContentFit, Length};
use cosmic::iced_widget::stack;
use cosmic::widget::{container, image, text};

use super::gesture_layer::gesture_layer;
use crate::app::document::Mode;
use crate::app::{AppMessage, AppModel};
use crate::config::AppConfig;
use crate::constant::{DARK_BACKGROUND, LIGHT_BACKGROUND};
use crate::fl;

/// Background behind the page: dark and translucent when inverted.
pub fn background_color(model: &AppModel) -> Color {
    match &model.pages {
        Some(pages) if pages.invert() => {
            let (r, g, b) = DARK_BACKGROUND;
            Color::from_rgba8(r, g, b, f32::from(pages.opacity()) / 255.0)
        }
        _ => {
            let (r, g, b) = LIGHT_BACKGROUND;
            Color::from_rgb8(r, g, b)
        }
    }
}

/// Render the page area with the current document.
pub fn view<'a>(model: &'a AppModel, config: &'a AppConfig) -> Element<'a, AppMessage> {
    let content: Element<'a, AppMessage> = if let Some(handle) = &model.handle {
        container(image(handle.clone()).content_fit(ContentFit::None))
            .width(Length::Fill)
            .height(Length::Fill)
            .center(Length::Fill)
            .into()
    } else if let Some(error) = &model.error {
        container(text(error.as_str()))
            .width(Length::Fill)
            .height(Length::Fill)
            .center(Length::Fill)
            .into()
    } else {
        container(text(fl!("no-document")))
            .width(Length::Fill)
            .height(Length::Fill)
            .center(Length::Fill)
            .into()
    };

    let layer = gesture_layer(
        model.mode() == Some(Mode::Images),
        model.cursor_hidden,
        config.swipe_threshold,
    );

    let background = background_color(model);
    container(stack![content, layer])
        .width(Length::Fill)
        .height(Length::Fill)
        .class(cosmic::theme::Container::custom(move |_theme| Style {
            background: Some(Background::Color(background)),
            ..Style::default()
        }))
        .into()
}
