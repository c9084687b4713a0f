//! Named hit regions for each screen
//!
//! Every screen gets an explicit list of `(rect, button)` regions built
//! once on entry. Touches are resolved against that list; the host only
//! draws what the layout describes.

use crate::game::flow::GameState;
use crate::game::state::PlayField;
use crate::util::vec2::{Rect, Vec2};

const BUTTON_WIDTH: f32 = 200.0;
const BUTTON_HEIGHT: f32 = 50.0;
const BUTTON_SPACING: f32 = 60.0;
const BACK_WIDTH: f32 = 150.0;
const MUTE_SIZE: f32 = 44.0;
const EDGE_MARGIN: f32 = 16.0;
/// Overlay panels cover this share of the field height
const PANEL_HEIGHT_RATIO: f32 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Start,
    Leaderboard,
    Matchmaking,
    Profile,
    Achievements,
    Mute,
    PlayAgain,
    MainMenu,
    Back,
    DismissNotice,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitRegion {
    pub rect: Rect,
    pub button: Button,
}

/// Regions of the current screen, in hit-test priority order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScreenLayout {
    regions: Vec<HitRegion>,
}

impl ScreenLayout {
    /// Build the layout for `state`; the mute toggle is always first
    pub fn for_state(state: GameState, field: &PlayField) -> Self {
        let mut layout = Self::default();
        layout.push(mute_rect(field), Button::Mute);

        let mid_x = field.width * 0.5;
        let mid_y = field.height * 0.5;

        match state {
            GameState::MainMenu => {
                let column = [
                    Button::Start,
                    Button::Leaderboard,
                    Button::Matchmaking,
                    Button::Profile,
                    Button::Achievements,
                ];
                for (i, button) in column.into_iter().enumerate() {
                    let y = mid_y - BUTTON_SPACING * i as f32;
                    layout.push(button_rect(mid_x, y), button);
                }
            }
            GameState::GameOver => {
                layout.push(button_rect(mid_x, mid_y - 70.0), Button::PlayAgain);
                layout.push(button_rect(mid_x, mid_y - 130.0), Button::MainMenu);
            }
            GameState::Profile | GameState::Leaderboard | GameState::Matchmaking => {
                let panel_bottom = mid_y - field.height * PANEL_HEIGHT_RATIO * 0.5;
                layout.push(
                    Rect::centered(
                        Vec2::new(mid_x, panel_bottom + 40.0),
                        Vec2::new(BACK_WIDTH, BUTTON_HEIGHT),
                    ),
                    Button::Back,
                );
            }
            // Any other touch while playing is a flap
            GameState::Playing => {}
        }
        layout
    }

    /// Add a full-screen dismiss region below everything else
    pub fn with_notice(mut self, field: &PlayField) -> Self {
        self.push(
            Rect::new(0.0, 0.0, field.width, field.height),
            Button::DismissNotice,
        );
        self
    }

    fn push(&mut self, rect: Rect, button: Button) {
        self.regions.push(HitRegion { rect, button });
    }

    pub fn hit_test(&self, point: Vec2) -> Option<Button> {
        self.regions
            .iter()
            .find(|r| r.rect.contains(point))
            .map(|r| r.button)
    }

    pub fn regions(&self) -> &[HitRegion] {
        &self.regions
    }

    pub fn region(&self, button: Button) -> Option<&HitRegion> {
        self.regions.iter().find(|r| r.button == button)
    }
}

fn button_rect(center_x: f32, center_y: f32) -> Rect {
    Rect::centered(
        Vec2::new(center_x, center_y),
        Vec2::new(BUTTON_WIDTH, BUTTON_HEIGHT),
    )
}

fn mute_rect(field: &PlayField) -> Rect {
    Rect::new(
        field.width - EDGE_MARGIN - MUTE_SIZE,
        field.height - EDGE_MARGIN - MUTE_SIZE,
        MUTE_SIZE,
        MUTE_SIZE,
    )
}
