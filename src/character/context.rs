//! Character context snapshot.
//!
//! The context is the set of mutable attributes (mood, location, theme,
//! phone state) that determines the behavior script sent to the model. It is
//! an immutable snapshot: every interaction produces a new snapshot through a
//! pure transition method, which keeps transitions auditable and testable.

use serde::{Deserialize, Serialize};

/// Character mood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    #[default]
    Happy,
    Grumpy,
    Sleepy,
    Surprised,
}

/// Where the character is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Location {
    #[default]
    LivingRoom,
    Kitchen,
    Outside,
    Bedroom,
}

impl Location {
    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "livingroom" | "living-room" | "living_room" => Self::LivingRoom,
            "kitchen" => Self::Kitchen,
            "outside" | "garden" => Self::Outside,
            "bedroom" => Self::Bedroom,
            _ => Self::default(),
        }
    }
}

/// Scenery theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Normal,
    Christmas,
    Halloween,
}

/// Immutable snapshot of the character's interactive state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CharacterContext {
    pub mood: Mood,
    pub location: Location,
    pub theme: Theme,
    pub phone_ringing: bool,
    pub phone_active: bool,
}

impl CharacterContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Poked: startled for a moment.
    pub fn poked(self) -> Self {
        Self {
            mood: Mood::Surprised,
            ..self
        }
    }

    /// Hugged: cheered up.
    pub fn hugged(self) -> Self {
        Self {
            mood: Mood::Happy,
            ..self
        }
    }

    /// Tickled into a giggle.
    pub fn giggled(self) -> Self {
        Self {
            mood: Mood::Happy,
            ..self
        }
    }

    /// Put down for a nap.
    pub fn napped(self) -> Self {
        Self {
            mood: Mood::Sleepy,
            ..self
        }
    }

    /// The rotary phone starts ringing.
    pub fn phone_ringing(self) -> Self {
        Self {
            phone_ringing: true,
            ..self
        }
    }

    /// The phone is picked up; the ringing stops.
    pub fn phone_answered(self) -> Self {
        Self {
            phone_ringing: false,
            phone_active: true,
            ..self
        }
    }

    /// The receiver goes back on the hook.
    pub fn hung_up(self) -> Self {
        Self {
            phone_ringing: false,
            phone_active: false,
            ..self
        }
    }

    /// Move to another room. Going outside always cheers the character up;
    /// any move ends a phone call (the phone stays in the living room).
    pub fn moved_to(self, location: Location) -> Self {
        Self {
            location,
            mood: if location == Location::Outside {
                Mood::Happy
            } else {
                self.mood
            },
            phone_ringing: false,
            phone_active: false,
            ..self
        }
    }

    /// Change the scenery theme.
    pub fn themed(self, theme: Theme) -> Self {
        Self { theme, ..self }
    }
}
