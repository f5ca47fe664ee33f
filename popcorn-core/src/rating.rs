//! In-progress star rating for the movie shown in the detail view.

use crate::watched::WatchedError;

/// Highest selectable star count.
pub const MAX_RATING: u8 = 10;

/// Rating the user is composing before adding a movie to the watched list.
///
/// Every change to a new non-zero value counts as one rating decision;
/// re-selecting the current value does not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RatingDraft {
    stars: u8,
    decisions: u32,
}

impl RatingDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks a star count in `1..=MAX_RATING`.
    ///
    /// # Errors
    ///
    /// - `WatchedError::InvalidRating` - If `stars` is zero or above `MAX_RATING`
    pub fn set_rating(&mut self, stars: u8) -> Result<(), WatchedError> {
        if stars == 0 || stars > MAX_RATING {
            return Err(WatchedError::InvalidRating {
                stars,
                max: MAX_RATING,
            });
        }

        if stars != self.stars {
            self.stars = stars;
            self.decisions += 1;
        }
        Ok(())
    }

    /// Chosen rating, if any.
    pub fn rating(&self) -> Option<u8> {
        (self.stars > 0).then_some(self.stars)
    }

    pub fn decisions(&self) -> u32 {
        self.decisions
    }

    /// Clears the draft, e.g. when a different movie is selected.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
