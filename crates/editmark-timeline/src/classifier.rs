//! Track-item classifier: picks the clips a creation pass works on.

use tracing::debug;

use crate::item::{ItemRef, TimelineItem};
use crate::project::Sequence;
use crate::track::TrackKind;

/// AND-combined predicates over placed items. Unset filters pass
/// everything.
#[derive(Debug, Clone)]
pub struct ItemFilter {
    /// Item name must contain this text
    pub name: Option<String>,
    /// Parent track name must contain this text
    pub track_name: Option<String>,
    /// Parent track kind
    pub track_type: TrackKind,
    pub require_enabled: bool,
    pub require_unlocked: bool,
    pub require_tagged: bool,
}

impl Default for ItemFilter {
    fn default() -> Self {
        Self {
            name: None,
            track_name: None,
            track_type: TrackKind::Video,
            require_enabled: true,
            require_unlocked: true,
            require_tagged: false,
        }
    }
}

impl ItemFilter {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_track_name(mut self, track_name: impl Into<String>) -> Self {
        self.track_name = Some(track_name.into());
        self
    }

    pub fn with_track_type(mut self, track_type: TrackKind) -> Self {
        self.track_type = track_type;
        self
    }

    pub fn tagged(mut self) -> Self {
        self.require_tagged = true;
        self
    }

    /// Check one item against every predicate.
    pub fn matches(&self, item: &ItemRef<'_>) -> bool {
        let track = item.parent_track();
        let name_ok = self.name.as_deref().map_or(true, |n| item.name().contains(n));
        let track_ok = self
            .track_name
            .as_deref()
            .map_or(true, |n| track.name.contains(n));
        name_ok
            && track_ok
            && item.kind() == self.track_type
            && (!self.require_enabled || item.is_enabled())
            && (!self.require_unlocked || !track.locked)
            && (!self.require_tagged || !item.tags().is_empty())
    }

    /// Select items for processing.
    ///
    /// With an explicit selection only the selected GUIDs that pass the
    /// filter are returned, in selection order. Without one every track of
    /// the sequence is walked, skipping disabled or locked tracks up front
    /// when those checks are on.
    pub fn select<'a>(
        &self,
        sequence: &'a Sequence,
        selection: Option<&[String]>,
    ) -> Vec<ItemRef<'a>> {
        match selection {
            Some(guids) => {
                let selected: Vec<_> = guids
                    .iter()
                    .filter_map(|guid| sequence.find_item(guid))
                    .filter(|item| self.matches(item))
                    .collect();
                debug!(
                    requested = guids.len(),
                    valid = selected.len(),
                    "validated selected track items"
                );
                selected
            }
            None => sequence
                .tracks()
                .filter(|track| !(self.require_unlocked && track.locked))
                .filter(|track| !(self.require_enabled && !track.enabled))
                .flat_map(|track| track.items.iter().map(move |item| ItemRef::new(item, track)))
                .filter(|item| self.matches(item))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::TrackItem;
    use crate::tag::Tag;
    use crate::track::Track;
    use editmark_core::FrameRate;

    fn sequence() -> Sequence {
        let mut seq = Sequence::new("sq01", FrameRate::FPS_24);
        let mut hero = Track::new_video("Hero", 1);
        hero.add_item(TrackItem::new("shotA", 0, 10));
        let mut disabled = TrackItem::new("shotB", 20, 30);
        disabled.enabled = false;
        hero.add_item(disabled);

        let mut bg = Track::new_video("bg_plate", 2);
        let mut tagged = TrackItem::new("bgA", 0, 10);
        tagged.tags.push(Tag::new("Comment"));
        bg.add_item(tagged);

        let mut locked = Track::new_video("ref", 3);
        locked.locked = true;
        locked.add_item(TrackItem::new("refA", 0, 10));

        let mut audio = Track::new_audio("A1", 0);
        audio.add_item(TrackItem::new("dialog", 0, 10));

        seq.add_track(hero);
        seq.add_track(bg);
        seq.add_track(locked);
        seq.add_track(audio);
        seq
    }

    fn names(items: &[ItemRef<'_>]) -> Vec<String> {
        items.iter().map(|i| i.name().to_string()).collect()
    }

    #[test]
    fn test_select_all_skips_locked_and_disabled() {
        let seq = sequence();
        let items = ItemFilter::default().select(&seq, None);
        assert_eq!(names(&items), ["shotA", "bgA"]);
    }

    #[test]
    fn test_select_audio() {
        let seq = sequence();
        let filter = ItemFilter::default().with_track_type(TrackKind::Audio);
        assert_eq!(names(&filter.select(&seq, None)), ["dialog"]);
    }

    #[test]
    fn test_filters_are_combined() {
        let seq = sequence();
        let filter = ItemFilter::default().with_track_name("plate").tagged();
        assert_eq!(names(&filter.select(&seq, None)), ["bgA"]);
        let filter = ItemFilter::default().with_name("shot");
        assert_eq!(names(&filter.select(&seq, None)), ["shotA"]);
    }

    #[test]
    fn test_selection_drops_invalid_silently() {
        let seq = sequence();
        let guids: Vec<String> = seq
            .items()
            .filter(|i| matches!(i.name(), "shotB" | "refA" | "bgA" | "dialog"))
            .map(|i| i.guid().to_string())
            .collect();
        let items = ItemFilter::default().select(&seq, Some(guids.as_slice()));
        assert_eq!(names(&items), ["bgA"]);
    }

    #[test]
    fn test_selection_without_checks() {
        let seq = sequence();
        let guids: Vec<String> = seq.items().map(|i| i.guid().to_string()).collect();
        let filter = ItemFilter {
            require_enabled: false,
            require_unlocked: false,
            ..ItemFilter::default()
        };
        assert_eq!(
            names(&filter.select(&seq, Some(guids.as_slice()))),
            ["shotA", "shotB", "bgA", "refA"]
        );
    }
}
