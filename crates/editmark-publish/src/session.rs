//! Vertical-sync state of one create pass.

use std::collections::{HashMap, HashSet};

use editmark_core::FrameRange;
use indexmap::IndexMap;
use tracing::debug;

use crate::publish_clip::ResolvedHierarchy;

/// A hero clip registered under its range.
#[derive(Debug, Clone, PartialEq)]
pub struct HeroClip {
    /// GUID of the hero clip
    pub clip_index: String,
    pub resolved: ResolvedHierarchy,
}

/// Hero ranges and the product names handed out under them.
///
/// Owned by the batch that drives the converter and dropped (or
/// [`reset`](SyncSession::reset)) when the batch is done.
#[derive(Debug, Default)]
pub struct SyncSession {
    heroes: IndexMap<FrameRange, HeroClip>,
    /// Every product name in use under a hero, by hero clip name
    used_names: HashMap<String, HashSet<String>>,
}

impl SyncSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a hero clip's resolved data under its range.
    pub fn register_hero(
        &mut self,
        range: FrameRange,
        clip_index: impl Into<String>,
        data: ResolvedHierarchy,
    ) {
        self.used_names
            .entry(data.new_clip_name.clone())
            .or_default()
            .insert(data.product_name.clone());
        debug!(%range, clip = %data.new_clip_name, "registered hero range");
        self.heroes.insert(
            range,
            HeroClip {
                clip_index: clip_index.into(),
                resolved: data,
            },
        );
    }

    /// First hero whose range contains `range`.
    pub fn find_hero(&self, range: FrameRange) -> Option<&HeroClip> {
        self.heroes
            .iter()
            .find(|(hero_range, _)| hero_range.contains(range))
            .map(|(_, hero)| hero)
    }

    /// Give a dependent clip a product name that does not collide with the
    /// hero's or with any name already handed out under the same hero.
    ///
    /// A name equal to the hero's gets the track index appended. While the
    /// result is still taken the rename index is appended.
    pub fn disambiguate(
        &mut self,
        hero_clip_name: &str,
        hero_product_name: &str,
        nominal: &str,
        track_index: usize,
        rename_index: usize,
    ) -> String {
        let used = self
            .used_names
            .entry(hero_clip_name.to_string())
            .or_default();
        used.insert(hero_product_name.to_string());

        let mut name = nominal.to_string();
        if name == hero_product_name {
            name.push_str(&track_index.to_string());
        }
        let suffix = rename_index.to_string();
        while used.contains(&name) {
            name.push_str(&suffix);
        }
        used.insert(name.clone());
        name
    }

    pub fn hero_count(&self) -> usize {
        self.heroes.len()
    }

    /// Forget every hero range and used name.
    pub fn reset(&mut self) {
        self.heroes.clear();
        self.used_names.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn hero(name: &str) -> ResolvedHierarchy {
        ResolvedHierarchy {
            new_clip_name: "sh010".into(),
            product_name: name.into(),
            ..ResolvedHierarchy::default()
        }
    }

    #[test]
    fn test_find_hero_by_containment() {
        let mut session = SyncSession::new();
        session.register_hero(FrameRange::new(100, 150), "guid-a", hero("plateMain"));
        let found = session.find_hero(FrameRange::new(110, 140)).unwrap();
        assert_eq!(found.clip_index, "guid-a");
        assert!(session.find_hero(FrameRange::new(100, 150)).is_some());
        assert!(session.find_hero(FrameRange::new(90, 140)).is_none());
        assert!(session.find_hero(FrameRange::new(140, 160)).is_none());
    }

    #[test]
    fn test_disambiguate_same_track() {
        let mut session = SyncSession::new();
        session.register_hero(FrameRange::new(100, 150), "guid-a", hero("plateMain"));
        let first = session.disambiguate("sh010", "plateMain", "plateMain", 1, 1);
        let second = session.disambiguate("sh010", "plateMain", "plateMain", 1, 2);
        assert_eq!(first, "plateMain1");
        assert_eq!(second, "plateMain12");
    }

    #[test]
    fn test_distinct_nominal_name_kept() {
        let mut session = SyncSession::new();
        session.register_hero(FrameRange::new(100, 150), "guid-a", hero("plateMain"));
        assert_eq!(session.disambiguate("sh010", "plateMain", "plateBg", 2, 1), "plateBg");
        assert_eq!(session.disambiguate("sh010", "plateMain", "plateBg", 2, 3), "plateBg3");
    }

    #[test]
    fn test_suffixed_name_does_not_reuse_other_nominal() {
        let mut session = SyncSession::new();
        session.register_hero(FrameRange::new(100, 150), "guid-a", hero("plateMain"));
        // `main` capitalises onto the hero's name, `Main2` is its suffixed form
        let lower = session.disambiguate("sh010", "plateMain", "plateMain", 2, 1);
        let suffixed = session.disambiguate("sh010", "plateMain", "plateMain2", 3, 2);
        assert_eq!(lower, "plateMain2");
        assert_eq!(suffixed, "plateMain22");
    }

    #[test]
    fn test_names_kept_apart_per_hero() {
        let mut session = SyncSession::new();
        session.register_hero(FrameRange::new(0, 50), "guid-a", hero("plateMain"));
        assert_eq!(session.disambiguate("sh010", "plateMain", "plateBg", 2, 1), "plateBg");
        assert_eq!(session.disambiguate("sh020", "plateMain", "plateBg", 2, 4), "plateBg");
    }

    #[test]
    fn test_reset() {
        let mut session = SyncSession::new();
        session.register_hero(FrameRange::new(0, 10), "guid-a", hero("plateMain"));
        session.reset();
        assert_eq!(session.hero_count(), 0);
        assert!(session.find_hero(FrameRange::new(0, 10)).is_none());
    }

    proptest! {
        #[test]
        fn test_names_under_one_hero_never_collide(
            clips in proptest::collection::vec((0usize..4, 1usize..20), 1..12)
        ) {
            let mut session = SyncSession::new();
            session.register_hero(FrameRange::new(0, 100), "guid-a", hero("plateMain"));
            let mut seen = HashSet::from(["plateMain".to_string()]);
            for (track_index, rename_index) in clips {
                let nominal = if track_index % 2 == 0 { "plateMain" } else { "plateMain2" };
                let name = session.disambiguate(
                    "sh010", "plateMain", nominal, track_index, rename_index,
                );
                prop_assert!(seen.insert(name));
            }
        }
    }
}
