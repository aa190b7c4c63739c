//! Location cascade state machine.
//!
//! Four ordered levels (province, city, district, subdistrict) where selecting
//! a parent clears everything below it. Option lists are fetched
//! asynchronously; every selection bumps a generation counter and fetch
//! results carry the generation they were requested under, so a slow response
//! that arrives after the parent changed again is discarded instead of
//! overwriting fresher state.
//!
//! The subdistrict level is a type-ahead over a fetched candidate list rather
//! than a closed select; choosing a candidate auto-fills the postal code.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Province,
    City,
    District,
    Subdistrict,
}

impl Level {
    pub const ALL: [Level; 4] = [
        Level::Province,
        Level::City,
        Level::District,
        Level::Subdistrict,
    ];

    fn index(self) -> usize {
        match self {
            Level::Province => 0,
            Level::City => 1,
            Level::District => 2,
            Level::Subdistrict => 3,
        }
    }

    pub fn child(self) -> Option<Level> {
        match self {
            Level::Province => Some(Level::City),
            Level::City => Some(Level::District),
            Level::District => Some(Level::Subdistrict),
            Level::Subdistrict => None,
        }
    }
}

/// One selectable location at any level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    pub id: i64,
    pub name: String,
}

/// Subdistrict type-ahead candidate as returned by the destination search.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubdistrictCandidate {
    pub id: i64,
    pub label: String,
    pub subdistrict: String,
    pub zip_code: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct Cascade {
    selected: [Option<Place>; 4],
    /// Option lists for the three closed-select levels.
    options: [Vec<Place>; 3],
    /// Candidate pool for the subdistrict type-ahead.
    candidates: Vec<SubdistrictCandidate>,
    postal_code: Option<String>,
    generation: u64,
}

impl Cascade {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self, level: Level) -> Option<&Place> {
        self.selected[level.index()].as_ref()
    }

    pub fn options(&self, level: Level) -> &[Place] {
        match level {
            Level::Subdistrict => &[],
            _ => &self.options[level.index()],
        }
    }

    pub fn candidates(&self) -> &[SubdistrictCandidate] {
        &self.candidates
    }

    pub fn postal_code(&self) -> Option<&str> {
        self.postal_code.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Selects a value at `level`, clearing all deeper selections and option
    /// lists. Returns the new generation, which must accompany the follow-up
    /// fetch for the child level's options.
    pub fn select(&mut self, level: Level, place: Place) -> u64 {
        self.reset_below(level);
        self.selected[level.index()] = Some(place);
        self.generation += 1;
        self.generation
    }

    /// Clears selections and option lists strictly below `level`.
    fn reset_below(&mut self, level: Level) {
        for l in Level::ALL.iter().filter(|l| **l > level) {
            self.selected[l.index()] = None;
            if *l != Level::Subdistrict {
                self.options[l.index()].clear();
            }
        }
        if level < Level::Subdistrict {
            self.candidates.clear();
            self.postal_code = None;
        }
    }

    /// Installs fetched options for a closed-select level. Returns `false`
    /// (and changes nothing) when the result is stale, i.e. a newer selection
    /// has been made since the fetch started.
    pub fn apply_options(&mut self, level: Level, generation: u64, options: Vec<Place>) -> bool {
        if generation != self.generation || level == Level::Subdistrict {
            return false;
        }
        self.options[level.index()] = options;
        true
    }

    /// Installs the subdistrict candidate pool, subject to the same staleness
    /// rule as [`Cascade::apply_options`].
    pub fn apply_candidates(&mut self, generation: u64, candidates: Vec<SubdistrictCandidate>) -> bool {
        if generation != self.generation {
            return false;
        }
        self.candidates = candidates;
        true
    }

    /// Type-ahead filter over the candidate pool, case-insensitive substring
    /// match against the candidate's subdistrict name and full label.
    pub fn matches(&self, query: &str) -> Vec<&SubdistrictCandidate> {
        let q = query.to_lowercase();
        self.candidates
            .iter()
            .filter(|c| {
                c.subdistrict.to_lowercase().contains(&q) || c.label.to_lowercase().contains(&q)
            })
            .collect()
    }

    /// Confirms a subdistrict candidate, auto-filling the postal code when the
    /// candidate carries one.
    pub fn choose_subdistrict(&mut self, candidate: &SubdistrictCandidate) {
        self.selected[Level::Subdistrict.index()] = Some(Place {
            id: candidate.id,
            name: candidate.subdistrict.clone(),
        });
        if candidate.zip_code.is_some() {
            self.postal_code = candidate.zip_code.clone();
        }
        self.generation += 1;
    }

    /// Finest-grained destination reached so far, used as the rate lookup
    /// destination.
    pub fn destination_id(&self) -> Option<i64> {
        self.selected(Level::Subdistrict)
            .or_else(|| self.selected(Level::District))
            .map(|p| p.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(id: i64, name: &str) -> Place {
        Place {
            id,
            name: name.into(),
        }
    }

    fn candidate(id: i64, name: &str, zip: Option<&str>) -> SubdistrictCandidate {
        SubdistrictCandidate {
            id,
            label: format!("{name}, Panakkukang, Makassar"),
            subdistrict: name.into(),
            zip_code: zip.map(String::from),
        }
    }

    #[test]
    fn province_change_clears_all_children() {
        let mut c = Cascade::new();
        let g = c.select(Level::Province, place(28, "Sulawesi Selatan"));
        c.apply_options(Level::City, g, vec![place(458, "Makassar")]);
        let g = c.select(Level::City, place(458, "Makassar"));
        c.apply_options(Level::District, g, vec![place(6736, "Panakkukang")]);
        let g = c.select(Level::District, place(6736, "Panakkukang"));
        c.apply_candidates(g, vec![candidate(90231, "Masale", Some("90231"))]);
        c.choose_subdistrict(&candidate(90231, "Masale", Some("90231")));

        c.select(Level::Province, place(9, "Jawa Barat"));
        assert!(c.selected(Level::City).is_none());
        assert!(c.selected(Level::District).is_none());
        assert!(c.selected(Level::Subdistrict).is_none());
        assert!(c.options(Level::City).is_empty());
        assert!(c.options(Level::District).is_empty());
        assert!(c.candidates().is_empty());
        assert!(c.postal_code().is_none());
    }

    #[test]
    fn stale_fetch_results_are_discarded() {
        let mut c = Cascade::new();
        let first = c.select(Level::Province, place(28, "Sulawesi Selatan"));
        // Parent changes again before the first fetch resolves.
        let second = c.select(Level::Province, place(9, "Jawa Barat"));

        assert!(!c.apply_options(Level::City, first, vec![place(458, "Makassar")]));
        assert!(c.options(Level::City).is_empty());

        assert!(c.apply_options(Level::City, second, vec![place(22, "Bandung")]));
        assert_eq!(c.options(Level::City), &[place(22, "Bandung")]);
    }

    #[test]
    fn subdistrict_typeahead_matches_and_fills_postal_code() {
        let mut c = Cascade::new();
        let g = c.select(Level::District, place(6736, "Panakkukang"));
        c.apply_candidates(
            g,
            vec![
                candidate(90231, "Masale", Some("90231")),
                candidate(90233, "Tamamaung", Some("90233")),
            ],
        );

        let hits = c.matches("masa");
        assert_eq!(hits.len(), 1);
        let hit = hits[0].clone();
        c.choose_subdistrict(&hit);
        assert_eq!(c.selected(Level::Subdistrict).unwrap().name, "Masale");
        assert_eq!(c.postal_code(), Some("90231"));
        assert_eq!(c.destination_id(), Some(90231));
    }

    #[test]
    fn destination_falls_back_to_district() {
        let mut c = Cascade::new();
        c.select(Level::District, place(6736, "Panakkukang"));
        assert_eq!(c.destination_id(), Some(6736));
    }
}
