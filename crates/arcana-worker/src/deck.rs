//! The 78-card deck and spread drawing.
//!
//! Card meanings live on disk as one JSON file per card, numbered 0..=77,
//! loaded once at startup. A spread is three distinct cards in the
//! past/present/future roles, each independently upright or reversed.

use arcana_core::{ArcanaError, Mode, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DECK_SIZE: usize = 78;

/// How many long-meaning lines a prompt quotes per card.
const MAX_MEANING_LINES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Upright,
    Reversed,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Upright => "upright",
            Orientation::Reversed => "reversed",
        }
    }
}

/// One card's meaning file.
#[derive(Debug, Clone, Deserialize)]
pub struct Card {
    pub id: String,
    pub name: String,
    pub arcana: String,
    #[serde(default)]
    pub keywords: Keywords,
    pub summary: Summary,
    pub meanings: Meanings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Keywords {
    #[serde(default)]
    pub upright: Vec<String>,
    #[serde(default)]
    pub reversed: Vec<String>,
}

impl Keywords {
    pub fn for_orientation(&self, orientation: Orientation) -> &[String] {
        match orientation {
            Orientation::Upright => &self.upright,
            Orientation::Reversed => &self.reversed,
        }
    }
}

/// One-line essence per orientation. Card files carry more (a story,
/// extra commentary); only the core lines feed the prompt.
#[derive(Debug, Clone, Deserialize)]
pub struct Summary {
    pub core_upright: String,
    pub core_reversed: String,
}

impl Summary {
    pub fn core_for(&self, orientation: Orientation) -> &str {
        match orientation {
            Orientation::Upright => &self.core_upright,
            Orientation::Reversed => &self.core_reversed,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Meanings {
    pub upright: MeaningBlock,
    pub reversed: MeaningBlock,
}

impl Meanings {
    pub fn for_orientation(&self, orientation: Orientation) -> &MeaningBlock {
        match orientation {
            Orientation::Upright => &self.upright,
            Orientation::Reversed => &self.reversed,
        }
    }
}

/// Meaning text for one orientation of one card.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeaningBlock {
    #[serde(default)]
    pub general: Vec<String>,
    #[serde(default)]
    pub love: Vec<String>,
    #[serde(default)]
    pub career: Vec<String>,
    #[serde(default)]
    pub money: Vec<String>,
    #[serde(default)]
    pub short: ShortMeanings,
}

/// One-line summaries per focus. The general focus has no short form and
/// falls back to the long general lines.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShortMeanings {
    #[serde(default)]
    pub love: String,
    #[serde(default)]
    pub career: String,
    #[serde(default)]
    pub money: String,
}

impl MeaningBlock {
    /// Long-meaning lists to try for a focus, most specific first. Every
    /// focus falls back to the general list when its own is empty.
    fn long_candidates(&self, mode: Mode) -> [&Vec<String>; 2] {
        match mode {
            Mode::General => [&self.general, &self.general],
            Mode::Love => [&self.love, &self.general],
            Mode::Career => [&self.career, &self.general],
            Mode::Money => [&self.money, &self.general],
        }
    }

    fn short_for(&self, mode: Mode) -> Option<&str> {
        let text = match mode {
            Mode::General => return None,
            Mode::Love => self.short.love.as_str(),
            Mode::Career => self.short.career.as_str(),
            Mode::Money => self.short.money.as_str(),
        };
        let text = text.trim();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// The lines a prompt quotes for this orientation and focus: the short
    /// summary if there is one, then up to a handful of lines from the
    /// first non-empty long list. Duplicates are dropped.
    pub fn meaning_lines(&self, mode: Mode) -> Vec<String> {
        let mut lines: Vec<String> = Vec::new();

        if let Some(short) = self.short_for(mode) {
            lines.push(short.to_string());
        }

        for candidate in self.long_candidates(mode) {
            if candidate.is_empty() {
                continue;
            }
            lines.extend(
                candidate
                    .iter()
                    .take(MAX_MEANING_LINES)
                    .map(|line| line.trim().to_string())
                    .filter(|line| !line.is_empty()),
            );
            break;
        }

        let mut seen = std::collections::HashSet::new();
        lines.retain(|line| seen.insert(line.clone()));
        lines
    }
}

/// One drawn position: a card number plus its orientation.
#[derive(Debug, Clone, Copy)]
pub struct Drawn {
    pub number: usize,
    pub orientation: Orientation,
}

/// Three cards in the past/present/future roles.
#[derive(Debug, Clone, Copy)]
pub struct Spread {
    pub past: Drawn,
    pub present: Drawn,
    pub future: Drawn,
}

impl Spread {
    /// Positions in role order, with their wire-level role names.
    pub fn roles(&self) -> [(&'static str, Drawn); 3] {
        [
            ("past", self.past),
            ("present", self.present),
            ("future", self.future),
        ]
    }
}

/// Card fields pollers see. Meaning text stays out of responses; the
/// answer already paraphrases it.
#[derive(Debug, Clone, Serialize)]
pub struct SlimCard {
    pub number: usize,
    pub orientation: Orientation,
    pub id: String,
    pub name: String,
    pub arcana: String,
}

/// The full deck, loaded once and shared read-only.
#[derive(Debug)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// Load all card files from `dir`. Every card 0..=77 must be present
    /// and decodable; a partial deck is a configuration error.
    pub fn load(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(ArcanaError::Config {
                message: format!("card meaning directory not found: {}", dir.display()),
            });
        }

        let mut cards = Vec::with_capacity(DECK_SIZE);
        for number in 0..DECK_SIZE {
            let path = dir.join(format!("{}.json", number));
            let raw = std::fs::read_to_string(&path).map_err(|e| ArcanaError::Config {
                message: format!("missing card file {}: {}", path.display(), e),
            })?;
            let card: Card = serde_json::from_str(&raw).map_err(|e| ArcanaError::Config {
                message: format!("undecodable card file {}: {}", path.display(), e),
            })?;
            cards.push(card);
        }

        Ok(Self { cards })
    }

    pub fn card(&self, number: usize) -> &Card {
        &self.cards[number]
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Draw a fresh three-card spread with the thread-local generator.
    pub fn draw(&self) -> Spread {
        let mut rng = rand::rng();
        self.draw_with_rng(&mut rng)
    }

    /// Draw with a caller-supplied generator. The three card numbers are
    /// distinct; orientations are independent coin flips.
    pub fn draw_with_rng<R: Rng>(&self, rng: &mut R) -> Spread {
        let numbers = rand::seq::index::sample(rng, self.cards.len(), 3).into_vec();
        let mut draw_one = |number: usize| Drawn {
            number,
            orientation: if rng.random_bool(0.5) {
                Orientation::Upright
            } else {
                Orientation::Reversed
            },
        };

        Spread {
            past: draw_one(numbers[0]),
            present: draw_one(numbers[1]),
            future: draw_one(numbers[2]),
        }
    }

    /// Poller-facing projection of one drawn position.
    pub fn slim(&self, drawn: Drawn) -> SlimCard {
        let card = self.card(drawn.number);
        SlimCard {
            number: drawn.number,
            orientation: drawn.orientation,
            id: card.id.clone(),
            name: card.name.clone(),
            arcana: card.arcana.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    pub(crate) fn card_json(number: usize) -> String {
        serde_json::json!({
            "id": format!("card-{}", number),
            "name": format!("Card {}", number),
            "arcana": if number < 22 { "major" } else { "minor" },
            "keywords": {
                "upright": ["beginnings", "trust"],
                "reversed": ["hesitation", "folly"]
            },
            "summary": {
                "story": ["A traveler stands at the cliff edge."],
                "core_upright": "a leap taken in good faith",
                "core_reversed": "a leap taken blindly"
            },
            "meanings": {
                "upright": {
                    "general": ["Fresh starts reward courage.", "Pack light."],
                    "love": ["Someone new is closer than you think."],
                    "career": [],
                    "money": ["Spend on the journey, not the souvenirs."],
                    "short": {
                        "love": "openness pays off",
                        "career": "",
                        "money": "small bets only"
                    }
                },
                "reversed": {
                    "general": ["Look before leaping."],
                    "love": [],
                    "career": ["A rushed move costs twice."],
                    "money": [],
                    "short": { "love": "", "career": "wait a week", "money": "" }
                }
            }
        })
        .to_string()
    }

    pub(crate) fn write_test_deck() -> TempDir {
        let dir = TempDir::new().expect("temp dir");
        for number in 0..DECK_SIZE {
            std::fs::write(dir.path().join(format!("{}.json", number)), card_json(number))
                .expect("write card file");
        }
        dir
    }

    #[test]
    fn test_load_full_deck() {
        let dir = write_test_deck();
        let deck = Deck::load(dir.path()).unwrap();
        assert_eq!(deck.len(), DECK_SIZE);
        assert_eq!(deck.card(0).id, "card-0");
        assert_eq!(deck.card(77).arcana, "minor");
    }

    #[test]
    fn test_load_rejects_partial_deck() {
        let dir = write_test_deck();
        std::fs::remove_file(dir.path().join("40.json")).unwrap();

        let err = Deck::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("40.json"), "got: {}", err);
    }

    #[test]
    fn test_load_rejects_missing_directory() {
        let err = Deck::load(Path::new("/nonexistent/cards")).unwrap_err();
        assert!(matches!(err, ArcanaError::Config { .. }));
    }

    #[test]
    fn test_draw_yields_distinct_numbers() {
        let dir = write_test_deck();
        let deck = Deck::load(dir.path()).unwrap();

        for _ in 0..50 {
            let spread = deck.draw();
            let numbers = [
                spread.past.number,
                spread.present.number,
                spread.future.number,
            ];
            assert!(numbers.iter().all(|n| *n < DECK_SIZE));
            assert_ne!(numbers[0], numbers[1]);
            assert_ne!(numbers[0], numbers[2]);
            assert_ne!(numbers[1], numbers[2]);
        }
    }

    #[test]
    fn test_draw_with_seeded_rng_is_deterministic() {
        use rand::{rngs::StdRng, SeedableRng};

        let dir = write_test_deck();
        let deck = Deck::load(dir.path()).unwrap();

        let first = deck.draw_with_rng(&mut StdRng::seed_from_u64(7));
        let second = deck.draw_with_rng(&mut StdRng::seed_from_u64(7));

        assert_eq!(first.past.number, second.past.number);
        assert_eq!(first.present.number, second.present.number);
        assert_eq!(first.future.number, second.future.number);
        assert_eq!(first.past.orientation, second.past.orientation);
    }

    #[test]
    fn test_meaning_lines_short_then_long() {
        let card: Card = serde_json::from_str(&card_json(0)).unwrap();
        let lines = card.meanings.upright.meaning_lines(Mode::Love);
        assert_eq!(lines[0], "openness pays off");
        assert!(lines.contains(&"Someone new is closer than you think.".to_string()));
    }

    #[test]
    fn test_meaning_lines_fall_back_to_general() {
        let card: Card = serde_json::from_str(&card_json(0)).unwrap();
        // Upright career has no long list and an empty short entry.
        let lines = card.meanings.upright.meaning_lines(Mode::Career);
        assert_eq!(
            lines,
            vec![
                "Fresh starts reward courage.".to_string(),
                "Pack light.".to_string()
            ]
        );
    }

    #[test]
    fn test_meaning_lines_general_has_no_short() {
        let card: Card = serde_json::from_str(&card_json(0)).unwrap();
        let lines = card.meanings.upright.meaning_lines(Mode::General);
        assert_eq!(lines[0], "Fresh starts reward courage.");
    }

    #[test]
    fn test_slim_projection_excludes_meanings() {
        let dir = write_test_deck();
        let deck = Deck::load(dir.path()).unwrap();

        let slim = deck.slim(Drawn {
            number: 7,
            orientation: Orientation::Reversed,
        });
        let json = serde_json::to_value(&slim).unwrap();
        assert_eq!(json["number"], 7);
        assert_eq!(json["orientation"], "reversed");
        assert_eq!(json["id"], "card-7");
        assert!(json.get("meanings").is_none());
        assert!(json.get("keywords").is_none());
    }
}
