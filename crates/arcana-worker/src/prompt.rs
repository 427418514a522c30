//! Prompt assembly for one reading.
//!
//! Two renderings of the same spread: the full card blocks quoted to the
//! model, with keywords and meaning excerpts, and the keyword-only
//! excerpts returned to pollers alongside the answer.

use crate::deck::{Deck, Drawn, Spread};
use arcana_core::{Mode, ReadingRequest};

/// Persona and output rules sent as the system message on every call.
pub const SYSTEM_PROMPT: &str = "\
You are a reclusive fortune teller living deep in a misted forest. You read \
tarot with a mysterious tone but give extremely practical advice.
Core rules:
1. Single complete reading: your reply must be one finished reading. Never \
append parenthetical notes, self-corrections, or repeated goodbyes after \
the closing line.
2. Forbidden: meta commentary such as \"(end of reading)\" or \"(note: ...)\". \
Stop immediately after the farewell.
3. Voice:
- Address the querent as \"little soul\" or \"wandering child\".
- Raspy delivery; an occasional \"heh heh...\" or \"hss...\" is fine.
- At most one odd observation about your surroundings, at the opening or \
the close, never both.
4. The past card covers what has already happened and its influence; the \
present card covers what is happening now; the future card carries the \
advice, concrete actions to take.

Reply format, strictly:
[Opening: greeting plus at most one environmental observation]
[Reading: a mysterious but practical interpretation of the three cards, \
aimed straight at the question]
[Closing: one short witchy farewell, then stop]";

fn role_label(role: &str) -> &'static str {
    match role {
        "past" => "Past",
        "present" => "Present",
        _ => "Future",
    }
}

fn keyword_line(deck: &Deck, drawn: Drawn) -> String {
    let card = deck.card(drawn.number);
    let keywords = card.keywords.for_orientation(drawn.orientation);
    if keywords.is_empty() {
        "(none)".to_string()
    } else {
        keywords.join(", ")
    }
}

/// One card block as the model sees it: header, keywords, and the meaning
/// excerpt for the requested focus.
fn format_card_full(deck: &Deck, role: &str, drawn: Drawn, mode: Mode) -> String {
    let card = deck.card(drawn.number);
    let lines = card
        .meanings
        .for_orientation(drawn.orientation)
        .meaning_lines(mode);
    let meaning_text = if lines.is_empty() {
        "  - (none)".to_string()
    } else {
        lines
            .iter()
            .map(|line| format!("  - {}", line))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "[{}] {} ({})\n- essence: {}\n- keywords: {}\n- {} meaning (excerpt):\n{}\n",
        role_label(role),
        card.name,
        drawn.orientation.as_str(),
        card.summary.core_for(drawn.orientation),
        keyword_line(deck, drawn),
        mode,
        meaning_text,
    )
}

/// One card block as pollers see it: header and keywords only.
fn format_card_excerpt(deck: &Deck, role: &str, drawn: Drawn) -> String {
    let card = deck.card(drawn.number);
    format!(
        "[{}] {} ({})\n- keywords: {}\n",
        role_label(role),
        card.name,
        drawn.orientation.as_str(),
        keyword_line(deck, drawn),
    )
}

/// Build the user message for one reading.
pub fn build_user_prompt(deck: &Deck, spread: &Spread, mode: Mode, request: &ReadingRequest) -> String {
    let mut blocks = String::new();
    for (role, drawn) in spread.roles() {
        blocks.push_str(&format_card_full(deck, role, drawn, mode));
        blocks.push('\n');
    }

    format!(
        "Use the querent's personal information and the three cards drawn to \
answer their question as closely as possible.\n\
Also weave the outcome into a short story of what may come to pass.\n\
Reading focus: {}.\n\
The three cards below are past/present/future; each may be upright or \
reversed.\n\n\
{}\
Querent's question: {}\n\
Querent's personal information: {}\n",
        mode, blocks, request.question, request.information,
    )
}

/// Keyword-only excerpts keyed by role, returned verbatim to pollers.
pub fn build_excerpts(deck: &Deck, spread: &Spread) -> serde_json::Map<String, serde_json::Value> {
    let mut excerpts = serde_json::Map::new();
    for (role, drawn) in spread.roles() {
        excerpts.insert(
            role.to_string(),
            serde_json::Value::String(format_card_excerpt(deck, role, drawn)),
        );
    }
    excerpts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::tests::write_test_deck;
    use crate::deck::Orientation;

    fn spread() -> Spread {
        Spread {
            past: Drawn {
                number: 3,
                orientation: Orientation::Upright,
            },
            present: Drawn {
                number: 11,
                orientation: Orientation::Reversed,
            },
            future: Drawn {
                number: 42,
                orientation: Orientation::Upright,
            },
        }
    }

    #[test]
    fn test_user_prompt_names_all_roles_and_inputs() {
        let dir = write_test_deck();
        let deck = Deck::load(dir.path()).unwrap();
        let request = ReadingRequest::new("love", "will it work out?", "quiet, practical");

        let prompt = build_user_prompt(&deck, &spread(), Mode::Love, &request);

        assert!(prompt.contains("[Past] Card 3 (upright)"));
        assert!(prompt.contains("[Present] Card 11 (reversed)"));
        assert!(prompt.contains("[Future] Card 42 (upright)"));
        assert!(prompt.contains("- essence: a leap taken in good faith"));
        assert!(prompt.contains("Reading focus: love."));
        assert!(prompt.contains("Querent's question: will it work out?"));
        assert!(prompt.contains("Querent's personal information: quiet, practical"));
    }

    #[test]
    fn test_user_prompt_quotes_focus_meanings() {
        let dir = write_test_deck();
        let deck = Deck::load(dir.path()).unwrap();
        let request = ReadingRequest::new("love", "will it work out?", "");

        let prompt = build_user_prompt(&deck, &spread(), Mode::Love, &request);

        // Upright cards quote the love short and long lines.
        assert!(prompt.contains("openness pays off"));
        assert!(prompt.contains("Someone new is closer than you think."));
        // The reversed card has no love text and falls back to general.
        assert!(prompt.contains("Look before leaping."));
    }

    #[test]
    fn test_excerpts_carry_keywords_but_no_meanings() {
        let dir = write_test_deck();
        let deck = Deck::load(dir.path()).unwrap();

        let excerpts = build_excerpts(&deck, &spread());
        assert_eq!(excerpts.len(), 3);

        let past = excerpts["past"].as_str().unwrap();
        assert!(past.contains("[Past] Card 3 (upright)"));
        assert!(past.contains("beginnings, trust"));
        assert!(!past.contains("meaning"));

        let present = excerpts["present"].as_str().unwrap();
        assert!(present.contains("hesitation, folly"));
    }

    #[test]
    fn test_system_prompt_is_selfcontained() {
        assert!(SYSTEM_PROMPT.contains("little soul"));
        assert!(SYSTEM_PROMPT.contains("advice"));
    }
}
