//! Follow-up command grammar for a shown result page.
//!
//! | Input | Command |
//! |-------|---------|
//! | `简历 N` | send candidate N's resume file |
//! | `信息 N` | send candidate N's details |
//! | `联系 N` / `联络 N` / `聯絡 N` | start the contact flow for candidate N |
//! | `A` | next page |
//! | `B` | end the search |
//!
//! Matching is case-insensitive and tolerates missing or extra whitespace
//! between the verb and the number.

use once_cell::sync::Lazy;
use regex::Regex;

static INDEXED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(简历|信息|联系|联络|聯絡)\s*(\d+)$").expect("valid command pattern")
});

/// A parsed follow-up command. Indices are 1-based global ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUpCommand {
    Resume(usize),
    Details(usize),
    Contact(usize),
    NextPage,
    End,
}

/// Verb recognised but without a usable number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandVerb {
    Resume,
    Details,
    Contact,
}

impl CommandVerb {
    /// Usage hint shown when the number is missing.
    pub fn usage(&self) -> &'static str {
        match self {
            Self::Resume => "请使用格式 '简历 X'，例如 '简历 1'。",
            Self::Details => "请使用格式 '信息 X'，例如 '信息 1'。",
            Self::Contact => "请使用格式 '联系 X' (或 '联络 X')，例如 '联系 1'。",
        }
    }
}

/// Result of parsing a reply in the selection phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedReply {
    Command(FollowUpCommand),
    /// A known verb with a missing or malformed number.
    Malformed(CommandVerb),
    Unknown,
}

impl FollowUpCommand {
    pub fn parse(input: &str) -> ParsedReply {
        let text = input.trim();
        if text.eq_ignore_ascii_case("a") {
            return ParsedReply::Command(Self::NextPage);
        }
        if text.eq_ignore_ascii_case("b") {
            return ParsedReply::Command(Self::End);
        }

        if let Some(caps) = INDEXED.captures(text) {
            let verb = verb_of(&caps[1]);
            return match caps[2].parse::<usize>() {
                Ok(n) => ParsedReply::Command(match verb {
                    CommandVerb::Resume => Self::Resume(n),
                    CommandVerb::Details => Self::Details(n),
                    CommandVerb::Contact => Self::Contact(n),
                }),
                Err(_) => ParsedReply::Malformed(verb),
            };
        }

        ["简历", "信息", "联系", "联络", "聯絡"]
            .iter()
            .find(|prefix| text.starts_with(*prefix))
            .map_or(ParsedReply::Unknown, |prefix| {
                ParsedReply::Malformed(verb_of(prefix))
            })
    }
}

fn verb_of(word: &str) -> CommandVerb {
    match word {
        "简历" => CommandVerb::Resume,
        "信息" => CommandVerb::Details,
        _ => CommandVerb::Contact,
    }
}
