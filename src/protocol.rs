//! Decision protocols: how the operator's answer becomes a `Decision`.
//!
//! `MenuProtocol` offers all four decisions as a numbered menu.
//! `ConfirmProtocol` is the stricter yes/no cascade, which cannot reach
//! "replace but keep old label".

use clap::ValueEnum;
use std::io::{BufRead, Write};

use crate::console::{Console, PromptError};
use crate::engine::Decision;

pub trait DecisionProtocol {
    /// Ask until the operator gives a valid answer. Invalid answers are
    /// reported and re-asked; they never consume the candidate.
    fn decide<R: BufRead, W: Write>(
        &self,
        console: &mut Console<R, W>,
    ) -> Result<Decision, PromptError>;
}

pub struct MenuProtocol;

impl MenuProtocol {
    pub fn parse(response: &str) -> Option<Decision> {
        match response {
            "1" => Some(Decision::ReplaceAndDeleteOld),
            "2" => Some(Decision::ReplaceAndKeepOld),
            "3" => Some(Decision::DeleteCandidate),
            "4" => Some(Decision::NoChange),
            _ => None,
        }
    }
}

impl DecisionProtocol for MenuProtocol {
    fn decide<R: BufRead, W: Write>(
        &self,
        console: &mut Console<R, W>,
    ) -> Result<Decision, PromptError> {
        for (i, decision) in Decision::ALL.iter().enumerate() {
            console.say(format!("{}: {}", i + 1, decision.describe()))?;
        }
        loop {
            let response = console.prompt("Choose option 1, 2, 3, or 4: ")?;
            match Self::parse(&response) {
                Some(decision) => return Ok(decision),
                None => {
                    console.say("Invalid option, try again")?;
                    console.blank()?;
                }
            }
        }
    }
}

pub struct ConfirmProtocol;

/// Accepts the usual spellings of yes and no, case-insensitively.
pub fn parse_yes_no(response: &str) -> Option<bool> {
    match response.to_lowercase().as_str() {
        "y" | "yes" | "t" | "true" | "on" | "1" => Some(true),
        "n" | "no" | "f" | "false" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn confirm<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    question: &str,
) -> Result<bool, PromptError> {
    loop {
        let response = console.prompt(&format!("{} [y/n]: ", question))?;
        match parse_yes_no(&response) {
            Some(answer) => return Ok(answer),
            None => console.say("Please answer yes or no")?,
        }
    }
}

impl DecisionProtocol for ConfirmProtocol {
    fn decide<R: BufRead, W: Write>(
        &self,
        console: &mut Console<R, W>,
    ) -> Result<Decision, PromptError> {
        if confirm(
            console,
            "Replace current label with this record and delete the old label?",
        )? {
            return Ok(Decision::ReplaceAndDeleteOld);
        }
        if confirm(console, "Delete matching record from database?")? {
            return Ok(Decision::DeleteCandidate);
        }
        Ok(Decision::NoChange)
    }
}

/// Protocol selectable from the command line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ProtocolKind {
    /// Numbered menu with all four decisions
    #[default]
    Menu,
    /// Two yes/no questions
    Confirm,
}

impl DecisionProtocol for ProtocolKind {
    fn decide<R: BufRead, W: Write>(
        &self,
        console: &mut Console<R, W>,
    ) -> Result<Decision, PromptError> {
        match self {
            ProtocolKind::Menu => MenuProtocol.decide(console),
            ProtocolKind::Confirm => ConfirmProtocol.decide(console),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn console(input: &str) -> Console<Cursor<String>, Vec<u8>> {
        Console::new(Cursor::new(input.to_string()), Vec::new())
    }

    fn output(console: &Console<Cursor<String>, Vec<u8>>) -> String {
        String::from_utf8(console.output().clone()).unwrap()
    }

    #[test]
    fn test_menu_maps_each_option() {
        for (input, expected) in ["1\n", "2\n", "3\n", "4\n"].iter().zip(Decision::ALL) {
            let mut c = console(input);
            assert_eq!(MenuProtocol.decide(&mut c).unwrap(), expected);
        }
    }

    #[test]
    fn test_menu_reprompts_on_invalid() {
        let mut c = console("9\nabc\n3\n");
        assert_eq!(
            MenuProtocol.decide(&mut c).unwrap(),
            Decision::DeleteCandidate
        );
        let out = output(&c);
        assert_eq!(out.matches("Invalid option, try again").count(), 2);
        assert_eq!(out.matches("Choose option 1, 2, 3, or 4: ").count(), 3);
        assert!(out.contains("1: Delete current label and replace with this record"));
    }

    #[test]
    fn test_menu_interrupt_propagates() {
        let mut c = console("9\n");
        assert!(matches!(
            MenuProtocol.decide(&mut c),
            Err(PromptError::Interrupted)
        ));
    }

    #[test]
    fn test_parse_yes_no() {
        assert_eq!(parse_yes_no("Y"), Some(true));
        assert_eq!(parse_yes_no("true"), Some(true));
        assert_eq!(parse_yes_no("Off"), Some(false));
        assert_eq!(parse_yes_no("0"), Some(false));
        assert_eq!(parse_yes_no("maybe"), None);
        assert_eq!(parse_yes_no(""), None);
    }

    #[test]
    fn test_confirm_cascade() {
        assert_eq!(
            ConfirmProtocol.decide(&mut console("yes\n")).unwrap(),
            Decision::ReplaceAndDeleteOld
        );
        assert_eq!(
            ConfirmProtocol.decide(&mut console("n\ny\n")).unwrap(),
            Decision::DeleteCandidate
        );
        assert_eq!(
            ConfirmProtocol.decide(&mut console("no\nno\n")).unwrap(),
            Decision::NoChange
        );
    }

    #[test]
    fn test_confirm_reprompts_on_invalid() {
        let mut c = console("sure\nn\nwhat\nn\n");
        assert_eq!(ConfirmProtocol.decide(&mut c).unwrap(), Decision::NoChange);
        assert_eq!(output(&c).matches("Please answer yes or no").count(), 2);
    }

    #[test]
    fn test_kind_delegates() {
        assert_eq!(
            ProtocolKind::Confirm.decide(&mut console("0\n1\n")).unwrap(),
            Decision::DeleteCandidate
        );
        assert_eq!(
            ProtocolKind::default().decide(&mut console("2\n")).unwrap(),
            Decision::ReplaceAndKeepOld
        );
    }
}
