//! Scanner for dice expressions.
//!
//! Input is lower-cased and stripped of all whitespace before scanning, so
//! `2D20 kh1 + 3` and `2d20kh1+3` are the same expression. Offsets reported
//! in errors refer to that normalized form.

use core::fmt;

use crate::DiceError;

pub const MAX_DICE: u64 = 100;
pub const MAX_SIDES: u64 = 1000;
pub const MAX_LITERAL: u64 = 10_000;
pub const MAX_TERMS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Plus,
    Minus,
}

impl Sign {
    #[must_use]
    pub const fn apply(self, value: i64) -> i64 {
        match self {
            Self::Plus => value,
            Self::Minus => -value,
        }
    }

    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Plus => '+',
            Self::Minus => '-',
        }
    }
}

/// Which of the rolled dice count towards the subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keep {
    All,
    Highest(u32),
    Lowest(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvantageKind {
    Advantage,
    Disadvantage,
}

impl AdvantageKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Advantage => "adv",
            Self::Disadvantage => "dis",
        }
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Advantage => "Advantage",
            Self::Disadvantage => "Disadvantage",
        }
    }
}

/// `[count]d<sides>[(kh|kl)<n>]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceTerm {
    pub count: u32,
    pub sides: u32,
    pub keep: Keep,
}

impl fmt::Display for DiceTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)?;
        match self.keep {
            Keep::All => Ok(()),
            Keep::Highest(n) => write!(f, "kh{n}"),
            Keep::Lowest(n) => write!(f, "kl{n}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Term {
    Dice(DiceTerm),
    Advantage(AdvantageKind),
    Number(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollToken {
    pub sign: Sign,
    pub term: Term,
}

/// A single dice or advantage term followed by a chain of signed integer
/// modifiers, e.g. `2d6+1-2` or `adv+5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleRoll {
    pub term: Term,
    pub modifier: i64,
}

const DEFAULT_TOKEN: RollToken = RollToken {
    sign: Sign::Plus,
    term: Term::Dice(DiceTerm {
        count: 1,
        sides: 20,
        keep: Keep::All,
    }),
};

pub(crate) fn normalize(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Splits an expression into signed terms, left to right.
///
/// A blank expression is the default `1d20`.
///
/// # Errors
///
/// [`DiceError::Syntax`] when no term starts at some offset,
/// [`DiceError::OutOfRange`] for dice counts, sides, literals or term counts
/// beyond the supported limits.
pub fn tokenize(input: &str) -> Result<Vec<RollToken>, DiceError> {
    let normalized = normalize(input);
    if normalized.is_empty() {
        return Ok(vec![DEFAULT_TOKEN]);
    }

    let mut cursor = Cursor::new(&normalized);
    let mut tokens = Vec::new();
    while !cursor.is_done() {
        let start = cursor.pos;
        let sign = cursor.sign().unwrap_or(Sign::Plus);
        let Some(term) = cursor.term()? else {
            return Err(DiceError::syntax(&normalized, start));
        };
        tokens.push(RollToken { sign, term });
        if tokens.len() > MAX_TERMS {
            return Err(DiceError::OutOfRange {
                what: "term count",
                value: tokens.len() as u64,
                min: 1,
                max: MAX_TERMS as u64,
            });
        }
    }
    Ok(tokens)
}

/// Parses the stricter single-term grammar: the whole string must be one
/// dice or advantage term plus optional signed integer modifiers.
///
/// # Errors
///
/// [`DiceError::Syntax`] when the string is not of that shape,
/// [`DiceError::OutOfRange`] as for [`tokenize`].
pub fn parse_single(input: &str) -> Result<SingleRoll, DiceError> {
    let normalized = normalize(input);
    let mut cursor = Cursor::new(&normalized);

    let term = if let Some(kind) = cursor.advantage() {
        Term::Advantage(kind)
    } else if let Some(dice) = cursor.dice()? {
        Term::Dice(dice)
    } else {
        return Err(DiceError::syntax(&normalized, 0));
    };

    let mut modifier = 0_i64;
    while !cursor.is_done() {
        let start = cursor.pos;
        let (Some(sign), Some(value)) = (cursor.sign(), cursor.digits()) else {
            return Err(DiceError::syntax(&normalized, start));
        };
        let value = check_range("modifier", value, 0, MAX_LITERAL)?;
        modifier += sign.apply(i64::from(value));
    }

    Ok(SingleRoll { term, modifier })
}

fn check_range(what: &'static str, value: u64, min: u64, max: u64) -> Result<u32, DiceError> {
    if (min..=max).contains(&value) {
        // max never exceeds u32::MAX
        Ok(u32::try_from(value).unwrap_or(u32::MAX))
    } else {
        Err(DiceError::OutOfRange {
            what,
            value,
            min,
            max,
        })
    }
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    const fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    const fn is_done(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn eat(&mut self, literal: &str) -> bool {
        let matched = self
            .src
            .get(self.pos..)
            .is_some_and(|rest| rest.starts_with(literal));
        if matched {
            self.pos += literal.len();
        }
        matched
    }

    fn sign(&mut self) -> Option<Sign> {
        let sign = match self.peek()? {
            b'+' => Sign::Plus,
            b'-' => Sign::Minus,
            _ => return None,
        };
        self.pos += 1;
        Some(sign)
    }

    /// Saturates instead of overflowing; range checks reject huge values.
    fn digits(&mut self) -> Option<u64> {
        let start = self.pos;
        let mut value = 0_u64;
        while let Some(b) = self.peek().filter(u8::is_ascii_digit) {
            value = value.saturating_mul(10).saturating_add(u64::from(b - b'0'));
            self.pos += 1;
        }
        (self.pos > start).then_some(value)
    }

    fn term(&mut self) -> Result<Option<Term>, DiceError> {
        if let Some(dice) = self.dice()? {
            return Ok(Some(Term::Dice(dice)));
        }
        if let Some(kind) = self.advantage() {
            return Ok(Some(Term::Advantage(kind)));
        }
        match self.digits() {
            Some(value) => Ok(Some(Term::Number(check_range(
                "number",
                value,
                0,
                MAX_LITERAL,
            )?))),
            None => Ok(None),
        }
    }

    fn advantage(&mut self) -> Option<AdvantageKind> {
        if self.eat("adv") {
            Some(AdvantageKind::Advantage)
        } else if self.eat("dis") {
            Some(AdvantageKind::Disadvantage)
        } else {
            None
        }
    }

    fn dice(&mut self) -> Result<Option<DiceTerm>, DiceError> {
        let start = self.pos;
        let count = self.digits();
        let sides = if self.eat("d") { self.digits() } else { None };
        let Some(sides) = sides else {
            self.pos = start;
            return Ok(None);
        };

        let count = check_range("dice count", count.unwrap_or(1), 1, MAX_DICE)?;
        let sides = check_range("sides", sides, 1, MAX_SIDES)?;
        let keep = self.keep();
        Ok(Some(DiceTerm { count, sides, keep }))
    }

    /// A suffix without a number is left unconsumed.
    fn keep(&mut self) -> Keep {
        let mark = self.pos;
        let highest = if self.eat("kh") {
            true
        } else if self.eat("kl") {
            false
        } else {
            return Keep::All;
        };
        let Some(n) = self.digits() else {
            self.pos = mark;
            return Keep::All;
        };
        let n = u32::try_from(n).unwrap_or(u32::MAX);
        if highest {
            Keep::Highest(n)
        } else {
            Keep::Lowest(n)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dice(count: u32, sides: u32, keep: Keep) -> Term {
        Term::Dice(DiceTerm { count, sides, keep })
    }

    #[test]
    fn blank_input_is_one_d20() {
        assert_eq!(tokenize("   ").unwrap(), vec![DEFAULT_TOKEN]);
        assert_eq!(tokenize("").unwrap(), vec![DEFAULT_TOKEN]);
    }

    #[test]
    fn mixed_terms_with_whitespace_and_case() {
        let tokens = tokenize("2D20 KH1 + 1d6 - 2").unwrap();
        assert_eq!(
            tokens,
            vec![
                RollToken {
                    sign: Sign::Plus,
                    term: dice(2, 20, Keep::Highest(1)),
                },
                RollToken {
                    sign: Sign::Plus,
                    term: dice(1, 6, Keep::All),
                },
                RollToken {
                    sign: Sign::Minus,
                    term: Term::Number(2),
                },
            ]
        );
    }

    #[test]
    fn count_defaults_to_one_and_dis_is_not_a_die() {
        let tokens = tokenize("d8+dis-adv").unwrap();
        assert_eq!(tokens[0].term, dice(1, 8, Keep::All));
        assert_eq!(
            tokens[1].term,
            Term::Advantage(AdvantageKind::Disadvantage)
        );
        assert_eq!(tokens[2].sign, Sign::Minus);
        assert_eq!(tokens[2].term, Term::Advantage(AdvantageKind::Advantage));
    }

    #[test]
    fn terms_concatenate_without_separators() {
        let tokens = tokenize("3d6kl2adv5").unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].term, dice(3, 6, Keep::Lowest(2)));
        assert_eq!(tokens[2].term, Term::Number(5));
    }

    #[test]
    fn reports_offset_of_unrecognized_tail() {
        let err = tokenize("1d6 + x").unwrap_err();
        assert_eq!(
            err,
            DiceError::Syntax {
                fragment: "+x".to_owned(),
                position: 3,
            }
        );
    }

    #[test]
    fn keep_suffix_without_number_is_a_syntax_error() {
        let err = tokenize("2d6kh").unwrap_err();
        assert!(matches!(err, DiceError::Syntax { position: 3, .. }));
    }

    #[test]
    fn rejects_zero_dice_and_zero_sides() {
        assert!(matches!(
            tokenize("0d6"),
            Err(DiceError::OutOfRange {
                what: "dice count",
                ..
            })
        ));
        assert!(matches!(
            tokenize("1d0"),
            Err(DiceError::OutOfRange { what: "sides", .. })
        ));
        assert!(matches!(
            tokenize("99999999999999999999999d6"),
            Err(DiceError::OutOfRange { .. })
        ));
    }

    #[test]
    fn limits_term_count() {
        let expr = vec!["1"; MAX_TERMS + 1].join("+");
        assert!(matches!(
            tokenize(&expr),
            Err(DiceError::OutOfRange {
                what: "term count",
                ..
            })
        ));
        let expr = vec!["1"; MAX_TERMS].join("+");
        assert_eq!(tokenize(&expr).unwrap().len(), MAX_TERMS);
    }

    #[test]
    fn single_grammar_sums_modifier_chain() {
        let single = parse_single("2d6 + 1 - 2").unwrap();
        assert_eq!(single.term, dice(2, 6, Keep::All));
        assert_eq!(single.modifier, -1);

        let single = parse_single("ADV+5").unwrap();
        assert_eq!(single.term, Term::Advantage(AdvantageKind::Advantage));
        assert_eq!(single.modifier, 5);
    }

    #[test]
    fn single_grammar_rejects_multiple_dice_terms() {
        assert!(matches!(
            parse_single("3d6+2d4"),
            Err(DiceError::Syntax { position: 5, .. })
        ));
        assert!(matches!(
            parse_single("5"),
            Err(DiceError::Syntax { position: 0, .. })
        ));
        assert!(matches!(
            parse_single(""),
            Err(DiceError::Syntax { position: 0, .. })
        ));
    }

    #[test]
    fn dice_term_label() {
        let term = DiceTerm {
            count: 4,
            sides: 6,
            keep: Keep::Highest(3),
        };
        assert_eq!(term.to_string(), "4d6kh3");
    }
}
