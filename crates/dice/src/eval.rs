use core::fmt::Write as _;

use rand::Rng;

use crate::DiceError;
use crate::tokenizer::{AdvantageKind, DiceTerm, Keep, Sign, Term, parse_single, tokenize};

/// Result of an evaluation: the grand total plus a chat-ready breakdown in
/// which kept dice are rendered bold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roll {
    pub total: i64,
    pub text: String,
}

/// Evaluates a single term with optional modifiers (`2d6+1-2`, `4d6kh3`,
/// `adv+5`) using the thread-local RNG.
///
/// # Errors
///
/// See [`evaluate_single_with`].
pub fn evaluate_single(expr: &str) -> Result<Roll, DiceError> {
    evaluate_single_with(expr, &mut rand::thread_rng())
}

/// # Errors
///
/// [`DiceError::Syntax`] when `expr` is not a single term,
/// [`DiceError::InvalidKeepCount`] when a keep count is zero or larger than
/// the number of dice, [`DiceError::OutOfRange`] for oversized values.
pub fn evaluate_single_with<R: Rng + ?Sized>(expr: &str, rng: &mut R) -> Result<Roll, DiceError> {
    let single = parse_single(expr)?;
    let outcome = roll_term(&single.term, rng)?;
    let total = outcome.subtotal + single.modifier;

    let heading = match single.term {
        Term::Dice(dice) => dice.to_string(),
        Term::Advantage(kind) => kind.title().to_owned(),
        Term::Number(value) => value.to_string(),
    };
    let mut text = format!("{heading}: {}", outcome.render_rolls());
    // `adv+0` renders like `adv`.
    if single.modifier != 0 {
        let _ = write!(text, " {:+}", single.modifier);
    }
    let _ = write!(text, " = **{total}**");

    Ok(Roll { total, text })
}

/// Evaluates a left-to-right sum of signed terms (`3d6+2d4+5`,
/// `2d20kh1 + 1d6 - 2`, `adv + 3 + 1d4`) using the thread-local RNG.
///
/// # Errors
///
/// See [`evaluate_expression_with`].
pub fn evaluate_expression(expr: &str) -> Result<Roll, DiceError> {
    evaluate_expression_with(expr, &mut rand::thread_rng())
}

/// Input that fails to match at its very first character is handed to the
/// single-term grammar instead, so its error is what the caller sees.
///
/// # Errors
///
/// Any [`DiceError`] from tokenizing or rolling.
pub fn evaluate_expression_with<R: Rng + ?Sized>(
    expr: &str,
    rng: &mut R,
) -> Result<Roll, DiceError> {
    let tokens = match tokenize(expr) {
        Ok(tokens) => tokens,
        Err(DiceError::Syntax { position: 0, .. }) => return evaluate_single_with(expr, rng),
        Err(err) => return Err(err),
    };

    let mut total = 0_i64;
    let mut fragments = Vec::with_capacity(tokens.len());
    for token in &tokens {
        let outcome = roll_term(&token.term, rng)?;
        total += token.sign.apply(outcome.subtotal);
        fragments.push(render_fragment(token.sign, &token.term, &outcome));
    }

    if let Some(first) = fragments.first_mut()
        && let Some(rest) = first.strip_prefix("+ ")
    {
        *first = rest.to_owned();
    }
    Ok(Roll {
        total,
        text: format!("{} = **{total}**", fragments.join(" ")),
    })
}

#[derive(Debug)]
struct Outcome {
    rolls: Vec<u32>,
    kept: Vec<bool>,
    subtotal: i64,
}

impl Outcome {
    fn render_rolls(&self) -> String {
        let parts: Vec<String> = self
            .rolls
            .iter()
            .zip(&self.kept)
            .map(|(roll, kept)| {
                if *kept {
                    format!("**{roll}**")
                } else {
                    roll.to_string()
                }
            })
            .collect();
        format!("[{}]", parts.join(", "))
    }
}

fn render_fragment(sign: Sign, term: &Term, outcome: &Outcome) -> String {
    let sign = sign.symbol();
    let label = match term {
        Term::Dice(dice) => dice.to_string(),
        Term::Advantage(kind) => kind.label().to_owned(),
        Term::Number(value) => return format!("{sign} **{value}**"),
    };
    format!(
        "{sign} {label} {} → {sign}**{}**",
        outcome.render_rolls(),
        outcome.subtotal
    )
}

fn roll_term<R: Rng + ?Sized>(term: &Term, rng: &mut R) -> Result<Outcome, DiceError> {
    match *term {
        Term::Dice(dice) => roll_dice(dice, rng),
        Term::Advantage(kind) => Ok(roll_advantage(kind, rng)),
        Term::Number(value) => Ok(Outcome {
            rolls: Vec::new(),
            kept: Vec::new(),
            subtotal: i64::from(value),
        }),
    }
}

fn roll_dice<R: Rng + ?Sized>(dice: DiceTerm, rng: &mut R) -> Result<Outcome, DiceError> {
    if let Keep::Highest(n) | Keep::Lowest(n) = dice.keep
        && (n == 0 || n > dice.count)
    {
        return Err(DiceError::InvalidKeepCount {
            requested: n,
            dice: dice.count,
        });
    }

    let rolls: Vec<u32> = (0..dice.count)
        .map(|_| rng.gen_range(1..=dice.sides))
        .collect();
    let kept = select_kept(&rolls, dice.keep);
    let subtotal = kept_sum(&rolls, &kept);
    Ok(Outcome {
        rolls,
        kept,
        subtotal,
    })
}

fn roll_advantage<R: Rng + ?Sized>(kind: AdvantageKind, rng: &mut R) -> Outcome {
    let rolls = vec![rng.gen_range(1..=20_u32), rng.gen_range(1..=20_u32)];
    // On a tie the first die is the one shown as kept.
    let first = match kind {
        AdvantageKind::Advantage => rolls[0] >= rolls[1],
        AdvantageKind::Disadvantage => rolls[0] <= rolls[1],
    };
    let kept = vec![first, !first];
    let subtotal = kept_sum(&rolls, &kept);
    Outcome {
        rolls,
        kept,
        subtotal,
    }
}

/// Stable by roll order: among equal values the earlier die is kept first.
fn select_kept(rolls: &[u32], keep: Keep) -> Vec<bool> {
    let (n, highest) = match keep {
        Keep::All => return vec![true; rolls.len()],
        Keep::Highest(n) => (n, true),
        Keep::Lowest(n) => (n, false),
    };

    let mut order: Vec<usize> = (0..rolls.len()).collect();
    if highest {
        order.sort_by(|&a, &b| rolls[b].cmp(&rolls[a]));
    } else {
        order.sort_by(|&a, &b| rolls[a].cmp(&rolls[b]));
    }

    let mut kept = vec![false; rolls.len()];
    for &idx in order.iter().take(n as usize) {
        kept[idx] = true;
    }
    kept
}

fn kept_sum(rolls: &[u32], kept: &[bool]) -> i64 {
    rolls
        .iter()
        .zip(kept)
        .filter(|(_, kept)| **kept)
        .map(|(roll, _)| i64::from(*roll))
        .sum()
}
