//! Evaluating parsed notation.

use crate::ast::{BinOp, DiceTerm, Expr, Selector};
use crate::error::{NotationError, NotationResult};
use crate::parser::parse;
use crate::result::{DiceRollResult, DieResult};
use crate::rng::DiceRng;

/// Extra dice a single exploding term may add.
const MAX_EXPLOSIONS: usize = 100;

/// How die faces are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RollMode {
    /// Faces come from the RNG.
    #[default]
    Random,
    /// Every die shows its highest face.
    Maximize,
    /// Every die shows 1.
    Minimize,
}

/// Parse and roll `notation` with random faces.
pub fn roll(notation: &str, rng: &mut dyn DiceRng) -> NotationResult<DiceRollResult> {
    roll_with(notation, rng, RollMode::Random)
}

/// Parse and roll `notation` under the given mode.
pub fn roll_with(
    notation: &str,
    rng: &mut dyn DiceRng,
    mode: RollMode,
) -> NotationResult<DiceRollResult> {
    let expr = parse(notation)?;
    let mut eval = Evaluator {
        rng,
        mode,
        dice: Vec::new(),
    };
    let (total, rolls) = eval.eval(&expr)?;
    Ok(DiceRollResult {
        notation: notation.split_whitespace().collect(),
        rolls,
        total,
        dice: eval.dice,
    })
}

/// Whether `text` is a complete, valid notation.
pub fn is_dice_notation(text: &str) -> bool {
    parse(text).is_ok()
}

struct Evaluator<'a> {
    rng: &'a mut dyn DiceRng,
    mode: RollMode,
    dice: Vec<DieResult>,
}

impl Evaluator<'_> {
    fn eval(&mut self, expr: &Expr) -> NotationResult<(i64, String)> {
        match expr {
            Expr::Num(n) => Ok((*n, n.to_string())),
            Expr::Dice(term) => self.roll_term(term),
            Expr::Neg(inner) => {
                let (v, s) = self.eval(inner)?;
                let v = v.checked_neg().ok_or(NotationError::Overflow)?;
                Ok((v, format!("-{s}")))
            }
            Expr::Group(inner) => {
                let (v, s) = self.eval(inner)?;
                Ok((v, format!("({s})")))
            }
            Expr::Binary(lhs, op, rhs) => {
                let (l, ls) = self.eval(lhs)?;
                let (r, rs) = self.eval(rhs)?;
                let v = match op {
                    BinOp::Add => l.checked_add(r),
                    BinOp::Sub => l.checked_sub(r),
                    BinOp::Mul => l.checked_mul(r),
                    BinOp::Div => {
                        if r == 0 {
                            return Err(NotationError::DivisionByZero);
                        }
                        l.checked_div(r)
                    }
                }
                .ok_or(NotationError::Overflow)?;
                Ok((v, format!("{ls}{op}{rs}")))
            }
        }
    }

    fn face(&mut self, sides: u32) -> u32 {
        match self.mode {
            RollMode::Random => self.rng.next_in(1, sides),
            RollMode::Maximize => sides,
            RollMode::Minimize => 1,
        }
    }

    fn roll_term(&mut self, term: &DiceTerm) -> NotationResult<(i64, String)> {
        let mut faces: Vec<DieResult> = Vec::with_capacity(term.count as usize);
        let can_explode = term.explode && term.sides > 1 && self.mode == RollMode::Random;
        let mut explosions = 0;
        for _ in 0..term.count {
            let mut value = self.face(term.sides);
            loop {
                let exploded = can_explode && value == term.sides && explosions < MAX_EXPLOSIONS;
                faces.push(DieResult {
                    sides: term.sides,
                    value,
                    kept: true,
                    exploded,
                });
                if !exploded {
                    break;
                }
                explosions += 1;
                value = self.face(term.sides);
            }
        }

        if let Some(selector) = term.selector {
            apply_selector(&mut faces, selector);
        }

        let total: i64 = faces
            .iter()
            .filter(|d| d.kept)
            .map(|d| i64::from(d.value))
            .sum();
        let shown: Vec<String> = faces.iter().map(ToString::to_string).collect();
        let rendered = format!("[{}]", shown.join(", "));
        self.dice.extend(faces);
        Ok((total, rendered))
    }
}

/// Marks dice outside the selection as not kept. Ties keep the earlier die.
fn apply_selector(faces: &mut [DieResult], selector: Selector) {
    let len = faces.len();
    let mut order: Vec<usize> = (0..len).collect();
    // Stable sort, descending by face.
    order.sort_by(|&a, &b| faces[b].value.cmp(&faces[a].value));

    let (keep_from_top, n) = match selector {
        Selector::KeepHighest(n) => (true, n as usize),
        Selector::KeepLowest(n) => (false, n as usize),
        Selector::DropHighest(n) => (false, len.saturating_sub(n as usize)),
        Selector::DropLowest(n) => (true, len.saturating_sub(n as usize)),
    };
    let n = n.min(len);
    if !keep_from_top {
        order.reverse();
    }
    for (rank, &idx) in order.iter().enumerate() {
        faces[idx].kept = rank < n;
    }
}
