// Grammar-constrained OCR correction for fixed-shape fields.
//
// A field grammar is a string of slot classes: `A` letter, `9` digit,
// `X` letter or digit. The recognised text is aligned against the slots with
// an edit distance that allows two operations: swapping a character for one
// it is commonly confused with, and dropping a stray character. The cheapest
// alignment within the edit budget wins.

use crate::utils::KycError;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Letter,
    Digit,
    Alnum,
}

impl Slot {
    fn accepts(&self, c: char) -> bool {
        match self {
            Slot::Letter => c.is_ascii_uppercase(),
            Slot::Digit => c.is_ascii_digit(),
            Slot::Alnum => c.is_ascii_uppercase() || c.is_ascii_digit(),
        }
    }

    fn class(&self) -> &'static str {
        match self {
            Slot::Letter => "[A-Z]",
            Slot::Digit => "[0-9]",
            Slot::Alnum => "[A-Z0-9]",
        }
    }
}

lazy_static! {
    // Glyph pairs OCR engines swap in MRZ-style fonts.
    static ref CONFUSABLES: HashMap<char, Vec<char>> = {
        let mut m = HashMap::new();
        m.insert('O', vec!['0']);
        m.insert('Q', vec!['0']);
        m.insert('D', vec!['0']);
        m.insert('U', vec!['0']);
        m.insert('I', vec!['1']);
        m.insert('L', vec!['1']);
        m.insert('Z', vec!['2']);
        m.insert('S', vec!['5']);
        m.insert('B', vec!['8']);
        m.insert('G', vec!['6']);
        m.insert('T', vec!['7']);
        m.insert('0', vec!['O', 'D', 'Q']);
        m.insert('1', vec!['I', 'L']);
        m.insert('2', vec!['Z']);
        m.insert('4', vec!['A']);
        m.insert('5', vec!['S']);
        m.insert('6', vec!['G']);
        m.insert('7', vec!['T']);
        m.insert('8', vec!['B']);
        m
    };
}

pub const PASSPORT_NUMBER: &str = "A99999999";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    pub value: String,
    pub edits: usize,
}

#[derive(Debug, Clone)]
pub struct FieldGrammar {
    name: String,
    slots: Vec<Slot>,
    pattern: Regex,
}

#[derive(Clone, Copy)]
enum Step {
    Keep(char),
    Swap(char),
    Drop,
}

impl FieldGrammar {
    pub fn parse(name: &str, pattern: &str) -> Result<Self, KycError> {
        let slots = pattern
            .chars()
            .map(|c| match c {
                'A' => Ok(Slot::Letter),
                '9' => Ok(Slot::Digit),
                'X' => Ok(Slot::Alnum),
                other => Err(KycError::Config(format!(
                    "Unknown slot '{}' in grammar '{}'",
                    other, pattern
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        if slots.is_empty() {
            return Err(KycError::Config(format!("Empty grammar for {}", name)));
        }
        let body: String = slots.iter().map(|s| s.class()).collect();
        let pattern = Regex::new(&format!("^{}$", body))
            .map_err(|e| KycError::Config(format!("Grammar for {}: {}", name, e)))?;
        Ok(FieldGrammar {
            name: name.to_string(),
            slots,
            pattern,
        })
    }

    /// Egyptian passport numbers: one letter followed by eight digits.
    pub fn passport_number() -> Result<Self, KycError> {
        Self::parse("passport number", PASSPORT_NUMBER)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    /// Cheapest rewrite of `text` that fits the grammar, if it takes at most
    /// `max_edits` swaps and drops.
    pub fn correct(&self, text: &str, max_edits: usize) -> Option<Correction> {
        let input: Vec<char> = text
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(|c| c.to_uppercase())
            .collect();
        let (n, m) = (input.len(), self.slots.len());
        if n < m {
            return None;
        }

        const INF: usize = usize::MAX / 2;
        // cost[i][j]: consumed i input chars, filled j slots.
        let mut cost = vec![vec![INF; m + 1]; n + 1];
        let mut step: Vec<Vec<Option<Step>>> = vec![vec![None; m + 1]; n + 1];
        cost[0][0] = 0;

        for i in 0..n {
            let c = input[i];
            for j in 0..=m {
                let here = cost[i][j];
                if here >= INF {
                    continue;
                }
                if j < m {
                    let slot = self.slots[j];
                    let fill = if slot.accepts(c) {
                        Some((here, Step::Keep(c)))
                    } else {
                        CONFUSABLES
                            .get(&c)
                            .and_then(|subs| subs.iter().find(|s| slot.accepts(**s)))
                            .map(|s| (here + 1, Step::Swap(*s)))
                    };
                    if let Some((next, how)) = fill {
                        if next < cost[i + 1][j + 1] {
                            cost[i + 1][j + 1] = next;
                            step[i + 1][j + 1] = Some(how);
                        }
                    }
                }
                if here + 1 < cost[i + 1][j] {
                    cost[i + 1][j] = here + 1;
                    step[i + 1][j] = Some(Step::Drop);
                }
            }
        }

        let edits = cost[n][m];
        if edits > max_edits {
            return None;
        }

        let mut out = Vec::with_capacity(m);
        let (mut i, mut j) = (n, m);
        while i > 0 {
            match step[i][j]? {
                Step::Keep(c) | Step::Swap(c) => {
                    out.push(c);
                    j -= 1;
                }
                Step::Drop => {}
            }
            i -= 1;
        }
        out.reverse();

        Some(Correction {
            value: out.into_iter().collect(),
            edits,
        })
    }
}
