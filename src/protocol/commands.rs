//! Command tables.
//!
//! Every command a device accepts belongs to one of four categories (get, set, move,
//! do) and is addressed by a symbolic name. The tables are built once on first use
//! and never change afterwards.

use crate::error::CommandError;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Command category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Queries (`gp`, `gs`, `in`, ...)
    Get,
    /// Parameter writes (`sj`, `so`, `ca`, ...)
    Set,
    /// Motion (`ma`, `mr`, `fw`, `bw`, `ho`)
    Move,
    /// Actions without arguments (`us`, `st`, ...)
    Do,
}

impl Category {
    /// All categories in table order.
    pub const ALL: [Category; 4] = [Category::Get, Category::Set, Category::Move, Category::Do];

    /// Lowercase category name.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Get => "get",
            Category::Set => "set",
            Category::Move => "move",
            Category::Do => "do",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(Category::Get),
            "set" => Ok(Category::Set),
            "move" => Ok(Category::Move),
            "do" => Ok(Category::Do),
            other => Err(format!("unknown command category '{other}'")),
        }
    }
}

/// One entry of a command table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// Category the instruction is registered under.
    pub category: Category,
    /// Symbolic name used by callers.
    pub name: &'static str,
    /// Two-character instruction code sent on the wire.
    pub code: &'static str,
    /// Fixed argument following the code (homing direction), if any.
    pub argument: Option<&'static str>,
}

impl Instruction {
    const fn new(category: Category, name: &'static str, code: &'static str) -> Self {
        Self {
            category,
            name,
            code,
            argument: None,
        }
    }

    const fn with_argument(
        category: Category,
        name: &'static str,
        code: &'static str,
        argument: &'static str,
    ) -> Self {
        Self {
            category,
            name,
            code,
            argument: Some(argument),
        }
    }
}

static INSTRUCTIONS: &[Instruction] = &[
    // get
    Instruction::new(Category::Get, "info", "in"),
    Instruction::new(Category::Get, "status", "gs"),
    Instruction::new(Category::Get, "position", "gp"),
    Instruction::new(Category::Get, "stepsize", "gj"),
    Instruction::new(Category::Get, "home_offset", "go"),
    Instruction::new(Category::Get, "velocity", "gv"),
    Instruction::new(Category::Get, "motor_1_info", "i1"),
    Instruction::new(Category::Get, "motor_2_info", "i2"),
    // set
    Instruction::new(Category::Set, "stepsize", "sj"),
    Instruction::new(Category::Set, "isolate", "is"),
    Instruction::new(Category::Set, "address", "ca"),
    Instruction::new(Category::Set, "home_offset", "so"),
    Instruction::new(Category::Set, "velocity", "sv"),
    Instruction::new(Category::Set, "forward_period_1", "f1"),
    Instruction::new(Category::Set, "backward_period_1", "b1"),
    Instruction::new(Category::Set, "forward_period_2", "f2"),
    Instruction::new(Category::Set, "backward_period_2", "b2"),
    // move
    Instruction::with_argument(Category::Move, "home_clockwise", "ho", "0"),
    Instruction::with_argument(Category::Move, "home_anticlockwise", "ho", "1"),
    Instruction::new(Category::Move, "forward", "fw"),
    Instruction::new(Category::Move, "backward", "bw"),
    Instruction::new(Category::Move, "absolute", "ma"),
    Instruction::new(Category::Move, "relative", "mr"),
    // do
    Instruction::new(Category::Do, "save_user_data", "us"),
    Instruction::new(Category::Do, "stop", "st"),
    Instruction::new(Category::Do, "search_frequency_1", "s1"),
    Instruction::new(Category::Do, "search_frequency_2", "s2"),
    Instruction::new(Category::Do, "clean_mechanics", "cm"),
    Instruction::new(Category::Do, "optimize_motors", "om"),
];

static TABLES: Lazy<HashMap<(Category, &'static str), Instruction>> = Lazy::new(|| {
    INSTRUCTIONS
        .iter()
        .map(|instruction| ((instruction.category, instruction.name), *instruction))
        .collect()
});

/// Look up an instruction by category and name.
///
/// # Errors
/// Returns [`CommandError::Unknown`] when the name is not registered for the category.
pub fn lookup(category: Category, name: &str) -> Result<Instruction, CommandError> {
    TABLES
        .get(&(category, name))
        .copied()
        .ok_or_else(|| CommandError::Unknown {
            category,
            name: name.to_string(),
        })
}

/// Names registered under a category, in table order.
pub fn names(category: Category) -> impl Iterator<Item = &'static str> {
    INSTRUCTIONS
        .iter()
        .filter(move |instruction| instruction.category == category)
        .map(|instruction| instruction.name)
}
