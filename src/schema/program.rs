//! Candidate program value shared by the population, the archive and the store.
//!
//! A program is three ordered instruction sequences (setup, predict, learn).
//! Programs are immutable once built; the engine passes them around as
//! [`CandidateRef`] so aliasing a candidate across slots is a pointer copy.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Shared, immutable handle to a candidate program.
pub type CandidateRef = Arc<Algorithm>;

/// Opcode identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Op(pub u8);

impl Op {
    /// Highest opcode that belongs to an [`OpCategory`].
    pub const MAX_CATEGORIZED: u8 = 64;

    /// Category of this opcode, if it has one.
    pub fn category(self) -> Option<OpCategory> {
        match self.0 {
            0..=6 => Some(OpCategory::Arithmetic),
            7..=12 => Some(OpCategory::Trigonometric),
            13..=17 => Some(OpCategory::Precalculated),
            18..=43 => Some(OpCategory::LinearAlgebra),
            44..=64 => Some(OpCategory::ProbabilityStatistics),
            _ => None,
        }
    }
}

/// Disjoint opcode families used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpCategory {
    Arithmetic,
    Trigonometric,
    Precalculated,
    LinearAlgebra,
    ProbabilityStatistics,
}

impl OpCategory {
    pub const ALL: [OpCategory; 5] = [
        OpCategory::Arithmetic,
        OpCategory::Trigonometric,
        OpCategory::Precalculated,
        OpCategory::LinearAlgebra,
        OpCategory::ProbabilityStatistics,
    ];
}

/// Memory address read or written by an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Address {
    Scalar(u8),
    Vector(u8),
    Matrix(u8),
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Scalar(i) => write!(f, "s{}", i),
            Address::Vector(i) => write!(f, "v{}", i),
            Address::Matrix(i) => write!(f, "m{}", i),
        }
    }
}

/// A single instruction: `out = op(inputs...)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instruction {
    pub op: Op,
    pub out: Address,
    #[serde(default)]
    pub inputs: Vec<Address>,
}

impl Instruction {
    pub fn new(op: Op, out: Address, inputs: Vec<Address>) -> Self {
        Self { op, out, inputs }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = op{}(", self.out, self.op.0)?;
        for (i, input) in self.inputs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", input)?;
        }
        write!(f, ")")
    }
}

/// One of the three component functions of a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Section {
    Setup,
    Predict,
    Learn,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::Setup, Section::Predict, Section::Learn];

    pub fn name(self) -> &'static str {
        match self {
            Section::Setup => "setup",
            Section::Predict => "predict",
            Section::Learn => "learn",
        }
    }
}

/// A candidate program.
///
/// The default value is the empty program, used as the placeholder occupant
/// of freshly constructed population slots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Algorithm {
    #[serde(default)]
    pub setup: Vec<Instruction>,
    #[serde(default)]
    pub predict: Vec<Instruction>,
    #[serde(default)]
    pub learn: Vec<Instruction>,
}

impl Algorithm {
    pub fn new(setup: Vec<Instruction>, predict: Vec<Instruction>, learn: Vec<Instruction>) -> Self {
        Self {
            setup,
            predict,
            learn,
        }
    }

    /// Instructions of one section.
    pub fn section(&self, section: Section) -> &[Instruction] {
        match section {
            Section::Setup => &self.setup,
            Section::Predict => &self.predict,
            Section::Learn => &self.learn,
        }
    }

    /// Mutable access to one section, for building modified copies.
    pub fn section_mut(&mut self, section: Section) -> &mut Vec<Instruction> {
        match section {
            Section::Setup => &mut self.setup,
            Section::Predict => &mut self.predict,
            Section::Learn => &mut self.learn,
        }
    }

    /// All instructions in setup, predict, learn order.
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.setup
            .iter()
            .chain(self.predict.iter())
            .chain(self.learn.iter())
    }

    /// Total instruction count across all sections.
    pub fn total_ops(&self) -> usize {
        self.setup.len() + self.predict.len() + self.learn.len()
    }

    /// Highest declared (written) index per address kind.
    pub fn variable_counts(&self) -> VariableCounts {
        let mut counts = VariableCounts::default();
        for instruction in self.instructions() {
            match instruction.out {
                Address::Scalar(i) => counts.scalar = counts.scalar.max(i as usize),
                Address::Vector(i) => counts.vector = counts.vector.max(i as usize),
                Address::Matrix(i) => counts.matrix = counts.matrix.max(i as usize),
            }
        }
        counts
    }

    /// Instruction counts per opcode category.
    pub fn category_histogram(&self) -> CategoryHistogram {
        let mut histogram = CategoryHistogram::default();
        for category in self.instructions().filter_map(|i| i.op.category()) {
            histogram.record(category);
        }
        histogram
    }

    /// Line-per-instruction rendering grouped by section.
    pub fn to_readable(&self) -> String {
        let mut out = String::new();
        for section in Section::ALL {
            out.push_str(&format!("def {}():\n", section.name()));
            for instruction in self.section(section) {
                out.push_str(&format!("  {}\n", instruction));
            }
        }
        out
    }
}

/// Highest-indexed declared scalar, vector and matrix variables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableCounts {
    pub scalar: usize,
    pub vector: usize,
    pub matrix: usize,
}

impl VariableCounts {
    pub fn total(&self) -> usize {
        self.scalar + self.vector + self.matrix
    }
}

/// Per-category instruction counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryHistogram {
    pub arithmetic: usize,
    pub trigonometric: usize,
    pub precalculated: usize,
    pub linear_algebra: usize,
    pub probability_statistics: usize,
}

impl CategoryHistogram {
    pub fn record(&mut self, category: OpCategory) {
        *self.get_mut(category) += 1;
    }

    pub fn get(&self, category: OpCategory) -> usize {
        match category {
            OpCategory::Arithmetic => self.arithmetic,
            OpCategory::Trigonometric => self.trigonometric,
            OpCategory::Precalculated => self.precalculated,
            OpCategory::LinearAlgebra => self.linear_algebra,
            OpCategory::ProbabilityStatistics => self.probability_statistics,
        }
    }

    fn get_mut(&mut self, category: OpCategory) -> &mut usize {
        match category {
            OpCategory::Arithmetic => &mut self.arithmetic,
            OpCategory::Trigonometric => &mut self.trigonometric,
            OpCategory::Precalculated => &mut self.precalculated,
            OpCategory::LinearAlgebra => &mut self.linear_algebra,
            OpCategory::ProbabilityStatistics => &mut self.probability_statistics,
        }
    }

    /// Sum over all categories.
    pub fn total(&self) -> usize {
        OpCategory::ALL.iter().map(|&c| self.get(c)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Algorithm {
        Algorithm::new(
            vec![Instruction::new(
                Op(0),
                Address::Scalar(3),
                vec![Address::Scalar(1), Address::Scalar(2)],
            )],
            vec![
                Instruction::new(Op(8), Address::Vector(2), vec![Address::Vector(1)]),
                Instruction::new(Op(20), Address::Matrix(1), vec![Address::Matrix(0)]),
            ],
            vec![Instruction::new(Op(99), Address::Scalar(5), vec![])],
        )
    }

    #[test]
    fn test_op_categories_are_disjoint_and_cover_range() {
        let mut counts = [0usize; 5];
        for op in 0..=Op::MAX_CATEGORIZED {
            let category = Op(op).category().unwrap();
            let index = OpCategory::ALL.iter().position(|&c| c == category).unwrap();
            counts[index] += 1;
        }
        assert_eq!(counts, [7, 6, 5, 26, 21]);
        assert_eq!(Op(65).category(), None);
    }

    #[test]
    fn test_total_ops() {
        assert_eq!(sample().total_ops(), 4);
        assert_eq!(Algorithm::default().total_ops(), 0);
    }

    #[test]
    fn test_variable_counts_use_declared_outputs() {
        let counts = sample().variable_counts();
        assert_eq!(counts.scalar, 5);
        assert_eq!(counts.vector, 2);
        assert_eq!(counts.matrix, 1);
        assert_eq!(counts.total(), 8);
    }

    #[test]
    fn test_category_histogram_skips_uncategorized() {
        let histogram = sample().category_histogram();
        assert_eq!(histogram.arithmetic, 1);
        assert_eq!(histogram.trigonometric, 1);
        assert_eq!(histogram.linear_algebra, 1);
        assert_eq!(histogram.total(), 3);
    }

    #[test]
    fn test_readable_rendering() {
        let text = sample().to_readable();
        assert!(text.starts_with("def setup():\n  s3 = op0(s1, s2)\n"));
        assert!(text.contains("def learn():\n  s5 = op99()\n"));
    }

    #[test]
    fn test_serialization_is_lossless() {
        let algorithm = sample();
        let json = serde_json::to_string(&algorithm).unwrap();
        let parsed: Algorithm = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, algorithm);
    }
}
